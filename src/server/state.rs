use std::sync::Arc;

use crate::features::prendas::{ConnectionProvider, PrendaService};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PrendaService>,
}

impl AppState {
    pub fn new(provider: Arc<dyn ConnectionProvider>) -> Self {
        Self {
            service: Arc::new(PrendaService::new(provider)),
        }
    }
}
