pub mod dto;
pub mod handler;
mod helpers;
pub mod mongo;
pub mod service;
pub mod sled_store;
pub mod store;

pub use dto::{Prenda, SearchField};
pub use handler::{
    handle_create_prenda, handle_delete_prenda, handle_get_prenda, handle_list_prendas,
    handle_patch_prenda, handle_search_by_categoria, handle_search_by_nombre, handle_welcome,
};
pub use helpers::{compile_pattern, describe_codigo, parse_body, parse_codigo};
pub use mongo::MongoConnectionProvider;
pub use service::PrendaService;
pub use sled_store::SledConnectionProvider;
pub use store::{ConnectionProvider, PrendaConnection, StoreError};
