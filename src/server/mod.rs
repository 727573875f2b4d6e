pub mod headers;
pub mod router;
pub mod state;

pub use headers::json_content_type;
pub use router::build_router;
pub use state::AppState;
