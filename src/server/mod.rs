pub mod http;
pub mod routes;

pub use http::start_server;
pub use routes::{create_router, AppState};
