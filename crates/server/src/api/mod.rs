pub mod feeds;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod subscribers;
pub mod sync;

pub use routes::create_router;

use serde::Serialize;

/// JSON error body shared by the handlers.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
