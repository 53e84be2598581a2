//! Web layer for the train tracker.
//!
//! Thin glue over the cache facade and the mock dataset; no handler
//! touches the cache files directly.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
