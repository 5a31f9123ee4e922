//! Web layer for the departure board server.
//!
//! Serves the board and setup pages plus a small JSON API for board
//! status and service actions.

mod dto;
mod routes;
mod state;
pub mod templates;

pub use dto::*;
pub use routes::create_router;
pub use state::AppState;
pub use templates::*;
