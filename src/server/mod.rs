//! Server core functionality
//!
//! Shared application state, listener setup and the serve loop.

pub mod core;
pub mod state;

pub use core::Server;
pub use state::AppState;
