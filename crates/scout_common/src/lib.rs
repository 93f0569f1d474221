//! Scout Common - Shared types, configuration and helpers for Scout.
//!
//! Everything the daemon and its callers agree on lives here: the chat wire
//! format, the search result shape and the config file schema.

pub mod config;
pub mod error;
pub mod markup;
pub mod types;

pub use config::*;
pub use error::{Result, ScoutError};
pub use markup::escape_html;
pub use types::*;

/// Crate version reported by health endpoints
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
