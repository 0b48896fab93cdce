//! # Sales Dashboard Common Library
//!
//! Shared code for the sales dashboard backend:
//! - Error and result types
//! - TOML bootstrap configuration schema and loading
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
