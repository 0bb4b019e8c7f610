//! # bandcheck Common Library
//!
//! Shared code for the bandcheck workspace including:
//! - Error types (`Error`, `Result`)
//! - Configuration loading (TOML file resolution, logging settings)
//! - Timestamp utilities

pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
