//! # OSA Common Library
//!
//! Shared code for the OSA analysis services:
//! - Error types (`Error`, `Result`)
//! - Data folder and TOML configuration resolution

pub mod config;
pub mod error;

pub use error::{Error, Result};
