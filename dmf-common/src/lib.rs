//! # DMF Common Library
//!
//! Shared code for the DesignModel Fusion crates:
//! - Error type shared across crates
//! - TOML bootstrap configuration and config file discovery

pub mod config;
pub mod error;

pub use error::{Error, Result};
