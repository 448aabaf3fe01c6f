//! `notekeep` Core Library
//!
//! Shared functionality for `notekeep` components:
//! - Configuration resolution and validation
//! - `SQLite` pool helpers and the database macro
//! - Tracing initialisation
//! - Common error types

pub mod config;
pub mod db;
pub mod error;
pub mod tracing_init;

pub use config::Config;
pub use error::{Error, Result};
