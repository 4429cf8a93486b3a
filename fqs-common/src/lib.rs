//! # Fruit Quality Scanner Common Library
//!
//! Shared code for the scanner service:
//! - Scan and fruit data model
//! - Storage trait with SQLite and PostgreSQL adapters
//! - Configuration loading and validation
//! - Error types

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod uuid_utils;

pub use error::{Error, Result};
