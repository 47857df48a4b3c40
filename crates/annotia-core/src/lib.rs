//! Core types for the Annotia media ingestion service.
//!
//! This crate holds the configuration, the error taxonomy, and the domain
//! models shared by the storage, processing, db, and api crates.

pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;

pub use config::Config;
pub use error::{AppError, LogLevel};
pub use storage_types::StorageBackend;
