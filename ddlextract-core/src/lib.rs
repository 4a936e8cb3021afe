//! Core library for extracting table DDL from SQL Server.
//!
//! This crate resolves connection strings, lists user tables, scripts their
//! definitions under a fixed option policy and normalizes the result into a
//! portable script.
//!
//! # Security Guarantees
//! - Credentials are zeroized on drop and never appear in logs or errors
//! - All catalog access is read-only; generated DDL is never executed
//! - User-supplied names are bound as query parameters
//!
//! # Architecture
//! - [`security`]: connection string resolution and credential handling
//! - [`catalog`]: base-table listing behind [`catalog::TableCatalogSource`]
//! - [`scripting`]: URN resolution and rendering behind
//!   [`scripting::ScriptingBackend`]
//! - [`cleanup`]: the regex post-processing pipeline
//! - [`service`]: the [`DdlExtractor`] facade with deadlines, cancellation and
//!   a single-flight gate
//! - `adapters`: the SQL Server driver (feature `mssql`)

#[cfg(feature = "mssql")]
pub mod adapters;
pub mod catalog;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod scripting;
pub mod security;
pub mod service;

// Re-export commonly used types
pub use config::{ExtractorConfig, InvocationStrategy, ResolutionMode, ScriptProfile};
pub use error::{DdlError, Result};
pub use events::{ExtractionEvent, ExtractionObserver, Operation};
pub use models::{TableCatalogEntry, TableIdentifier, Urn};
pub use scripting::{ScriptOptions, TableDefinition};
pub use security::ConnectionTarget;
pub use service::{DdlExtractor, SessionFactory};
