//! Database backends implementing the catalog and scripting seams.
//!
//! # Module Structure
//! - `mssql`: SQL Server over TDS (feature `mssql`)

#[cfg(feature = "mssql")]
pub mod mssql;
