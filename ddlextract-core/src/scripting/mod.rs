//! DDL scripting engine.
//!
//! [`script_tables`] resolves `schema.name` strings to catalog objects and
//! hands the resulting URNs to a [`ScriptingBackend`]. Backends that expose
//! their metadata through [`CatalogReader`] get rendering for free through
//! [`script_from_catalog`].
//!
//! # Module Structure
//! - `options`: the scripting option policy and its presets
//! - `definition`: table metadata as read from the catalog
//! - `ordering`: foreign-key dependency ordering
//! - `render`: statement rendering

pub mod definition;
mod options;
pub mod ordering;
pub mod render;

pub use definition::TableDefinition;
pub use options::ScriptOptions;

use crate::config::{ExtractorConfig, InvocationStrategy, ResolutionMode};
use crate::error::DdlError;
use crate::models::{CatalogObject, TableIdentifier, Urn};
use crate::Result;
use async_trait::async_trait;
use std::collections::HashSet;

/// A catalog/scripting session bound to one database.
#[async_trait]
pub trait ScriptingBackend: Send + Sync {
    /// Whether the session's initial catalog exists on the server.
    async fn database_exists(&self) -> Result<bool>;

    /// Looks a table up by schema and name.
    async fn resolve_table(&self, table: &TableIdentifier) -> Result<Option<CatalogObject>>;

    /// Scripts the given tables, returning the produced lines in order.
    async fn script(&self, options: &ScriptOptions, urns: &[Urn]) -> Result<Vec<String>>;
}

/// Read access to table metadata, used to implement [`ScriptingBackend::script`].
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// Loads the full definition of a table, `None` if it no longer exists.
    async fn load_table(&self, table: &TableIdentifier) -> Result<Option<TableDefinition>>;
}

/// Loads the addressed tables (and their dependencies when asked) and renders them.
///
/// # Errors
/// Returns `DdlError::Scripting` when a URN does not address a table or a
/// table disappears between resolution and scripting.
pub async fn script_from_catalog<R>(
    reader: &R,
    options: &ScriptOptions,
    urns: &[Urn],
) -> Result<Vec<String>>
where
    R: CatalogReader + ?Sized,
{
    let mut tables = Vec::with_capacity(urns.len());
    for urn in urns {
        let identifier = urn
            .table()
            .ok_or_else(|| DdlError::scripting(format!("'{}' does not address a table", urn)))?;
        let definition = reader.load_table(&identifier).await?.ok_or_else(|| {
            DdlError::scripting(format!("table {} disappeared before scripting", identifier))
        })?;
        tables.push(definition);
    }

    if options.with_dependencies {
        tables = load_dependencies(reader, tables).await?;
        tables = ordering::order_by_dependencies(tables);
    }

    Ok(render::render_tables(&tables, options))
}

/// Adds every table reachable through foreign keys that is not loaded yet.
async fn load_dependencies<R>(reader: &R, mut tables: Vec<TableDefinition>) -> Result<Vec<TableDefinition>>
where
    R: CatalogReader + ?Sized,
{
    let mut known: HashSet<TableIdentifier> =
        tables.iter().map(|t| t.identifier.clone()).collect();
    let mut next = 0;

    while let Some(table) = tables.get(next) {
        let pending: Vec<TableIdentifier> = table
            .referenced_tables()
            .filter(|referenced| !known.contains(*referenced))
            .cloned()
            .collect();
        next = next.saturating_add(1);

        for referenced in pending {
            known.insert(referenced.clone());
            match reader.load_table(&referenced).await? {
                Some(definition) => {
                    tracing::debug!(table = %referenced, "Adding referenced table");
                    tables.push(definition);
                }
                None => tracing::warn!(table = %referenced, "Referenced table not found"),
            }
        }
    }

    Ok(tables)
}

/// Resolves and scripts a selection of tables.
///
/// Unparseable or unknown names are skipped with a warning in permissive
/// mode and rejected together in strict mode. Resolved URNs keep input order,
/// duplicates included. No resolved names yields an empty string.
///
/// # Errors
/// - `DdlError::Scripting` when the initial catalog does not exist
/// - `DdlError::UnresolvedTables` in strict mode
/// - any backend error, unchanged
pub async fn script_tables<B>(
    backend: &B,
    identifiers: &[String],
    config: &ExtractorConfig,
) -> Result<String>
where
    B: ScriptingBackend + ?Sized,
{
    if !backend.database_exists().await? {
        return Err(DdlError::scripting("database not found"));
    }

    let mut urns = Vec::with_capacity(identifiers.len());
    let mut unresolved = Vec::new();

    for raw in identifiers {
        let resolved = match raw.parse::<TableIdentifier>() {
            Ok(identifier) => backend.resolve_table(&identifier).await?,
            Err(e) => {
                tracing::debug!(input = %raw, error = %e, "Not a two-part table name");
                None
            }
        };
        match resolved {
            Some(object) => urns.push(object.urn),
            None => unresolved.push(raw.clone()),
        }
    }

    if !unresolved.is_empty() {
        match config.resolution_mode {
            ResolutionMode::Strict => return Err(DdlError::UnresolvedTables { names: unresolved }),
            ResolutionMode::Permissive => {
                tracing::warn!(skipped = ?unresolved, "Skipping tables that do not exist");
            }
        }
    }

    if urns.is_empty() {
        tracing::info!("No tables resolved; nothing to script");
        return Ok(String::new());
    }

    let options = config.script_options();
    tracing::info!(
        tables = urns.len(),
        strategy = ?config.strategy,
        "Scripting tables"
    );

    let lines = match config.strategy {
        InvocationStrategy::Batched => backend.script(&options, &urns).await?,
        InvocationStrategy::PerTable => {
            let mut lines = Vec::new();
            for urn in &urns {
                lines.extend(backend.script(&options, std::slice::from_ref(urn)).await?);
            }
            lines
        }
    };

    Ok(lines.join("\n"))
}
