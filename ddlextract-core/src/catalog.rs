//! Table catalog listing.

use crate::Result;
use crate::models::TableCatalogEntry;
use async_trait::async_trait;

/// Source of base-table rows for one database.
#[async_trait]
pub trait TableCatalogSource: Send + Sync {
    /// Returns base tables, restricted to `schema_filter` when given.
    ///
    /// Implementations bind the filter as a parameter and compare it with the
    /// engine's collation.
    async fn fetch_base_tables(&self, schema_filter: Option<&str>)
    -> Result<Vec<TableCatalogEntry>>;
}

/// Drops a blank schema filter. Any other filter is passed through verbatim.
pub fn normalize_schema_filter(schema_filter: Option<&str>) -> Option<&str> {
    schema_filter.filter(|filter| !filter.trim().is_empty())
}

/// Lists user tables as `schema.name` strings in ordinal `(schema, name)` order.
///
/// System objects and system schemas are dropped even if the source returns
/// them. The result is complete or an error; nothing partial is returned.
///
/// # Errors
/// Any source error is returned unchanged.
pub async fn list_tables<S>(source: &S, schema_filter: Option<&str>) -> Result<Vec<String>>
where
    S: TableCatalogSource + ?Sized,
{
    let filter = normalize_schema_filter(schema_filter);
    let entries = source.fetch_base_tables(filter).await?;
    let fetched = entries.len();

    let mut tables: Vec<_> = entries
        .into_iter()
        .filter(|entry| !entry.is_system_object && !entry.identifier.is_system_schema())
        .map(|entry| entry.identifier)
        .collect();
    tables.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

    tracing::debug!(
        fetched,
        kept = tables.len(),
        schema = filter.unwrap_or("<all>"),
        "Listed base tables"
    );

    Ok(tables.iter().map(ToString::to_string).collect())
}
