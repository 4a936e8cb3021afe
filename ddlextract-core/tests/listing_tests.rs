//! Table catalog listing tests.
//!
//! This test suite covers:
//! - Ordinal `(schema, name)` ordering and its stability
//! - Schema filter correctness
//! - System object and system schema exclusion
//! - Listing through the extractor facade

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

mod common;

use common::{FakeDatabase, FakeFactory, sales_database, table, target};
use ddlextract_core::catalog::list_tables;
use ddlextract_core::{DdlError, DdlExtractor, ExtractorConfig, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_sales_dbo_scenario() -> Result<()> {
    let extractor = DdlExtractor::new(
        target(),
        ExtractorConfig::default(),
        Arc::new(FakeFactory::new(sales_database())),
    )?;

    assert_eq!(extractor.target().database(), "sales");
    let tables = extractor
        .list_tables(Some("dbo"), &CancellationToken::new())
        .await?;
    assert_eq!(tables, vec!["dbo.Customers", "dbo.Orders"]);
    Ok(())
}

#[tokio::test]
async fn test_listing_sorted_by_schema_then_name() -> Result<()> {
    let database = FakeDatabase::new("sales")
        .with_table(table("b", "Alpha"))
        .with_table(table("a", "Zulu"))
        .with_table(table("b", "Able"))
        .with_table(table("a", "Mike"));

    let first = list_tables(&database, None).await?;
    let second = list_tables(&database, None).await?;

    assert_eq!(first, vec!["a.Mike", "a.Zulu", "b.Able", "b.Alpha"]);
    assert_eq!(first, second);
    Ok(())
}

#[tokio::test]
async fn test_ordering_is_ordinal() -> Result<()> {
    let database = FakeDatabase::new("sales")
        .with_table(table("dbo", "orders"))
        .with_table(table("dbo", "Orders_Archive"))
        .with_table(table("dbo", "Customers"));

    let tables = list_tables(&database, None).await?;
    assert_eq!(
        tables,
        vec!["dbo.Customers", "dbo.Orders_Archive", "dbo.orders"]
    );
    Ok(())
}

#[tokio::test]
async fn test_filter_returns_only_that_schema() -> Result<()> {
    let database = sales_database();

    let reporting = list_tables(&database, Some("reporting")).await?;
    assert_eq!(reporting, vec!["reporting.Summary"]);

    let missing = list_tables(&database, Some("archive")).await?;
    assert!(missing.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_blank_filter_lists_everything() -> Result<()> {
    let database = sales_database();
    let all = list_tables(&database, Some("   ")).await?;
    assert_eq!(all, vec!["dbo.Customers", "dbo.Orders", "reporting.Summary"]);
    Ok(())
}

#[tokio::test]
async fn test_padded_filter_is_not_trimmed() -> Result<()> {
    let database = sales_database();
    let padded = list_tables(&database, Some(" dbo ")).await?;
    assert!(padded.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_system_objects_excluded() -> Result<()> {
    let database = sales_database()
        .with_system_object("dbo", "sysdiagrams")
        .with_entry("sys", "objects")
        .with_entry("INFORMATION_SCHEMA", "TABLES");

    let tables = list_tables(&database, None).await?;
    assert_eq!(tables, vec!["dbo.Customers", "dbo.Orders", "reporting.Summary"]);

    let dbo = list_tables(&database, Some("dbo")).await?;
    assert_eq!(dbo, vec!["dbo.Customers", "dbo.Orders"]);
    Ok(())
}

#[tokio::test]
async fn test_names_with_dots_are_bracketed() -> Result<()> {
    let database = FakeDatabase::new("sales").with_table(table("dbo", "Orders.2024"));
    let tables = list_tables(&database, None).await?;
    assert_eq!(tables, vec!["dbo.[Orders.2024]"]);
    Ok(())
}

#[tokio::test]
async fn test_listing_connection_failure_surfaces() {
    let mut factory = FakeFactory::new(sales_database());
    factory.refuse_connections = true;
    let extractor =
        DdlExtractor::new(target(), ExtractorConfig::default(), Arc::new(factory)).unwrap();

    let err = extractor
        .list_tables(None, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DdlError::Connection { .. }));
    assert!(!err.to_string().contains("s3cret"));
}

#[tokio::test]
async fn test_listing_is_not_cached() -> Result<()> {
    let factory = Arc::new(FakeFactory::new(sales_database()));
    let extractor = DdlExtractor::new(target(), ExtractorConfig::default(), factory.clone())?;
    let cancel = CancellationToken::new();

    extractor.list_tables(None, &cancel).await?;
    extractor.list_tables(None, &cancel).await?;

    assert_eq!(
        factory.connections.load(std::sync::atomic::Ordering::SeqCst),
        2
    );
    Ok(())
}
