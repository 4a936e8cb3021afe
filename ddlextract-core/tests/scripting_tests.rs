//! DDL scripting engine tests against an in-memory catalog.
//!
//! This test suite covers:
//! - Empty selections and unresolved identifiers
//! - Strict resolution mode
//! - Batched versus per-table invocation
//! - Dependency expansion and ordering
//! - Missing initial catalog

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

mod common;

use common::{FakeBackend, FakeDatabase, sales_database, table, with_reference};
use ddlextract_core::config::{InvocationStrategy, ResolutionMode, ScriptProfile};
use ddlextract_core::models::Urn;
use ddlextract_core::scripting::{script_from_catalog, script_tables};
use ddlextract_core::{DdlError, ExtractorConfig, Result, ScriptOptions, TableIdentifier};
use std::sync::atomic::Ordering;

fn names(raw: &[&str]) -> Vec<String> {
    raw.iter().map(ToString::to_string).collect()
}

fn position(script: &str, needle: &str) -> usize {
    script
        .find(needle)
        .unwrap_or_else(|| panic!("{:?} not found in:\n{}", needle, script))
}

#[tokio::test]
async fn test_empty_selection_yields_empty_script() -> Result<()> {
    let backend = FakeBackend::new(sales_database());
    let script = script_tables(&backend, &[], &ExtractorConfig::default()).await?;

    assert_eq!(script, "");
    assert_eq!(backend.script_calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn test_unresolved_identifiers_are_skipped() -> Result<()> {
    let backend = FakeBackend::new(sales_database());
    let config = ExtractorConfig::default();

    let with_missing = script_tables(
        &backend,
        &names(&["dbo.Customers", "doesnotexist.table", "justaname"]),
        &config,
    )
    .await?;
    let valid_only = script_tables(&backend, &names(&["dbo.Customers"]), &config).await?;

    assert!(!valid_only.is_empty());
    assert_eq!(with_missing, valid_only);
    Ok(())
}

#[tokio::test]
async fn test_only_unresolved_identifiers_yield_empty_script() -> Result<()> {
    let backend = FakeBackend::new(sales_database());
    let script = script_tables(
        &backend,
        &names(&["doesnotexist.table"]),
        &ExtractorConfig::default(),
    )
    .await?;

    assert_eq!(script, "");
    assert_eq!(backend.script_calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn test_strict_mode_reports_every_missing_name() {
    let backend = FakeBackend::new(sales_database());
    let config = ExtractorConfig::default().with_resolution_mode(ResolutionMode::Strict);

    let err = script_tables(
        &backend,
        &names(&["dbo.Customers", "doesnotexist.table", "a.b.c"]),
        &config,
    )
    .await
    .unwrap_err();

    match err {
        DdlError::UnresolvedTables { names } => {
            assert_eq!(names, vec!["doesnotexist.table", "a.b.c"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(backend.script_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_database_is_a_scripting_error() {
    let mut backend = FakeBackend::new(sales_database());
    backend.database_exists = false;

    let err = script_tables(&backend, &names(&["dbo.Orders"]), &ExtractorConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DdlError::Scripting { .. }));
    assert!(err.to_string().contains("database not found"));
}

#[tokio::test]
async fn test_resolution_ignores_case_and_uses_catalog_names() -> Result<()> {
    let backend = FakeBackend::new(sales_database());
    let script = script_tables(&backend, &names(&["DBO.customers"]), &ExtractorConfig::default())
        .await?;

    assert!(script.contains("CREATE TABLE [Customers]("));
    Ok(())
}

#[tokio::test]
async fn test_batched_scripts_everything_in_one_call() -> Result<()> {
    let backend = FakeBackend::new(sales_database());
    let script = script_tables(
        &backend,
        &names(&["dbo.Orders", "dbo.Customers"]),
        &ExtractorConfig::default(),
    )
    .await?;

    assert_eq!(backend.script_calls.load(Ordering::SeqCst), 1);

    // Input order is kept and constraints follow every table.
    let orders = position(&script, "CREATE TABLE [Orders](");
    let customers = position(&script, "CREATE TABLE [Customers](");
    let foreign_key = position(&script, "FOREIGN KEY([CustomersId])");
    assert!(orders < customers);
    assert!(customers < foreign_key);
    Ok(())
}

#[tokio::test]
async fn test_per_table_concatenates_individual_scripts() -> Result<()> {
    let backend = FakeBackend::new(sales_database());
    let config = ExtractorConfig::default().with_strategy(InvocationStrategy::PerTable);

    let combined = script_tables(&backend, &names(&["dbo.Orders", "dbo.Customers"]), &config).await?;
    assert_eq!(backend.script_calls.load(Ordering::SeqCst), 2);

    let orders = script_tables(&backend, &names(&["dbo.Orders"]), &config).await?;
    let customers = script_tables(&backend, &names(&["dbo.Customers"]), &config).await?;
    assert_eq!(combined, format!("{}\n{}", orders, customers));
    Ok(())
}

#[tokio::test]
async fn test_duplicates_are_kept() -> Result<()> {
    let backend = FakeBackend::new(sales_database());
    let script = script_tables(
        &backend,
        &names(&["dbo.Customers", "dbo.customers"]),
        &ExtractorConfig::default(),
    )
    .await?;

    assert_eq!(script.matches("CREATE TABLE [Customers](").count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_legacy_profile_scripts_triggers() -> Result<()> {
    let mut audited = table("dbo", "Audited");
    audited.triggers.push(ddlextract_core::scripting::definition::TriggerDefinition {
        name: "TR_Audited".to_string(),
        definition: "CREATE TRIGGER [dbo].[TR_Audited] ON [dbo].[Audited] AFTER UPDATE AS RETURN"
            .to_string(),
        is_disabled: false,
        uses_ansi_nulls: true,
        uses_quoted_identifier: true,
    });
    let backend = FakeBackend::new(FakeDatabase::new("sales").with_table(audited));

    let canonical =
        script_tables(&backend, &names(&["dbo.Audited"]), &ExtractorConfig::default()).await?;
    assert!(!canonical.contains("CREATE TRIGGER"));

    let legacy = script_tables(
        &backend,
        &names(&["dbo.Audited"]),
        &ExtractorConfig::default().with_profile(ScriptProfile::Legacy),
    )
    .await?;
    assert!(legacy.contains("CREATE TRIGGER [dbo].[TR_Audited]"));
    assert!(legacy.contains("ALTER TABLE [Audited] ENABLE TRIGGER [TR_Audited];"));
    Ok(())
}

#[tokio::test]
async fn test_with_dependencies_pulls_in_referenced_tables() -> Result<()> {
    let regions = table("dbo", "Regions");
    let customers = with_reference(table("dbo", "Customers"), &regions.identifier);
    let orders = with_reference(table("dbo", "Orders"), &customers.identifier);
    let backend = FakeBackend::new(
        FakeDatabase::new("sales")
            .with_table(orders.clone())
            .with_table(customers)
            .with_table(regions),
    );

    let options = ScriptOptions {
        with_dependencies: true,
        ..ScriptOptions::batched()
    };
    let urn = Urn::for_table("fake-sql", "sales", &orders.identifier);
    let script = script_from_catalog(&backend, &options, &[urn]).await?.join("\n");

    let regions_at = position(&script, "CREATE TABLE [Regions](");
    let customers_at = position(&script, "CREATE TABLE [Customers](");
    let orders_at = position(&script, "CREATE TABLE [Orders](");
    assert!(regions_at < customers_at);
    assert!(customers_at < orders_at);
    Ok(())
}

#[tokio::test]
async fn test_urn_that_is_not_a_table_is_rejected() {
    let backend = FakeBackend::new(sales_database());
    let urn = Urn::from_raw("Server[@Name='fake-sql']/Database[@Name='sales']");

    let err = script_from_catalog(&backend, &ScriptOptions::batched(), &[urn])
        .await
        .unwrap_err();
    assert!(matches!(err, DdlError::Scripting { .. }));
}

#[tokio::test]
async fn test_table_dropped_after_resolution_is_reported() {
    let backend = FakeBackend::new(sales_database());
    let gone = TableIdentifier::new("dbo", "Dropped");
    let urn = Urn::for_table("fake-sql", "sales", &gone);

    let err = script_from_catalog(&backend, &ScriptOptions::batched(), &[urn])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("dbo.Dropped"));
}
