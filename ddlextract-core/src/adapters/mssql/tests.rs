//! Unit tests for the SQL Server backend.

use super::connection::{SessionKind, build_config};
use super::queries;
use super::schema_collection::{fill_factor, group_foreign_key_columns, group_index_columns};
use crate::error::DdlError;
use crate::scripting::definition::IndexColumn;
use crate::security::ConnectionTarget;

fn target(connection_string: &str) -> ConnectionTarget {
    ConnectionTarget::resolve(connection_string).unwrap()
}

#[test]
fn test_build_config_uses_explicit_port() {
    let target = target("Server=db.internal,14330;Database=sales;User Id=sa;Password=pw;");
    let config = build_config(&target, SessionKind::Query).unwrap();
    assert_eq!(config.get_addr(), "db.internal:14330");
}

#[test]
fn test_build_config_defaults_to_1433() {
    let target = target("Server=db.internal;Database=sales;User Id=sa;Password=pw;");
    let config = build_config(&target, SessionKind::Scripting).unwrap();
    assert_eq!(config.get_addr(), "db.internal:1433");
}

#[test]
fn test_build_config_requires_login() {
    let target = target("Server=db.internal;Database=sales;");
    let err = build_config(&target, SessionKind::Query).unwrap_err();
    assert!(matches!(err, DdlError::Connection { .. }));
}

#[test]
fn test_listing_sql_binds_schema_only_when_filtered() {
    let unfiltered = queries::list_base_tables(false);
    assert!(unfiltered.contains("TABLE_TYPE = 'BASE TABLE'"));
    assert!(!unfiltered.contains("@P1"));

    let filtered = queries::list_base_tables(true);
    assert!(filtered.ends_with("AND t.TABLE_SCHEMA = @P1"));
}

#[test]
fn test_catalog_queries_are_parameterized() {
    for sql in [
        queries::COLUMNS,
        queries::INDEX_COLUMNS,
        queries::KEY_CONSTRAINTS,
        queries::INDEXES,
        queries::DEFAULT_CONSTRAINTS,
        queries::FOREIGN_KEYS,
        queries::FOREIGN_KEY_COLUMNS,
        queries::CHECK_CONSTRAINTS,
        queries::TRIGGERS,
    ] {
        assert!(sql.contains("@P1"), "missing object id parameter: {}", sql);
        assert!(sql.trim_start().starts_with("SELECT"));
    }
    assert!(queries::RESOLVE_TABLE.contains("@P2"));
    assert!(queries::TABLE.contains("@P2"));
}

#[test]
fn test_group_index_columns_splits_included() {
    let grouped = group_index_columns(vec![
        (1, "Id".to_string(), false, false),
        (2, "Total".to_string(), true, false),
        (2, "CustomerId".to_string(), false, false),
        (2, "Notes".to_string(), false, true),
    ]);

    assert_eq!(grouped[&1].keys, vec![IndexColumn::ascending("Id")]);
    assert!(grouped[&1].included.is_empty());

    let second = &grouped[&2];
    assert_eq!(second.keys.len(), 2);
    assert!(second.keys[0].descending);
    assert_eq!(second.keys[1].name, "CustomerId");
    assert_eq!(second.included, vec!["Notes".to_string()]);
}

#[test]
fn test_group_foreign_key_columns_keeps_pairs_aligned() {
    let grouped = group_foreign_key_columns(vec![
        (10, "OrderId".to_string(), "Id".to_string()),
        (10, "LineNo".to_string(), "LineNo".to_string()),
        (11, "CustomerId".to_string(), "Id".to_string()),
    ]);

    let (local, referenced) = &grouped[&10];
    assert_eq!(local, &vec!["OrderId".to_string(), "LineNo".to_string()]);
    assert_eq!(referenced, &vec!["Id".to_string(), "LineNo".to_string()]);
    assert_eq!(grouped[&11].0, vec!["CustomerId".to_string()]);
}

#[test]
fn test_fill_factor_range() {
    assert_eq!(fill_factor(0), 0);
    assert_eq!(fill_factor(80), 80);
    assert_eq!(fill_factor(100), 100);
    assert_eq!(fill_factor(101), 0);
    assert_eq!(fill_factor(-1), 0);
}
