//! In-memory backends for exercising the extractor without a server.

#![allow(dead_code)]

use async_trait::async_trait;
use ddlextract_core::catalog::TableCatalogSource;
use ddlextract_core::models::CatalogObject;
use ddlextract_core::scripting::definition::{
    ColumnDefinition, ColumnType, ForeignKeyDefinition, IndexColumn, IndexOptions, KeyConstraint,
    KeyKind, ReferentialAction,
};
use ddlextract_core::scripting::{self, CatalogReader, ScriptingBackend};
use ddlextract_core::{
    ConnectionTarget, DdlError, ExtractionEvent, ExtractionObserver, Result, ScriptOptions,
    SessionFactory, TableCatalogEntry, TableDefinition, TableIdentifier, Urn,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const CONNECTION_STRING: &str = "Server=fake-sql;Database=sales;User Id=tester;Password=s3cret;";

pub fn target() -> ConnectionTarget {
    ConnectionTarget::resolve(CONNECTION_STRING).unwrap()
}

/// A table with an `int` identity key named after the table.
pub fn table(schema: &str, name: &str) -> TableDefinition {
    let mut table = TableDefinition::new(TableIdentifier::new(schema, name));
    table.columns = vec![
        ColumnDefinition::new("Id", ColumnType::system("int"), false),
        ColumnDefinition::new("Name", ColumnType::sized("nvarchar", 200), true),
    ];
    table.key_constraints.push(KeyConstraint {
        name: format!("PK_{}", name),
        kind: KeyKind::PrimaryKey,
        clustered: true,
        columns: vec![IndexColumn::ascending("Id")],
        options: IndexOptions::default(),
        filegroup: Some("PRIMARY".to_string()),
    });
    table
}

/// Adds a `<Referenced>Id` column and a foreign key to `referenced`.
pub fn with_reference(mut table: TableDefinition, referenced: &TableIdentifier) -> TableDefinition {
    let column = format!("{}Id", referenced.name());
    table
        .columns
        .push(ColumnDefinition::new(&column, ColumnType::system("int"), false));
    table.foreign_keys.push(ForeignKeyDefinition {
        name: format!("FK_{}_{}", table.identifier.name(), referenced.name()),
        columns: vec![column],
        referenced_table: referenced.clone(),
        referenced_columns: vec!["Id".to_string()],
        on_delete: ReferentialAction::NoAction,
        on_update: ReferentialAction::NoAction,
        is_not_trusted: false,
        is_disabled: false,
        not_for_replication: false,
    });
    table
}

/// `sales` with `dbo.Orders -> dbo.Customers` and `reporting.Summary`.
pub fn sales_database() -> FakeDatabase {
    let customers = table("dbo", "Customers");
    let orders = with_reference(table("dbo", "Orders"), &customers.identifier);
    FakeDatabase::new("sales")
        .with_table(orders)
        .with_table(customers)
        .with_table(table("reporting", "Summary"))
}

/// Tables of one database plus catalog rows that are not user tables.
#[derive(Debug, Clone)]
pub struct FakeDatabase {
    pub name: String,
    pub tables: Vec<TableDefinition>,
    pub extra_entries: Vec<TableCatalogEntry>,
}

impl FakeDatabase {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tables: Vec::new(),
            extra_entries: Vec::new(),
        }
    }

    pub fn with_table(mut self, table: TableDefinition) -> Self {
        self.tables.push(table);
        self
    }

    pub fn with_system_object(mut self, schema: &str, name: &str) -> Self {
        self.extra_entries.push(TableCatalogEntry {
            identifier: TableIdentifier::new(schema, name),
            is_system_object: true,
        });
        self
    }

    pub fn with_entry(mut self, schema: &str, name: &str) -> Self {
        self.extra_entries.push(TableCatalogEntry::user(schema, name));
        self
    }

    fn find(&self, identifier: &TableIdentifier) -> Option<(usize, &TableDefinition)> {
        self.tables
            .iter()
            .enumerate()
            .find(|(_, table)| &table.identifier == identifier)
    }
}

#[async_trait]
impl TableCatalogSource for FakeDatabase {
    async fn fetch_base_tables(
        &self,
        schema_filter: Option<&str>,
    ) -> Result<Vec<TableCatalogEntry>> {
        let entries = self
            .tables
            .iter()
            .map(|table| TableCatalogEntry {
                identifier: table.identifier.clone(),
                is_system_object: false,
            })
            .chain(self.extra_entries.iter().cloned())
            .filter(|entry| {
                schema_filter.is_none_or(|schema| entry.identifier.schema().eq_ignore_ascii_case(schema))
            })
            .collect();
        Ok(entries)
    }
}

/// A scripting session over a [`FakeDatabase`].
pub struct FakeBackend {
    pub database: Arc<FakeDatabase>,
    pub database_exists: bool,
    pub script_delay: Option<Duration>,
    pub script_calls: Arc<AtomicUsize>,
}

impl FakeBackend {
    pub fn new(database: FakeDatabase) -> Self {
        Self {
            database: Arc::new(database),
            database_exists: true,
            script_delay: None,
            script_calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl ScriptingBackend for FakeBackend {
    async fn database_exists(&self) -> Result<bool> {
        Ok(self.database_exists)
    }

    async fn resolve_table(&self, table: &TableIdentifier) -> Result<Option<CatalogObject>> {
        Ok(self.database.find(table).map(|(index, found)| CatalogObject {
            identifier: found.identifier.clone(),
            object_id: i32::try_from(index).unwrap_or(i32::MAX),
            urn: Urn::for_table("fake-sql", &self.database.name, &found.identifier),
        }))
    }

    async fn script(&self, options: &ScriptOptions, urns: &[Urn]) -> Result<Vec<String>> {
        self.script_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.script_delay {
            tokio::time::sleep(delay).await;
        }
        scripting::script_from_catalog(self, options, urns).await
    }
}

#[async_trait]
impl CatalogReader for FakeBackend {
    async fn load_table(&self, table: &TableIdentifier) -> Result<Option<TableDefinition>> {
        Ok(self.database.find(table).map(|(_, found)| found.clone()))
    }
}

/// Hands out fake sessions and counts connection attempts.
pub struct FakeFactory {
    pub database: FakeDatabase,
    pub database_exists: bool,
    pub connect_delay: Option<Duration>,
    pub script_delay: Option<Duration>,
    pub refuse_connections: bool,
    pub connections: Arc<AtomicUsize>,
    pub script_calls: Arc<AtomicUsize>,
}

impl FakeFactory {
    pub fn new(database: FakeDatabase) -> Self {
        Self {
            database,
            database_exists: true,
            connect_delay: None,
            script_delay: None,
            refuse_connections: false,
            connections: Arc::new(AtomicUsize::new(0)),
            script_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    async fn connect(&self) -> Result<()> {
        self.connections.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }
        if self.refuse_connections {
            return Err(DdlError::connection_failed(
                "login to mssql://fake-sql:1433 failed",
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Login failed"),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionFactory for FakeFactory {
    async fn open_query_connection(
        &self,
        _target: &ConnectionTarget,
    ) -> Result<Box<dyn TableCatalogSource>> {
        self.connect().await?;
        if !self.database_exists {
            return Err(DdlError::connection_failed(
                "login to mssql://fake-sql:1433 failed",
                std::io::Error::new(std::io::ErrorKind::NotFound, "Cannot open database"),
            ));
        }
        Ok(Box::new(self.database.clone()))
    }

    async fn open_scripting_session(
        &self,
        _target: &ConnectionTarget,
    ) -> Result<Box<dyn ScriptingBackend>> {
        self.connect().await?;
        Ok(Box::new(FakeBackend {
            database: Arc::new(self.database.clone()),
            database_exists: self.database_exists,
            script_delay: self.script_delay,
            script_calls: Arc::clone(&self.script_calls),
        }))
    }
}

/// Collects lifecycle events in arrival order.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ExtractionEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<ExtractionEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ExtractionObserver for RecordingObserver {
    fn on_event(&self, event: &ExtractionEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
