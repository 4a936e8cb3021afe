//! SQL Server backend over the TDS protocol.
//!
//! # Module Structure
//! - `connection`: driver configuration and the single connection attempt
//! - `queries`: catalog SQL text
//! - `row`: typed row access
//! - `schema_collection`: table definitions from the `sys.*` views
//!
//! # Security Guarantees
//! - All catalog access is read-only
//! - User-supplied names are bound as parameters, never spliced into SQL
//! - Errors and logs carry the credential-free target only

mod connection;
mod queries;
mod row;
mod schema_collection;

#[cfg(test)]
mod tests;

use crate::Result;
use crate::catalog::TableCatalogSource;
use crate::error::DdlError;
use crate::models::{CatalogObject, TableCatalogEntry, TableIdentifier, Urn, quote_name};
use crate::scripting::{self, CatalogReader, ScriptOptions, ScriptingBackend, TableDefinition};
use crate::security::ConnectionTarget;
use crate::service::SessionFactory;
use async_trait::async_trait;
use connection::{SessionKind, SqlClient};
use row::RowExt;
use tiberius::{Query, Row};
use tokio::sync::Mutex;

/// Opens tiberius-backed sessions.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqlServerConnector;

impl SqlServerConnector {
    /// Creates a connector.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SessionFactory for SqlServerConnector {
    async fn open_query_connection(
        &self,
        target: &ConnectionTarget,
    ) -> Result<Box<dyn TableCatalogSource>> {
        Ok(Box::new(
            SqlServerBackend::connect(target, SessionKind::Query).await?,
        ))
    }

    async fn open_scripting_session(
        &self,
        target: &ConnectionTarget,
    ) -> Result<Box<dyn ScriptingBackend>> {
        Ok(Box::new(
            SqlServerBackend::connect(target, SessionKind::Scripting).await?,
        ))
    }
}

struct Session {
    client: SqlClient,
    in_database: bool,
}

/// One open connection to a SQL Server instance.
///
/// Query connections log straight into the initial catalog. Scripting
/// sessions log into the login's default database and switch to the catalog
/// once it is known to exist, so a missing database is reported as such
/// rather than as a failed login.
pub struct SqlServerBackend {
    session: Mutex<Session>,
    server_name: String,
    database: String,
}

impl std::fmt::Debug for SqlServerBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlServerBackend")
            .field("server_name", &self.server_name)
            .field("database", &self.database)
            .finish()
    }
}

impl SqlServerBackend {
    async fn connect(target: &ConnectionTarget, kind: SessionKind) -> Result<Self> {
        let client = connection::open_client(target, kind).await?;
        Ok(Self {
            session: Mutex::new(Session {
                client,
                in_database: kind == SessionKind::Query,
            }),
            server_name: target.server_name(),
            database: target.database().to_string(),
        })
    }

    async fn enter_database(&self, session: &mut Session) -> Result<bool> {
        if session.in_database {
            return Ok(true);
        }

        let mut query = Query::new(queries::DATABASE_EXISTS);
        query.bind(self.database.as_str());
        let exists = query
            .query(&mut session.client)
            .await
            .map_err(|e| DdlError::scripting_failed("checking database", e))?
            .into_row()
            .await
            .map_err(|e| DdlError::scripting_failed("checking database", e))?
            .map(|row| row.flag(0))
            .transpose()
            .map_err(|e| DdlError::scripting_failed("checking database", e))?
            .unwrap_or(false);

        if exists {
            session
                .client
                .execute(format!("USE {}", quote_name(&self.database)), &[])
                .await
                .map_err(|e| {
                    DdlError::scripting_failed(format!("switching to {}", self.database), e)
                })?;
            session.in_database = true;
        }
        Ok(exists)
    }

    fn catalog_object(&self, row: &Row) -> tiberius::Result<CatalogObject> {
        let identifier = TableIdentifier::new(row.text(1)?, row.text(2)?);
        Ok(CatalogObject {
            object_id: row.int(0)?,
            urn: Urn::for_table(&self.server_name, &self.database, &identifier),
            identifier,
        })
    }

    async fn require_database(&self, session: &mut Session) -> Result<()> {
        if self.enter_database(session).await? {
            Ok(())
        } else {
            Err(DdlError::scripting(format!(
                "database not found: {}",
                self.database
            )))
        }
    }
}

fn catalog_entry(row: &Row) -> tiberius::Result<TableCatalogEntry> {
    Ok(TableCatalogEntry {
        identifier: TableIdentifier::new(row.text(0)?, row.text(1)?),
        is_system_object: row.flag(2)?,
    })
}

#[async_trait]
impl TableCatalogSource for SqlServerBackend {
    async fn fetch_base_tables(
        &self,
        schema_filter: Option<&str>,
    ) -> Result<Vec<TableCatalogEntry>> {
        let mut session = self.session.lock().await;

        let sql = queries::list_base_tables(schema_filter.is_some());
        let mut query = Query::new(sql);
        if let Some(schema) = schema_filter {
            query.bind(schema);
        }

        let rows = query
            .query(&mut session.client)
            .await
            .map_err(|e| DdlError::query_failed("listing base tables", e))?
            .into_first_result()
            .await
            .map_err(|e| DdlError::query_failed("listing base tables", e))?;

        let entries = rows
            .iter()
            .map(catalog_entry)
            .collect::<tiberius::Result<Vec<_>>>()
            .map_err(|e| DdlError::query_failed("reading table row", e))?;

        tracing::debug!(database = %self.database, count = entries.len(), "Fetched base tables");
        Ok(entries)
    }
}

#[async_trait]
impl ScriptingBackend for SqlServerBackend {
    async fn database_exists(&self) -> Result<bool> {
        let mut session = self.session.lock().await;
        self.enter_database(&mut session).await
    }

    async fn resolve_table(&self, table: &TableIdentifier) -> Result<Option<CatalogObject>> {
        let mut session = self.session.lock().await;
        self.require_database(&mut session).await?;

        let mut query = Query::new(queries::RESOLVE_TABLE);
        query.bind(table.schema());
        query.bind(table.name());
        let row = query
            .query(&mut session.client)
            .await
            .map_err(|e| DdlError::scripting_failed(format!("resolving {}", table), e))?
            .into_row()
            .await
            .map_err(|e| DdlError::scripting_failed(format!("resolving {}", table), e))?;

        row.map(|row| self.catalog_object(&row))
            .transpose()
            .map_err(|e| DdlError::scripting_failed(format!("resolving {}", table), e))
    }

    async fn script(&self, options: &ScriptOptions, urns: &[Urn]) -> Result<Vec<String>> {
        scripting::script_from_catalog(self, options, urns).await
    }
}

#[async_trait]
impl CatalogReader for SqlServerBackend {
    async fn load_table(&self, table: &TableIdentifier) -> Result<Option<TableDefinition>> {
        let mut session = self.session.lock().await;
        self.require_database(&mut session).await?;

        schema_collection::load_table_definition(&mut session.client, table)
            .await
            .map_err(|e| DdlError::scripting_failed(format!("reading metadata of {}", table), e))
    }
}
