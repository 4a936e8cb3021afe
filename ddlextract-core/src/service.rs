//! The extraction facade used by front ends.
//!
//! A [`DdlExtractor`] owns a resolved target, its configuration and a
//! single-flight gate for scripting. Every operation opens a fresh connection
//! through a [`SessionFactory`], runs under a deadline and a cancellation
//! token, and reports [`ExtractionEvent`]s to registered observers.

use crate::catalog::{self, TableCatalogSource};
use crate::cleanup;
use crate::config::ExtractorConfig;
use crate::error::DdlError;
use crate::events::{ExtractionEvent, ExtractionObserver, Operation};
use crate::scripting::{self, ScriptingBackend};
use crate::security::ConnectionTarget;
use crate::Result;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Opens the two kinds of connections an extractor needs.
///
/// Each call makes exactly one connection attempt.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Opens a plain query connection for listing tables.
    async fn open_query_connection(
        &self,
        target: &ConnectionTarget,
    ) -> Result<Box<dyn TableCatalogSource>>;

    /// Opens a catalog/scripting session on the target's initial catalog.
    async fn open_scripting_session(
        &self,
        target: &ConnectionTarget,
    ) -> Result<Box<dyn ScriptingBackend>>;
}

/// Lists and scripts tables of one database.
///
/// Clones share the scripting gate, so at most one scripting request runs at
/// a time across all clones.
///
/// # Example
/// ```rust,no_run
/// # #[cfg(feature = "mssql")]
/// # async fn example() -> Result<(), ddlextract_core::DdlError> {
/// use ddlextract_core::{DdlExtractor, ExtractorConfig, security::ConnectionTarget};
/// use tokio_util::sync::CancellationToken;
///
/// let target = ConnectionTarget::resolve("Server=db;Database=sales;User Id=sa;Password=pw;")?;
/// let extractor = DdlExtractor::sql_server(target, ExtractorConfig::default())?;
///
/// let cancel = CancellationToken::new();
/// let tables = extractor.list_tables(Some("dbo"), &cancel).await?;
/// let script = extractor.extract(&tables, &cancel).await?;
/// println!("{}", script);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DdlExtractor {
    factory: Arc<dyn SessionFactory>,
    target: Arc<ConnectionTarget>,
    config: ExtractorConfig,
    gate: Arc<Mutex<()>>,
    observers: Vec<Arc<dyn ExtractionObserver>>,
}

impl DdlExtractor {
    /// Creates an extractor over any session factory.
    ///
    /// # Errors
    /// Returns `DdlError::Configuration` if the config fails validation.
    pub fn new(
        target: ConnectionTarget,
        config: ExtractorConfig,
        factory: Arc<dyn SessionFactory>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            factory,
            target: Arc::new(target),
            config,
            gate: Arc::new(Mutex::new(())),
            observers: Vec::new(),
        })
    }

    /// Creates an extractor backed by the built-in SQL Server driver.
    ///
    /// # Errors
    /// Returns `DdlError::Configuration` if the config fails validation.
    #[cfg(feature = "mssql")]
    pub fn sql_server(target: ConnectionTarget, config: ExtractorConfig) -> Result<Self> {
        Self::new(
            target,
            config,
            Arc::new(crate::adapters::mssql::SqlServerConnector::new()),
        )
    }

    /// Registers a lifecycle observer.
    pub fn with_observer(mut self, observer: Arc<dyn ExtractionObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// The resolved target.
    pub fn target(&self) -> &ConnectionTarget {
        &self.target
    }

    /// The active configuration.
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Checks that the database exists, then opens the query connection.
    ///
    /// The scripting session goes first because the server rejects a query
    /// login whose initial catalog is missing.
    ///
    /// # Errors
    /// Connection, timeout and cancellation errors, or `DdlError::Scripting`
    /// when the initial catalog is missing.
    pub async fn test_connection(&self, cancel: &CancellationToken) -> Result<()> {
        self.observe(Operation::TestConnection, async {
            let backend = self.connect_scripting(cancel).await?;
            let exists = bounded(
                "database check",
                self.config.query_timeout,
                cancel,
                backend.database_exists(),
            )
            .await?;
            if !exists {
                return Err(DdlError::scripting("database not found"));
            }
            let _source = self.connect_query(cancel).await?;
            Ok(())
        })
        .await
    }

    /// Lists user tables as sorted `schema.name` strings.
    ///
    /// # Errors
    /// Connection, query, timeout and cancellation errors.
    pub async fn list_tables(
        &self,
        schema_filter: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        self.observe(Operation::ListTables, async {
            let source = self.connect_query(cancel).await?;
            bounded(
                "table listing",
                self.config.query_timeout,
                cancel,
                catalog::list_tables(source.as_ref(), schema_filter),
            )
            .await
        })
        .await
    }

    /// Scripts the named tables and returns the cleaned script.
    ///
    /// # Errors
    /// - `DdlError::Busy` when another scripting request is in flight
    /// - connection, scripting, timeout and cancellation errors
    /// - `DdlError::UnresolvedTables` in strict resolution mode
    pub async fn extract(&self, identifiers: &[String], cancel: &CancellationToken) -> Result<String> {
        let Ok(_guard) = self.gate.try_lock() else {
            tracing::warn!("Rejecting scripting request: another one is in progress");
            return Err(DdlError::Busy);
        };

        self.observe(Operation::ScriptTables, async {
            let backend = self.connect_scripting(cancel).await?;
            let raw = bounded(
                "table scripting",
                self.config.script_timeout,
                cancel,
                scripting::script_tables(backend.as_ref(), identifiers, &self.config),
            )
            .await?;
            Ok(cleanup::clean(&raw))
        })
        .await
    }

    /// Runs [`DdlExtractor::list_tables`] on a background task.
    pub fn spawn_list(
        &self,
        schema_filter: Option<String>,
        cancel: CancellationToken,
    ) -> JoinHandle<Result<Vec<String>>> {
        let extractor = self.clone();
        tokio::spawn(async move {
            extractor
                .list_tables(schema_filter.as_deref(), &cancel)
                .await
        })
    }

    /// Runs [`DdlExtractor::extract`] on a background task.
    pub fn spawn_extract(
        &self,
        identifiers: Vec<String>,
        cancel: CancellationToken,
    ) -> JoinHandle<Result<String>> {
        let extractor = self.clone();
        tokio::spawn(async move { extractor.extract(&identifiers, &cancel).await })
    }

    async fn connect_query(&self, cancel: &CancellationToken) -> Result<Box<dyn TableCatalogSource>> {
        tracing::debug!(server = %self.target.to_safe_string(), "Opening query connection");
        bounded(
            "connect",
            self.config.connect_timeout,
            cancel,
            self.factory.open_query_connection(&self.target),
        )
        .await
    }

    async fn connect_scripting(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Box<dyn ScriptingBackend>> {
        tracing::debug!(server = %self.target.to_safe_string(), "Opening scripting session");
        bounded(
            "connect",
            self.config.connect_timeout,
            cancel,
            self.factory.open_scripting_session(&self.target),
        )
        .await
    }

    async fn observe<T, F>(&self, operation: Operation, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.emit(&ExtractionEvent::Started { operation });
        let started = Instant::now();

        let outcome = work.await;
        match &outcome {
            Ok(_) => {
                let duration = started.elapsed();
                tracing::info!(%operation, elapsed_ms = duration.as_millis(), "Operation finished");
                self.emit(&ExtractionEvent::Finished {
                    operation,
                    duration,
                });
            }
            Err(e) => {
                tracing::error!(%operation, kind = e.kind(), error = %e, "Operation failed");
                self.emit(&ExtractionEvent::Failed {
                    operation,
                    error: e.to_string(),
                });
            }
        }
        outcome
    }

    fn emit(&self, event: &ExtractionEvent) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }
}

/// Runs `future` under a deadline, giving up early if `cancel` fires.
async fn bounded<T, F>(
    operation: &str,
    limit: Duration,
    cancel: &CancellationToken,
    future: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(DdlError::cancelled(operation)),
        outcome = tokio::time::timeout(limit, future) => {
            outcome.unwrap_or_else(|_| Err(DdlError::timeout(operation, limit)))
        }
    }
}
