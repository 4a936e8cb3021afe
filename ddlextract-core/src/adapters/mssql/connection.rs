//! TDS connection setup.
//!
//! # Security Features
//! - The password is handed to the driver and never logged
//! - Encryption follows the target's `Encrypt` setting; certificates are only
//!   trusted blindly when `TrustServerCertificate` is set

use crate::Result;
use crate::error::DdlError;
use crate::security::{ConnectionTarget, DEFAULT_PORT};
use tiberius::{AuthMethod, Client, Config, EncryptionLevel, SqlBrowser};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

/// A connected TDS client.
pub(crate) type SqlClient = Client<Compat<TcpStream>>;

/// Which database the login lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionKind {
    /// Logs into the initial catalog directly
    Query,
    /// Logs into the login's default database; the catalog is checked and
    /// entered afterwards
    Scripting,
}

/// Builds the driver configuration for a target.
///
/// # Errors
/// Returns `DdlError::Connection` when no login is available.
pub(crate) fn build_config(target: &ConnectionTarget, kind: SessionKind) -> Result<Config> {
    let credentials = target.require_login()?;

    let mut config = Config::new();
    config.host(target.host());
    match (target.port(), target.instance()) {
        (Some(port), _) => config.port(port),
        (None, Some(instance)) => config.instance_name(instance),
        (None, None) => config.port(DEFAULT_PORT),
    }
    if kind == SessionKind::Query {
        config.database(target.database());
    }
    config.authentication(AuthMethod::sql_server(
        credentials.username(),
        credentials.password().unwrap_or_default(),
    ));
    config.application_name(target.application_name().unwrap_or("ddlextract"));

    if target.encrypt() {
        config.encryption(EncryptionLevel::Required);
    } else {
        config.encryption(EncryptionLevel::Off);
    }
    if target.trust_server_certificate() {
        config.trust_cert();
    }

    Ok(config)
}

/// Makes one connection attempt. No retry.
///
/// # Errors
/// Returns `DdlError::Connection` for unreachable hosts, TLS failures and
/// rejected logins.
pub(crate) async fn open_client(target: &ConnectionTarget, kind: SessionKind) -> Result<SqlClient> {
    let config = build_config(target, kind)?;
    let server = target.to_safe_string();

    let tcp = if target.port().is_none() && target.instance().is_some() {
        TcpStream::connect_named(&config).await.map_err(|e| {
            DdlError::connection_failed(format!("instance lookup failed for {}", server), e)
        })?
    } else {
        TcpStream::connect(config.get_addr()).await.map_err(|e| {
            DdlError::connection_failed(format!("cannot reach {}", server), e)
        })?
    };

    tcp.set_nodelay(true)
        .map_err(|e| DdlError::connection_failed(format!("socket setup failed for {}", server), e))?;

    let client = Client::connect(config, tcp.compat_write())
        .await
        .map_err(|e| DdlError::connection_failed(format!("login to {} failed", server), e))?;

    tracing::debug!(server = %server, kind = ?kind, "Connected");
    Ok(client)
}
