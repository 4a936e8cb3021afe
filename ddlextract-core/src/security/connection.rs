//! Connection string resolution for SQL Server targets.
//!
//! Two input forms are accepted:
//! - ADO.NET key/value strings: `Server=db,1433;Database=sales;User Id=sa;Password=...;`
//! - URLs: `mssql://sa:secret@db:1433/sales?encrypt=false`
//!
//! # Security
//! - Credentials are moved into `Zeroizing` containers as soon as they are read
//! - `ConnectionTarget` never prints them; use [`ConnectionTarget::to_safe_string`]

use super::credentials::Credentials;
use crate::error::DdlError;

/// Port SQL Server listens on when no instance or port is given.
pub const DEFAULT_PORT: u16 = 1433;

/// Reasons a connection string is rejected before any network traffic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionStringError {
    /// Syntax error in the key/value list or URL
    #[error("malformed connection string: {0}")]
    Malformed(String),
    /// No `Server` / `Data Source` key, or an empty host
    #[error("no data source given")]
    MissingDataSource,
    /// No `Database` / `Initial Catalog` key
    #[error("no initial catalog given")]
    MissingCatalog,
    /// Windows integrated authentication was requested
    #[error("integrated security is not supported; use SQL authentication")]
    IntegratedSecurity,
    /// Port component is not a valid TCP port
    #[error("invalid port '{0}'")]
    InvalidPort(String),
    /// A boolean option had an unrecognized value
    #[error("invalid value '{value}' for '{key}'")]
    InvalidBoolean { key: String, value: String },
    /// No SQL login was supplied by any source
    #[error("no SQL login supplied")]
    MissingLogin,
}

impl From<ConnectionStringError> for DdlError {
    fn from(error: ConnectionStringError) -> Self {
        DdlError::connection_failed("connection string rejected", error)
    }
}

/// A fully resolved SQL Server target. Immutable once built.
///
/// # Example
/// ```rust
/// use ddlextract_core::security::ConnectionTarget;
///
/// let target = ConnectionTarget::resolve("Server=db01,1433;Database=sales;User Id=sa;Password=pw;")?;
/// assert_eq!(target.host(), "db01");
/// assert_eq!(target.database(), "sales");
/// assert_eq!(target.to_safe_string(), "mssql://db01:1433/sales");
/// # Ok::<(), ddlextract_core::DdlError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionTarget {
    host: String,
    port: Option<u16>,
    instance: Option<String>,
    database: String,
    encrypt: bool,
    trust_server_certificate: bool,
    application_name: Option<String>,
    credentials: Credentials,
}

impl ConnectionTarget {
    /// Resolves a connection string using only the credentials it embeds.
    ///
    /// # Errors
    /// Returns `DdlError::Connection` when the string is malformed, names no
    /// data source or initial catalog, or asks for integrated security.
    pub fn resolve(connection_string: &str) -> crate::Result<Self> {
        Self::resolve_with(connection_string, None, None)
    }

    /// Resolves a connection string, letting separately supplied values
    /// override the user and password it embeds.
    ///
    /// # Errors
    /// Same as [`ConnectionTarget::resolve`].
    pub fn resolve_with(
        connection_string: &str,
        username: Option<String>,
        password: Option<String>,
    ) -> crate::Result<Self> {
        let trimmed = connection_string.trim();
        let target = if trimmed.contains("://") {
            parse_url(trimmed)?
        } else {
            parse_key_values(trimmed)?
        };

        let credentials = target.credentials.clone().with_overrides(username, password);
        let target = Self {
            credentials,
            ..target
        };

        tracing::debug!(server = %target.to_safe_string(), "Resolved connection target");
        Ok(target)
    }

    /// Host name or address, without instance or port.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Explicit TCP port, if one was given.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Named instance, resolved through SQL Browser when no port is given.
    pub fn instance(&self) -> Option<&str> {
        self.instance.as_deref()
    }

    /// The initial catalog.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Whether TLS is required for the whole session.
    pub fn encrypt(&self) -> bool {
        self.encrypt
    }

    /// Whether the server certificate is accepted without validation.
    pub fn trust_server_certificate(&self) -> bool {
        self.trust_server_certificate
    }

    /// Application name reported to the server.
    pub fn application_name(&self) -> Option<&str> {
        self.application_name.as_deref()
    }

    /// The login used for SQL authentication.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Fails when no login name is available from any source.
    ///
    /// # Errors
    /// Returns `DdlError::Connection` with [`ConnectionStringError::MissingLogin`].
    pub fn require_login(&self) -> crate::Result<&Credentials> {
        if self.credentials.username().trim().is_empty() {
            return Err(ConnectionStringError::MissingLogin.into());
        }
        Ok(&self.credentials)
    }

    /// Server name as the catalog addresses it: `host` or `host\instance`.
    pub fn server_name(&self) -> String {
        match &self.instance {
            Some(instance) => format!("{}\\{}", self.host, instance),
            None => self.host.clone(),
        }
    }

    /// Credential-free description, safe for logs and reports.
    pub fn to_safe_string(&self) -> String {
        let mut safe = format!("mssql://{}", self.host);
        if let Some(instance) = &self.instance {
            safe.push('\\');
            safe.push_str(instance);
        }
        match (self.port, &self.instance) {
            (Some(port), _) => safe.push_str(&format!(":{}", port)),
            (None, None) => safe.push_str(&format!(":{}", DEFAULT_PORT)),
            (None, Some(_)) => {}
        }
        safe.push('/');
        safe.push_str(&self.database);
        safe
    }
}

#[derive(Default)]
struct Builder {
    host: Option<String>,
    port: Option<u16>,
    instance: Option<String>,
    database: Option<String>,
    username: Option<String>,
    password: Option<String>,
    encrypt: Option<bool>,
    trust_server_certificate: bool,
    application_name: Option<String>,
}

impl Builder {
    fn data_source(&mut self, value: &str) -> Result<(), ConnectionStringError> {
        let (host, port, instance) = split_data_source(value)?;
        self.host = Some(host);
        self.port = port;
        self.instance = instance;
        Ok(())
    }

    fn build(self) -> Result<ConnectionTarget, ConnectionStringError> {
        let host = self
            .host
            .filter(|h| !h.is_empty())
            .ok_or(ConnectionStringError::MissingDataSource)?;
        let database = self
            .database
            .filter(|d| !d.trim().is_empty())
            .ok_or(ConnectionStringError::MissingCatalog)?;

        Ok(ConnectionTarget {
            host,
            port: self.port,
            instance: self.instance,
            database,
            encrypt: self.encrypt.unwrap_or(true),
            trust_server_certificate: self.trust_server_certificate,
            application_name: self.application_name,
            credentials: Credentials::new(self.username.unwrap_or_default(), self.password),
        })
    }
}

fn parse_key_values(input: &str) -> Result<ConnectionTarget, ConnectionStringError> {
    let mut builder = Builder::default();

    for (key, value) in split_pairs(input)? {
        match key.as_str() {
            "data source" | "server" | "address" | "addr" | "network address" => {
                builder.data_source(&value)?;
            }
            "initial catalog" | "database" => builder.database = Some(value),
            "user id" | "uid" | "user" => builder.username = Some(value),
            "password" | "pwd" => builder.password = Some(value),
            "encrypt" => builder.encrypt = Some(parse_encrypt(&key, &value)?),
            "trustservercertificate" | "trust server certificate" => {
                builder.trust_server_certificate = parse_bool(&key, &value)?;
            }
            "application name" | "app" => builder.application_name = Some(value),
            "integrated security" | "trusted_connection" => {
                if value.eq_ignore_ascii_case("sspi") || parse_bool(&key, &value)? {
                    return Err(ConnectionStringError::IntegratedSecurity);
                }
            }
            other => tracing::debug!(key = other, "Ignoring unsupported connection keyword"),
        }
    }

    builder.build()
}

/// Percent-decodes one URL component.
fn decode_component(name: &str, raw: &str) -> Result<String, ConnectionStringError> {
    percent_encoding::percent_decode_str(raw)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| ConnectionStringError::Malformed(format!("{} is not valid UTF-8", name)))
}

fn parse_url(input: &str) -> Result<ConnectionTarget, ConnectionStringError> {
    let url = url::Url::parse(input).map_err(|e| ConnectionStringError::Malformed(e.to_string()))?;

    if !matches!(url.scheme(), "mssql" | "sqlserver") {
        return Err(ConnectionStringError::Malformed(format!(
            "unsupported scheme '{}'",
            url.scheme()
        )));
    }

    let mut builder = Builder {
        host: url.host_str().map(str::to_string),
        port: url.port(),
        ..Default::default()
    };

    let path = url.path().trim_start_matches('/');
    if !path.is_empty() {
        builder.database = Some(decode_component("database", path)?);
    }
    if !url.username().is_empty() {
        builder.username = Some(decode_component("username", url.username())?);
    }
    builder.password = url
        .password()
        .map(|password| decode_component("password", password))
        .transpose()?;

    for (key, value) in url.query_pairs() {
        let key = key.to_lowercase();
        match key.as_str() {
            "encrypt" => builder.encrypt = Some(parse_encrypt(&key, &value)?),
            "trustservercertificate" | "trust_server_certificate" => {
                builder.trust_server_certificate = parse_bool(&key, &value)?;
            }
            "instance" => builder.instance = Some(value.into_owned()),
            "application_name" | "applicationname" => {
                builder.application_name = Some(value.into_owned());
            }
            "integrated_security" | "trusted_connection" => {
                if parse_bool(&key, &value)? {
                    return Err(ConnectionStringError::IntegratedSecurity);
                }
            }
            other => tracing::debug!(key = other, "Ignoring unsupported URL parameter"),
        }
    }

    builder.build()
}

/// Splits `key=value;` pairs, honouring values quoted with `'` or `"`.
/// Keys are lowercased with inner whitespace collapsed.
fn split_pairs(input: &str) -> Result<Vec<(String, String)>, ConnectionStringError> {
    let mut pairs = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(c) if c.is_whitespace() || *c == ';') {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        loop {
            match chars.next() {
                Some('=') => break,
                Some(';') | None => {
                    return Err(ConnectionStringError::Malformed(format!(
                        "keyword '{}' has no value",
                        key.trim()
                    )));
                }
                Some(c) => key.push(c),
            }
        }
        let key = key.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        if key.is_empty() {
            return Err(ConnectionStringError::Malformed("empty keyword".to_string()));
        }

        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }

        let mut value = String::new();
        match chars.peek().copied() {
            Some(quote @ ('"' | '\'')) => {
                chars.next();
                loop {
                    match chars.next() {
                        Some(c) if c == quote => {
                            if chars.peek() == Some(&quote) {
                                chars.next();
                                value.push(quote);
                            } else {
                                break;
                            }
                        }
                        Some(c) => value.push(c),
                        None => {
                            return Err(ConnectionStringError::Malformed(format!(
                                "unterminated quote in value of '{}'",
                                key
                            )));
                        }
                    }
                }
                while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
                    chars.next();
                }
                if !matches!(chars.peek(), Some(';') | None) {
                    return Err(ConnectionStringError::Malformed(format!(
                        "unexpected text after quoted value of '{}'",
                        key
                    )));
                }
            }
            _ => {
                while let Some(c) = chars.peek().copied() {
                    if c == ';' {
                        break;
                    }
                    value.push(c);
                    chars.next();
                }
                value = value.trim_end().to_string();
            }
        }

        pairs.push((key, value));
    }

    Ok(pairs)
}

/// Splits `tcp:host\instance,port` into its parts.
fn split_data_source(
    value: &str,
) -> Result<(String, Option<u16>, Option<String>), ConnectionStringError> {
    let value = value.trim();
    let value = match value.get(..4) {
        Some(prefix) if prefix.eq_ignore_ascii_case("tcp:") => &value[4..],
        _ => value,
    };

    let (rest, port) = match value.rsplit_once(',') {
        Some((rest, port)) => {
            let port = port
                .trim()
                .parse::<u16>()
                .ok()
                .filter(|p| *p != 0)
                .ok_or_else(|| ConnectionStringError::InvalidPort(port.trim().to_string()))?;
            (rest.trim(), Some(port))
        }
        None => (value, None),
    };

    let (host, instance) = match rest.split_once('\\') {
        Some((host, instance)) if !instance.trim().is_empty() => {
            (host.trim(), Some(instance.trim().to_string()))
        }
        Some((host, _)) => (host.trim(), None),
        None => (rest, None),
    };

    let host = match host {
        "." | "(local)" => "localhost",
        other => other,
    };
    if host.is_empty() {
        return Err(ConnectionStringError::MissingDataSource);
    }

    Ok((host.to_string(), port, instance))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConnectionStringError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(ConnectionStringError::InvalidBoolean {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_encrypt(key: &str, value: &str) -> Result<bool, ConnectionStringError> {
    match value.trim().to_lowercase().as_str() {
        "mandatory" | "strict" => Ok(true),
        "optional" => Ok(false),
        _ => parse_bool(key, value),
    }
}
