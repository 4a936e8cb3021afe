//! Core data models shared by the lister, the scripting engine and the CLI.
//!
//! Table identity follows SQL Server conventions: schema and table names
//! compare case-insensitively, and the textual form is `schema.name`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Schemas that never contain user tables.
pub const SYSTEM_SCHEMAS: [&str; 2] = ["sys", "INFORMATION_SCHEMA"];

/// Errors produced when a `schema.name` string cannot be split into two parts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    /// The input did not contain exactly one separator outside brackets
    #[error("'{0}' is not a two-part schema.table name")]
    NotTwoPart(String),
    /// One of the two parts is empty
    #[error("'{0}' has an empty schema or table part")]
    EmptyPart(String),
    /// A `[` was opened and never closed
    #[error("'{0}' has an unterminated bracket")]
    UnterminatedQuote(String),
}

/// A table within one database, identified by schema and name.
///
/// Equality and hashing ignore case on both parts. The textual form is
/// `schema.name`; parts that contain `.`, `[` or `]` are bracket-quoted so
/// that the text always parses back to the same identifier.
///
/// # Example
/// ```rust
/// use ddlextract_core::models::TableIdentifier;
///
/// let id: TableIdentifier = "dbo.Orders".parse()?;
/// assert_eq!(id, TableIdentifier::new("DBO", "orders"));
/// assert_eq!(id.to_string(), "dbo.Orders");
/// # Ok::<(), ddlextract_core::models::IdentifierError>(())
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableIdentifier {
    schema: String,
    name: String,
}

impl TableIdentifier {
    /// Creates an identifier from its two parts.
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// Schema part as stored in the catalog.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Table part as stored in the catalog.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ordinal sort key used for deterministic listings.
    pub fn sort_key(&self) -> (&str, &str) {
        (&self.schema, &self.name)
    }

    /// Renders `[schema].[name]` with `]` escaped, as used inside T-SQL.
    pub fn quoted(&self) -> String {
        format!("{}.{}", quote_name(&self.schema), quote_name(&self.name))
    }

    /// True when the schema is one of the engine's system schemas.
    pub fn is_system_schema(&self) -> bool {
        SYSTEM_SCHEMAS
            .iter()
            .any(|system| system.eq_ignore_ascii_case(&self.schema))
    }
}

/// Brackets a single T-SQL name, doubling any closing bracket.
pub fn quote_name(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

impl PartialEq for TableIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.schema.to_lowercase() == other.schema.to_lowercase()
            && self.name.to_lowercase() == other.name.to_lowercase()
    }
}

impl Eq for TableIdentifier {}

impl Hash for TableIdentifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.schema.to_lowercase().hash(state);
        self.name.to_lowercase().hash(state);
    }
}

impl fmt::Display for TableIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}",
            display_part(&self.schema),
            display_part(&self.name)
        )
    }
}

fn display_part(part: &str) -> String {
    if part.contains(['.', '[', ']']) || part.trim() != part {
        quote_name(part)
    } else {
        part.to_string()
    }
}

impl FromStr for TableIdentifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let (schema, rest) = split_part(input)?;
        let rest = rest
            .strip_prefix('.')
            .ok_or_else(|| IdentifierError::NotTwoPart(input.to_string()))?;
        let (name, rest) = split_part(rest)?;

        if !rest.is_empty() {
            return Err(IdentifierError::NotTwoPart(input.to_string()));
        }
        if schema.is_empty() || name.is_empty() {
            return Err(IdentifierError::EmptyPart(input.to_string()));
        }

        Ok(Self { schema, name })
    }
}

/// Takes one name off the front of `input`, returning it and the remainder.
fn split_part(input: &str) -> Result<(String, &str), IdentifierError> {
    let Some(body) = input.strip_prefix('[') else {
        let end = input.find('.').unwrap_or(input.len());
        return Ok((input[..end].to_string(), &input[end..]));
    };

    let mut part = String::new();
    let mut chars = body.char_indices().peekable();
    while let Some((idx, ch)) = chars.next() {
        if ch == ']' {
            if matches!(chars.peek(), Some((_, ']'))) {
                chars.next();
                part.push(']');
                continue;
            }
            return Ok((part, &body[idx..][1..]));
        }
        part.push(ch);
    }

    Err(IdentifierError::UnterminatedQuote(input.to_string()))
}

impl TryFrom<String> for TableIdentifier {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TableIdentifier> for String {
    fn from(value: TableIdentifier) -> Self {
        value.to_string()
    }
}

/// One row of the table listing, before system objects are filtered out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCatalogEntry {
    /// Schema-qualified table name
    pub identifier: TableIdentifier,
    /// `IsMSShipped` object property
    pub is_system_object: bool,
}

impl TableCatalogEntry {
    /// Creates a user (non-system) entry.
    pub fn user(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            identifier: TableIdentifier::new(schema, name),
            is_system_object: false,
        }
    }
}

/// Opaque, stable resource identifier of a catalog object.
///
/// Formatted the way SQL Server management tooling addresses objects:
/// `Server[@Name='h']/Database[@Name='d']/Table[@Name='t' and @Schema='s']`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Urn(String);

impl Urn {
    /// Builds the URN of a table on the given server and database.
    pub fn for_table(server: &str, database: &str, table: &TableIdentifier) -> Self {
        Self(format!(
            "Server[@Name='{}']/Database[@Name='{}']/Table[@Name='{}' and @Schema='{}']",
            escape_literal(server),
            escape_literal(database),
            escape_literal(table.name()),
            escape_literal(table.schema())
        ))
    }

    /// Wraps an already formatted URN.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The URN text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Recovers the table a table URN addresses.
    pub fn table(&self) -> Option<TableIdentifier> {
        let rest = self.0.split_once("/Table[@Name='")?.1;
        let (name, rest) = read_literal(rest)?;
        let rest = rest.strip_prefix(" and @Schema='")?;
        let (schema, rest) = read_literal(rest)?;
        (rest == "]").then(|| TableIdentifier::new(schema, name))
    }
}

/// Reads a quoted literal body up to its closing `'`, undoing `''` escapes.
fn read_literal(input: &str) -> Option<(String, &str)> {
    let mut value = String::new();
    let mut chars = input.char_indices().peekable();
    while let Some((idx, ch)) = chars.next() {
        if ch == '\'' {
            if matches!(chars.peek(), Some((_, '\''))) {
                chars.next();
                value.push('\'');
                continue;
            }
            return Some((value, &input[idx..][1..]));
        }
        value.push(ch);
    }
    None
}

impl fmt::Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// A table resolved against live catalog metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogObject {
    /// Name as stored in the catalog
    pub identifier: TableIdentifier,
    /// `sys.objects.object_id`
    pub object_id: i32,
    /// Scripting address of the table
    pub urn: Urn,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_parse_simple_identifier() {
        let id: TableIdentifier = "dbo.Orders".parse().unwrap();
        assert_eq!(id.schema(), "dbo");
        assert_eq!(id.name(), "Orders");
    }

    #[test]
    fn test_parse_rejects_wrong_part_count() {
        assert!(matches!(
            "Orders".parse::<TableIdentifier>(),
            Err(IdentifierError::NotTwoPart(_))
        ));
        assert!(matches!(
            "a.b.c".parse::<TableIdentifier>(),
            Err(IdentifierError::NotTwoPart(_))
        ));
        assert!(matches!(
            ".Orders".parse::<TableIdentifier>(),
            Err(IdentifierError::EmptyPart(_))
        ));
        assert!(matches!(
            "[dbo.Orders".parse::<TableIdentifier>(),
            Err(IdentifierError::UnterminatedQuote(_))
        ));
    }

    #[test]
    fn test_parse_bracketed_parts() {
        let id: TableIdentifier = "[sales.eu].[Order]]Lines]".parse().unwrap();
        assert_eq!(id.schema(), "sales.eu");
        assert_eq!(id.name(), "Order]Lines");
        assert_eq!(id.to_string(), "[sales.eu].[Order]]Lines]");

        let round_trip: TableIdentifier = id.to_string().parse().unwrap();
        assert_eq!(round_trip, id);
    }

    #[test]
    fn test_case_insensitive_equality_and_hash() {
        let a = TableIdentifier::new("dbo", "Orders");
        let b = TableIdentifier::new("DBO", "ORDERS");
        assert_eq!(a, b);

        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_quoted_form() {
        let id = TableIdentifier::new("dbo", "Odd]Name");
        assert_eq!(id.quoted(), "[dbo].[Odd]]Name]");
    }

    #[test]
    fn test_system_schema_detection() {
        assert!(TableIdentifier::new("sys", "objects").is_system_schema());
        assert!(TableIdentifier::new("information_schema", "tables").is_system_schema());
        assert!(!TableIdentifier::new("dbo", "sys").is_system_schema());
    }

    #[test]
    fn test_serde_as_string() {
        let id = TableIdentifier::new("dbo", "Orders");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"dbo.Orders\"");

        let back: TableIdentifier = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<TableIdentifier>("\"nodot\"").is_err());
    }

    #[test]
    fn test_urn_escapes_quotes() {
        let urn = Urn::for_table("db01", "sales", &TableIdentifier::new("dbo", "O'Brien"));
        assert_eq!(
            urn.as_str(),
            "Server[@Name='db01']/Database[@Name='sales']/Table[@Name='O''Brien' and @Schema='dbo']"
        );
        assert_eq!(urn.table(), Some(TableIdentifier::new("dbo", "O'Brien")));
    }

    #[test]
    fn test_urn_table_rejects_other_objects() {
        assert_eq!(Urn::from_raw("Server[@Name='a']/Database[@Name='b']").table(), None);
        assert_eq!(Urn::from_raw("Table[@Name='unterminated").table(), None);
    }
}
