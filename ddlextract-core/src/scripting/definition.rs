//! Table metadata as read from the catalog, ready for rendering.
//!
//! Expression texts (defaults, checks, computed columns, filters) are kept
//! exactly as the engine stores them, parentheses included.

use crate::models::TableIdentifier;

/// Everything needed to script one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    /// Schema-qualified table name
    pub identifier: TableIdentifier,
    /// `SET ANSI_NULLS` setting the table was created with
    pub ansi_nulls: bool,
    /// `SET QUOTED_IDENTIFIER` setting the table was created with
    pub quoted_identifier: bool,
    /// Data space of the heap or clustered index
    pub filegroup: Option<String>,
    /// Data space of LOB columns, when the table has any
    pub text_image_filegroup: Option<String>,
    /// Columns in `column_id` order
    pub columns: Vec<ColumnDefinition>,
    /// Primary key first, then unique constraints
    pub key_constraints: Vec<KeyConstraint>,
    /// Column defaults
    pub default_constraints: Vec<DefaultConstraint>,
    /// Outgoing foreign keys
    pub foreign_keys: Vec<ForeignKeyDefinition>,
    /// Table-level checks
    pub check_constraints: Vec<CheckConstraintDefinition>,
    /// Indexes not backing a key constraint
    pub indexes: Vec<IndexDefinition>,
    /// DML triggers defined on the table
    pub triggers: Vec<TriggerDefinition>,
}

impl TableDefinition {
    /// An empty definition stored on `[PRIMARY]`.
    pub fn new(identifier: TableIdentifier) -> Self {
        Self {
            identifier,
            ansi_nulls: true,
            quoted_identifier: true,
            filegroup: Some("PRIMARY".to_string()),
            text_image_filegroup: None,
            columns: Vec::new(),
            key_constraints: Vec::new(),
            default_constraints: Vec::new(),
            foreign_keys: Vec::new(),
            check_constraints: Vec::new(),
            indexes: Vec::new(),
            triggers: Vec::new(),
        }
    }

    /// Tables this one references through foreign keys, excluding itself.
    pub fn referenced_tables(&self) -> impl Iterator<Item = &TableIdentifier> {
        self.foreign_keys
            .iter()
            .map(|fk| &fk.referenced_table)
            .filter(|referenced| *referenced != &self.identifier)
    }
}

/// A column's declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnType {
    /// Type name without brackets
    pub name: String,
    /// Owning schema for alias types; `None` for system types
    pub schema: Option<String>,
    /// Storage size in bytes, `-1` for `max`
    pub max_length: i32,
    /// Digits for `decimal`/`numeric`, mantissa bits for `float`
    pub precision: i32,
    /// Digits after the point, or fractional-second digits for time types
    pub scale: i32,
}

impl ColumnType {
    /// A system type without length or precision.
    pub fn system(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            max_length: 0,
            precision: 0,
            scale: 0,
        }
    }

    /// A sized system type such as `nvarchar` (size in bytes).
    pub fn sized(name: impl Into<String>, max_length: i32) -> Self {
        Self {
            max_length,
            ..Self::system(name)
        }
    }

    /// A `decimal`/`numeric` type.
    pub fn decimal(name: impl Into<String>, precision: i32, scale: i32) -> Self {
        Self {
            precision,
            scale,
            ..Self::system(name)
        }
    }

    /// Renders the type the way SQL Server tooling writes it, e.g. `[nvarchar](50)`.
    pub fn render(&self) -> String {
        let quoted = format!("[{}]", self.name.replace(']', "]]"));
        if let Some(schema) = &self.schema {
            return format!("[{}].{}", schema.replace(']', "]]"), quoted);
        }

        match self.name.to_lowercase().as_str() {
            "nvarchar" | "nchar" => format!("{}({})", quoted, unicode_length(self.max_length)),
            "varchar" | "char" | "varbinary" | "binary" => {
                format!("{}({})", quoted, length(self.max_length))
            }
            "decimal" | "numeric" => format!("{}({}, {})", quoted, self.precision, self.scale),
            "datetime2" | "datetimeoffset" | "time" => format!("{}({})", quoted, self.scale),
            "float" if self.precision != 53 && self.precision > 0 => {
                format!("{}({})", quoted, self.precision)
            }
            _ => quoted,
        }
    }
}

/// `max_length` of unicode types counts bytes; `-1` means `max`.
fn unicode_length(bytes: i32) -> String {
    if bytes < 0 {
        "max".to_string()
    } else {
        (bytes / 2).to_string()
    }
}

fn length(value: i32) -> String {
    if value < 0 {
        "max".to_string()
    } else {
        value.to_string()
    }
}

/// Identity specification of a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Seed as the engine prints it
    pub seed: String,
    /// Increment as the engine prints it
    pub increment: String,
    /// Emit `NOT FOR REPLICATION`
    pub not_for_replication: bool,
}

/// Computed column expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Computed {
    /// Expression text, parentheses included
    pub definition: String,
    /// Emit `PERSISTED`
    pub is_persisted: bool,
}

/// One table column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    /// Column name without brackets
    pub name: String,
    /// Ignored when the column is computed
    pub data_type: ColumnType,
    /// `NULL` rather than `NOT NULL`
    pub is_nullable: bool,
    /// Set for `IDENTITY` columns
    pub identity: Option<Identity>,
    /// Set for computed columns
    pub computed: Option<Computed>,
    /// Column collation; omitted from output unless collations are kept
    pub collation: Option<String>,
    /// Emit `ROWGUIDCOL`
    pub is_rowguidcol: bool,
}

impl ColumnDefinition {
    /// A plain column with no identity, computation or collation.
    pub fn new(name: impl Into<String>, data_type: ColumnType, is_nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            is_nullable,
            identity: None,
            computed: None,
            collation: None,
            is_rowguidcol: false,
        }
    }
}

/// One key column of an index or constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexColumn {
    /// Column name without brackets
    pub name: String,
    /// Sorted `DESC` instead of `ASC`
    pub descending: bool,
}

impl IndexColumn {
    /// An ascending key column.
    pub fn ascending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descending: false,
        }
    }
}

/// Storage options shared by indexes and key constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexOptions {
    /// `PAD_INDEX`
    pub pad_index: bool,
    /// `STATISTICS_NORECOMPUTE`
    pub statistics_norecompute: bool,
    /// `IGNORE_DUP_KEY`
    pub ignore_dup_key: bool,
    /// `ALLOW_ROW_LOCKS`
    pub allow_row_locks: bool,
    /// `ALLOW_PAGE_LOCKS`
    pub allow_page_locks: bool,
    /// `0` means the server default
    pub fill_factor: u8,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            pad_index: false,
            statistics_norecompute: false,
            ignore_dup_key: false,
            allow_row_locks: true,
            allow_page_locks: true,
            fill_factor: 0,
        }
    }
}

/// Kind of a key constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// `PRIMARY KEY`
    PrimaryKey,
    /// `UNIQUE`
    Unique,
}

/// A PRIMARY KEY or UNIQUE constraint, scripted inside `CREATE TABLE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyConstraint {
    /// Constraint name
    pub name: String,
    /// Primary key or unique
    pub kind: KeyKind,
    /// `CLUSTERED` rather than `NONCLUSTERED`
    pub clustered: bool,
    /// Key columns in key order
    pub columns: Vec<IndexColumn>,
    /// Options of the backing index
    pub options: IndexOptions,
    /// Data space of the backing index
    pub filegroup: Option<String>,
}

/// A `DEFAULT` constraint on one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultConstraint {
    /// Constraint name
    pub name: String,
    /// Column the default applies to
    pub column: String,
    /// Expression text, parentheses included
    pub definition: String,
    /// System-generated names are scripted as unnamed defaults
    pub is_system_named: bool,
}

/// Referential action of a foreign key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReferentialAction {
    /// `NO ACTION`, the engine default
    #[default]
    NoAction,
    /// `CASCADE`
    Cascade,
    /// `SET NULL`
    SetNull,
    /// `SET DEFAULT`
    SetDefault,
}

impl ReferentialAction {
    /// Maps `sys.foreign_keys.*_referential_action` codes.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Cascade,
            2 => Self::SetNull,
            3 => Self::SetDefault,
            _ => Self::NoAction,
        }
    }

    /// Clause text, `None` for the default action.
    pub fn sql(self) -> Option<&'static str> {
        match self {
            Self::NoAction => None,
            Self::Cascade => Some("CASCADE"),
            Self::SetNull => Some("SET NULL"),
            Self::SetDefault => Some("SET DEFAULT"),
        }
    }
}

/// A foreign key, scripted as `ALTER TABLE ... ADD CONSTRAINT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyDefinition {
    /// Constraint name
    pub name: String,
    /// Referencing columns, paired by position with `referenced_columns`
    pub columns: Vec<String>,
    /// Table the key points at
    pub referenced_table: TableIdentifier,
    /// Key columns of the referenced table
    pub referenced_columns: Vec<String>,
    /// `ON DELETE` action
    pub on_delete: ReferentialAction,
    /// `ON UPDATE` action
    pub on_update: ReferentialAction,
    /// Created or re-enabled `WITH NOCHECK`
    pub is_not_trusted: bool,
    /// Followed by `NOCHECK CONSTRAINT`
    pub is_disabled: bool,
    /// Emit `NOT FOR REPLICATION`
    pub not_for_replication: bool,
}

/// A table-level `CHECK` constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckConstraintDefinition {
    /// Constraint name
    pub name: String,
    /// Predicate text, parentheses included
    pub definition: String,
    /// Created or re-enabled `WITH NOCHECK`
    pub is_not_trusted: bool,
    /// Followed by `NOCHECK CONSTRAINT`
    pub is_disabled: bool,
    /// Emit `NOT FOR REPLICATION`
    pub not_for_replication: bool,
}

/// An index that does not back a key constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    /// Index name
    pub name: String,
    /// `UNIQUE` index
    pub is_unique: bool,
    /// `CLUSTERED` rather than `NONCLUSTERED`
    pub clustered: bool,
    /// Key columns in key order
    pub columns: Vec<IndexColumn>,
    /// `INCLUDE` columns
    pub included_columns: Vec<String>,
    /// Filter predicate of a filtered index
    pub filter: Option<String>,
    /// `WITH (...)` options
    pub options: IndexOptions,
    /// Data space of the index
    pub filegroup: Option<String>,
    /// Followed by `ALTER INDEX ... DISABLE`
    pub is_disabled: bool,
}

/// A DML trigger on the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerDefinition {
    /// Trigger name
    pub name: String,
    /// Full `CREATE TRIGGER` text as stored by the engine
    pub definition: String,
    /// Followed by `DISABLE TRIGGER`
    pub is_disabled: bool,
    /// `SET ANSI_NULLS` setting the trigger was created with
    pub uses_ansi_nulls: bool,
    /// `SET QUOTED_IDENTIFIER` setting the trigger was created with
    pub uses_quoted_identifier: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unicode_lengths_are_halved_except_max() {
        assert_eq!(ColumnType::sized("nchar", 20).render(), "[nchar](10)");
        assert_eq!(ColumnType::sized("NVARCHAR", -1).render(), "[NVARCHAR](max)");
        assert_eq!(ColumnType::sized("nchar", -1).render(), "[nchar](max)");
    }

    #[test]
    fn test_type_rendering() {
        assert_eq!(ColumnType::system("int").render(), "[int]");
        assert_eq!(ColumnType::sized("nvarchar", 400).render(), "[nvarchar](200)");
        assert_eq!(ColumnType::sized("nvarchar", -1).render(), "[nvarchar](max)");
        assert_eq!(ColumnType::sized("varchar", 50).render(), "[varchar](50)");
        assert_eq!(ColumnType::sized("varbinary", -1).render(), "[varbinary](max)");
        assert_eq!(ColumnType::decimal("decimal", 18, 2).render(), "[decimal](18, 2)");
        assert_eq!(
            ColumnType {
                scale: 7,
                ..ColumnType::system("datetime2")
            }
            .render(),
            "[datetime2](7)"
        );
        assert_eq!(
            ColumnType {
                precision: 53,
                ..ColumnType::system("float")
            }
            .render(),
            "[float]"
        );
        assert_eq!(
            ColumnType {
                schema: Some("dbo".to_string()),
                ..ColumnType::system("Phone")
            }
            .render(),
            "[dbo].[Phone]"
        );
    }

    #[test]
    fn test_referential_action_codes() {
        assert_eq!(ReferentialAction::from_code(0), ReferentialAction::NoAction);
        assert_eq!(ReferentialAction::from_code(1).sql(), Some("CASCADE"));
        assert_eq!(ReferentialAction::from_code(2).sql(), Some("SET NULL"));
        assert_eq!(ReferentialAction::from_code(3).sql(), Some("SET DEFAULT"));
        assert_eq!(ReferentialAction::NoAction.sql(), None);
    }

    #[test]
    fn test_self_reference_not_reported() {
        let mut table = TableDefinition::new(TableIdentifier::new("dbo", "Employees"));
        table.foreign_keys.push(ForeignKeyDefinition {
            name: "FK_Manager".to_string(),
            columns: vec!["ManagerId".to_string()],
            referenced_table: TableIdentifier::new("dbo", "employees"),
            referenced_columns: vec!["Id".to_string()],
            on_delete: ReferentialAction::NoAction,
            on_update: ReferentialAction::NoAction,
            is_not_trusted: false,
            is_disabled: false,
            not_for_replication: false,
        });
        assert_eq!(table.referenced_tables().count(), 0);
    }
}
