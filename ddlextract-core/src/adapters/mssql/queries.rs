//! Catalog queries. Integer-like columns are cast to `int` and flags to
//! `bit` so that every row decodes as `i32`, `bool` or text.

/// Base tables of the current database; `@P1` is an optional schema filter.
pub(crate) fn list_base_tables(with_schema_filter: bool) -> String {
    let mut sql = String::from(
        "SELECT t.TABLE_SCHEMA, t.TABLE_NAME,
       CAST(ISNULL(OBJECTPROPERTY(OBJECT_ID(QUOTENAME(t.TABLE_SCHEMA) + '.' + QUOTENAME(t.TABLE_NAME)), 'IsMSShipped'), 0) AS bit) AS is_system_object
FROM INFORMATION_SCHEMA.TABLES t
WHERE t.TABLE_TYPE = 'BASE TABLE'
  AND t.TABLE_SCHEMA NOT IN ('sys', 'INFORMATION_SCHEMA')",
    );
    if with_schema_filter {
        sql.push_str("\n  AND t.TABLE_SCHEMA = @P1");
    }
    sql
}

pub(crate) const DATABASE_EXISTS: &str =
    "SELECT CAST(CASE WHEN DB_ID(@P1) IS NULL THEN 0 ELSE 1 END AS bit)";

pub(crate) const RESOLVE_TABLE: &str = "SELECT t.object_id, s.name, t.name
FROM sys.tables t
JOIN sys.schemas s ON s.schema_id = t.schema_id
WHERE s.name = @P1 AND t.name = @P2";

pub(crate) const TABLE: &str = "SELECT t.object_id, s.name, t.name,
       CAST(ISNULL(t.uses_ansi_nulls, 1) AS bit),
       CAST(ISNULL(OBJECTPROPERTY(t.object_id, 'IsQuotedIdentOn'), 1) AS bit),
       ds.name,
       lob.name
FROM sys.tables t
JOIN sys.schemas s ON s.schema_id = t.schema_id
LEFT JOIN sys.indexes i ON i.object_id = t.object_id AND i.index_id IN (0, 1)
LEFT JOIN sys.data_spaces ds ON ds.data_space_id = i.data_space_id
LEFT JOIN sys.data_spaces lob ON lob.data_space_id = t.lob_data_space_id AND t.lob_data_space_id <> 0
WHERE s.name = @P1 AND t.name = @P2";

pub(crate) const COLUMNS: &str = "SELECT c.name,
       ty.name,
       CASE WHEN ty.is_user_defined = 1 THEN SCHEMA_NAME(ty.schema_id) END,
       CAST(c.max_length AS int),
       CAST(c.precision AS int),
       CAST(c.scale AS int),
       CAST(ISNULL(c.is_nullable, 1) AS bit),
       CONVERT(nvarchar(40), ic.seed_value),
       CONVERT(nvarchar(40), ic.increment_value),
       CAST(ISNULL(ic.is_not_for_replication, 0) AS bit),
       cc.definition,
       CAST(ISNULL(cc.is_persisted, 0) AS bit),
       c.collation_name,
       c.is_rowguidcol
FROM sys.columns c
JOIN sys.types ty ON ty.user_type_id = c.user_type_id
LEFT JOIN sys.identity_columns ic ON ic.object_id = c.object_id AND ic.column_id = c.column_id
LEFT JOIN sys.computed_columns cc ON cc.object_id = c.object_id AND cc.column_id = c.column_id
WHERE c.object_id = @P1
ORDER BY c.column_id";

pub(crate) const INDEX_COLUMNS: &str = "SELECT ic.index_id, c.name, ic.is_descending_key, ic.is_included_column
FROM sys.index_columns ic
JOIN sys.columns c ON c.object_id = ic.object_id AND c.column_id = ic.column_id
WHERE ic.object_id = @P1
ORDER BY ic.index_id, ic.key_ordinal, ic.index_column_id";

pub(crate) const KEY_CONSTRAINTS: &str = "SELECT i.index_id, kc.name,
       CAST(CASE WHEN kc.type = 'PK' THEN 1 ELSE 0 END AS bit),
       CAST(CASE WHEN i.type = 1 THEN 1 ELSE 0 END AS bit),
       i.is_padded,
       CAST(ISNULL(st.no_recompute, 0) AS bit),
       i.ignore_dup_key,
       i.allow_row_locks,
       i.allow_page_locks,
       CAST(i.fill_factor AS int),
       ds.name
FROM sys.key_constraints kc
JOIN sys.indexes i ON i.object_id = kc.parent_object_id AND i.index_id = kc.unique_index_id
LEFT JOIN sys.stats st ON st.object_id = i.object_id AND st.stats_id = i.index_id
LEFT JOIN sys.data_spaces ds ON ds.data_space_id = i.data_space_id
WHERE kc.parent_object_id = @P1
ORDER BY CASE WHEN kc.type = 'PK' THEN 0 ELSE 1 END, kc.name";

pub(crate) const INDEXES: &str = "SELECT i.index_id, i.name,
       i.is_unique,
       CAST(CASE WHEN i.type = 1 THEN 1 ELSE 0 END AS bit),
       i.filter_definition,
       i.is_padded,
       CAST(ISNULL(st.no_recompute, 0) AS bit),
       i.ignore_dup_key,
       i.allow_row_locks,
       i.allow_page_locks,
       CAST(i.fill_factor AS int),
       ds.name,
       i.is_disabled
FROM sys.indexes i
LEFT JOIN sys.stats st ON st.object_id = i.object_id AND st.stats_id = i.index_id
LEFT JOIN sys.data_spaces ds ON ds.data_space_id = i.data_space_id
WHERE i.object_id = @P1
  AND i.type IN (1, 2)
  AND i.is_primary_key = 0
  AND i.is_unique_constraint = 0
  AND i.is_hypothetical = 0
ORDER BY i.index_id";

pub(crate) const DEFAULT_CONSTRAINTS: &str = "SELECT dc.name, c.name, dc.definition, dc.is_system_named
FROM sys.default_constraints dc
JOIN sys.columns c ON c.object_id = dc.parent_object_id AND c.column_id = dc.parent_column_id
WHERE dc.parent_object_id = @P1
ORDER BY dc.name";

pub(crate) const FOREIGN_KEYS: &str = "SELECT fk.object_id, fk.name, rs.name, rt.name,
       CAST(fk.delete_referential_action AS int),
       CAST(fk.update_referential_action AS int),
       fk.is_not_trusted,
       fk.is_disabled,
       fk.is_not_for_replication
FROM sys.foreign_keys fk
JOIN sys.tables rt ON rt.object_id = fk.referenced_object_id
JOIN sys.schemas rs ON rs.schema_id = rt.schema_id
WHERE fk.parent_object_id = @P1
ORDER BY fk.name";

pub(crate) const FOREIGN_KEY_COLUMNS: &str = "SELECT fkc.constraint_object_id, pc.name, rc.name
FROM sys.foreign_key_columns fkc
JOIN sys.columns pc ON pc.object_id = fkc.parent_object_id AND pc.column_id = fkc.parent_column_id
JOIN sys.columns rc ON rc.object_id = fkc.referenced_object_id AND rc.column_id = fkc.referenced_column_id
WHERE fkc.parent_object_id = @P1
ORDER BY fkc.constraint_object_id, fkc.constraint_column_id";

pub(crate) const CHECK_CONSTRAINTS: &str = "SELECT name, definition, is_not_trusted, is_disabled, is_not_for_replication
FROM sys.check_constraints
WHERE parent_object_id = @P1
ORDER BY name";

pub(crate) const TRIGGERS: &str = "SELECT tr.name,
       OBJECT_DEFINITION(tr.object_id),
       tr.is_disabled,
       CAST(ISNULL(m.uses_ansi_nulls, 1) AS bit),
       CAST(ISNULL(m.uses_quoted_identifier, 1) AS bit)
FROM sys.triggers tr
LEFT JOIN sys.sql_modules m ON m.object_id = tr.object_id
WHERE tr.parent_id = @P1
ORDER BY tr.name";
