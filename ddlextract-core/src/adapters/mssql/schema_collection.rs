//! Reads full table definitions from the `sys.*` catalog views.

use super::connection::SqlClient;
use super::queries;
use super::row::RowExt;
use crate::models::TableIdentifier;
use crate::scripting::definition::{
    CheckConstraintDefinition, ColumnDefinition, ColumnType, Computed, DefaultConstraint,
    ForeignKeyDefinition, Identity, IndexColumn, IndexDefinition, IndexOptions, KeyConstraint,
    KeyKind, ReferentialAction, TableDefinition, TriggerDefinition,
};
use std::collections::HashMap;
use tiberius::{Query, Row};

/// Key and included columns of one index.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct IndexColumns {
    pub(crate) keys: Vec<IndexColumn>,
    pub(crate) included: Vec<String>,
}

/// One `sys.index_columns` row: index id, column, descending, included.
pub(crate) type IndexColumnRow = (i32, String, bool, bool);

/// One `sys.foreign_key_columns` row: constraint id, column, referenced column.
pub(crate) type ForeignKeyColumnRow = (i32, String, String);

/// Groups index column rows by index id, keeping row order within an index.
pub(crate) fn group_index_columns(rows: Vec<IndexColumnRow>) -> HashMap<i32, IndexColumns> {
    let mut grouped: HashMap<i32, IndexColumns> = HashMap::new();
    for (index_id, name, descending, included) in rows {
        let entry = grouped.entry(index_id).or_default();
        if included {
            entry.included.push(name);
        } else {
            entry.keys.push(IndexColumn { name, descending });
        }
    }
    grouped
}

/// Groups foreign key column pairs by constraint id.
pub(crate) fn group_foreign_key_columns(
    rows: Vec<ForeignKeyColumnRow>,
) -> HashMap<i32, (Vec<String>, Vec<String>)> {
    let mut grouped: HashMap<i32, (Vec<String>, Vec<String>)> = HashMap::new();
    for (constraint_id, column, referenced) in rows {
        let (columns, referenced_columns) = grouped.entry(constraint_id).or_default();
        columns.push(column);
        referenced_columns.push(referenced);
    }
    grouped
}

/// Converts a catalog fill factor; anything out of range means the server default.
pub(crate) fn fill_factor(raw: i32) -> u8 {
    u8::try_from(raw).ok().filter(|f| *f <= 100).unwrap_or(0)
}

async fn rows_for(client: &mut SqlClient, sql: &str, object_id: i32) -> tiberius::Result<Vec<Row>> {
    let mut query = Query::new(sql);
    query.bind(object_id);
    query.query(client).await?.into_first_result().await
}

/// Loads a table definition, `None` when the table does not exist.
pub(crate) async fn load_table_definition(
    client: &mut SqlClient,
    table: &TableIdentifier,
) -> tiberius::Result<Option<TableDefinition>> {
    let mut query = Query::new(queries::TABLE);
    query.bind(table.schema());
    query.bind(table.name());
    let header = query.query(client).await?.into_row().await?;
    let Some(header) = header else {
        return Ok(None);
    };

    let object_id = header.int(0)?;
    let mut definition = TableDefinition::new(TableIdentifier::new(header.text(1)?, header.text(2)?));
    definition.ansi_nulls = header.flag(3)?;
    definition.quoted_identifier = header.flag(4)?;
    definition.filegroup = header.opt_text(5)?;
    definition.text_image_filegroup = header.opt_text(6)?;

    definition.columns = load_columns(client, object_id).await?;

    let index_columns = {
        let rows = rows_for(client, queries::INDEX_COLUMNS, object_id).await?;
        let mut parsed = Vec::with_capacity(rows.len());
        for row in &rows {
            parsed.push((row.int(0)?, row.text(1)?, row.flag(2)?, row.flag(3)?));
        }
        group_index_columns(parsed)
    };

    definition.key_constraints = load_key_constraints(client, object_id, &index_columns).await?;
    definition.indexes = load_indexes(client, object_id, &index_columns).await?;
    definition.default_constraints = load_defaults(client, object_id).await?;
    definition.foreign_keys = load_foreign_keys(client, object_id).await?;
    definition.check_constraints = load_checks(client, object_id).await?;
    definition.triggers = load_triggers(client, object_id, &definition.identifier).await?;

    tracing::debug!(
        table = %definition.identifier,
        columns = definition.columns.len(),
        foreign_keys = definition.foreign_keys.len(),
        indexes = definition.indexes.len(),
        "Loaded table definition"
    );
    Ok(Some(definition))
}

async fn load_columns(client: &mut SqlClient, object_id: i32) -> tiberius::Result<Vec<ColumnDefinition>> {
    let rows = rows_for(client, queries::COLUMNS, object_id).await?;
    let mut columns = Vec::with_capacity(rows.len());
    for row in &rows {
        let data_type = ColumnType {
            name: row.text(1)?,
            schema: row.opt_text(2)?,
            max_length: row.int(3)?,
            precision: row.int(4)?,
            scale: row.int(5)?,
        };
        let mut column = ColumnDefinition::new(row.text(0)?, data_type, row.flag(6)?);
        column.identity = match (row.opt_text(7)?, row.opt_text(8)?) {
            (Some(seed), Some(increment)) => Some(Identity {
                seed,
                increment,
                not_for_replication: row.flag(9)?,
            }),
            _ => None,
        };
        column.computed = match row.opt_text(10)? {
            Some(definition) => Some(Computed {
                definition,
                is_persisted: row.flag(11)?,
            }),
            None => None,
        };
        column.collation = row.opt_text(12)?;
        column.is_rowguidcol = row.flag(13)?;
        columns.push(column);
    }
    Ok(columns)
}

fn index_options(row: &Row, first: usize) -> tiberius::Result<IndexOptions> {
    Ok(IndexOptions {
        pad_index: row.flag(first)?,
        statistics_norecompute: row.flag(first + 1)?,
        ignore_dup_key: row.flag(first + 2)?,
        allow_row_locks: row.flag(first + 3)?,
        allow_page_locks: row.flag(first + 4)?,
        fill_factor: fill_factor(row.int(first + 5)?),
    })
}

async fn load_key_constraints(
    client: &mut SqlClient,
    object_id: i32,
    index_columns: &HashMap<i32, IndexColumns>,
) -> tiberius::Result<Vec<KeyConstraint>> {
    let rows = rows_for(client, queries::KEY_CONSTRAINTS, object_id).await?;
    let mut constraints = Vec::with_capacity(rows.len());
    for row in &rows {
        let index_id = row.int(0)?;
        constraints.push(KeyConstraint {
            name: row.text(1)?,
            kind: if row.flag(2)? {
                KeyKind::PrimaryKey
            } else {
                KeyKind::Unique
            },
            clustered: row.flag(3)?,
            columns: index_columns
                .get(&index_id)
                .map(|c| c.keys.clone())
                .unwrap_or_default(),
            options: index_options(row, 4)?,
            filegroup: row.opt_text(10)?,
        });
    }
    Ok(constraints)
}

async fn load_indexes(
    client: &mut SqlClient,
    object_id: i32,
    index_columns: &HashMap<i32, IndexColumns>,
) -> tiberius::Result<Vec<IndexDefinition>> {
    let rows = rows_for(client, queries::INDEXES, object_id).await?;
    let mut indexes = Vec::with_capacity(rows.len());
    for row in &rows {
        let index_id = row.int(0)?;
        let columns = index_columns.get(&index_id).cloned().unwrap_or_default();
        indexes.push(IndexDefinition {
            name: row.text(1)?,
            is_unique: row.flag(2)?,
            clustered: row.flag(3)?,
            columns: columns.keys,
            included_columns: columns.included,
            filter: row.opt_text(4)?,
            options: index_options(row, 5)?,
            filegroup: row.opt_text(11)?,
            is_disabled: row.flag(12)?,
        });
    }
    Ok(indexes)
}

async fn load_defaults(client: &mut SqlClient, object_id: i32) -> tiberius::Result<Vec<DefaultConstraint>> {
    let rows = rows_for(client, queries::DEFAULT_CONSTRAINTS, object_id).await?;
    let mut defaults = Vec::with_capacity(rows.len());
    for row in &rows {
        defaults.push(DefaultConstraint {
            name: row.text(0)?,
            column: row.text(1)?,
            definition: row.text(2)?,
            is_system_named: row.flag(3)?,
        });
    }
    Ok(defaults)
}

async fn load_foreign_keys(
    client: &mut SqlClient,
    object_id: i32,
) -> tiberius::Result<Vec<ForeignKeyDefinition>> {
    let key_rows = rows_for(client, queries::FOREIGN_KEYS, object_id).await?;
    if key_rows.is_empty() {
        return Ok(Vec::new());
    }

    let column_rows = rows_for(client, queries::FOREIGN_KEY_COLUMNS, object_id).await?;
    let mut parsed = Vec::with_capacity(column_rows.len());
    for row in &column_rows {
        parsed.push((row.int(0)?, row.text(1)?, row.text(2)?));
    }
    let mut columns = group_foreign_key_columns(parsed);

    let mut foreign_keys = Vec::with_capacity(key_rows.len());
    for row in &key_rows {
        let (local, referenced) = columns.remove(&row.int(0)?).unwrap_or_default();
        foreign_keys.push(ForeignKeyDefinition {
            name: row.text(1)?,
            columns: local,
            referenced_table: TableIdentifier::new(row.text(2)?, row.text(3)?),
            referenced_columns: referenced,
            on_delete: ReferentialAction::from_code(row.int(4)?),
            on_update: ReferentialAction::from_code(row.int(5)?),
            is_not_trusted: row.flag(6)?,
            is_disabled: row.flag(7)?,
            not_for_replication: row.flag(8)?,
        });
    }
    Ok(foreign_keys)
}

async fn load_checks(
    client: &mut SqlClient,
    object_id: i32,
) -> tiberius::Result<Vec<CheckConstraintDefinition>> {
    let rows = rows_for(client, queries::CHECK_CONSTRAINTS, object_id).await?;
    let mut checks = Vec::with_capacity(rows.len());
    for row in &rows {
        checks.push(CheckConstraintDefinition {
            name: row.text(0)?,
            definition: row.text(1)?,
            is_not_trusted: row.flag(2)?,
            is_disabled: row.flag(3)?,
            not_for_replication: row.flag(4)?,
        });
    }
    Ok(checks)
}

async fn load_triggers(
    client: &mut SqlClient,
    object_id: i32,
    table: &TableIdentifier,
) -> tiberius::Result<Vec<TriggerDefinition>> {
    let rows = rows_for(client, queries::TRIGGERS, object_id).await?;
    let mut triggers = Vec::with_capacity(rows.len());
    for row in &rows {
        let name = row.text(0)?;
        let Some(definition) = row.opt_text(1)? else {
            tracing::warn!(%table, trigger = %name, "Skipping encrypted trigger");
            continue;
        };
        triggers.push(TriggerDefinition {
            name,
            definition,
            is_disabled: row.flag(2)?,
            uses_ansi_nulls: row.flag(3)?,
            uses_quoted_identifier: row.flag(4)?,
        });
    }
    Ok(triggers)
}
