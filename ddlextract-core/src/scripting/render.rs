//! Renders [`TableDefinition`]s as T-SQL in the layout SQL Server tooling uses.
//!
//! Every statement is terminated with `;`. Within a batch all tables are
//! created first; defaults, foreign keys and check constraints follow once
//! every table exists.

use super::definition::{
    CheckConstraintDefinition, ColumnDefinition, DefaultConstraint, ForeignKeyDefinition,
    IndexColumn, IndexDefinition, IndexOptions, KeyConstraint, KeyKind, TableDefinition,
    TriggerDefinition,
};
use super::options::ScriptOptions;
use crate::models::{TableIdentifier, quote_name};

/// Renders the statements for a set of tables, in order.
///
/// The caller decides the table order; see
/// [`super::ordering::order_by_dependencies`].
pub fn render_tables(tables: &[TableDefinition], options: &ScriptOptions) -> Vec<String> {
    let mut out = Output::new(options);

    if options.script_drops {
        for table in tables.iter().rev() {
            out.header("Table", &table.identifier);
            out.statement(format!("DROP TABLE IF EXISTS {};", out.name(&table.identifier)));
        }
        return out.lines;
    }

    for table in tables {
        render_table(&mut out, table);
    }

    if options.dri_all {
        for table in tables {
            for default in &table.default_constraints {
                out.statement(render_default(&out, table, default));
            }
        }
        for table in tables {
            for fk in &table.foreign_keys {
                render_foreign_key(&mut out, table, fk);
            }
        }
        for table in tables {
            for check in &table.check_constraints {
                render_check(&mut out, table, check);
            }
        }
    }

    out.lines
}

struct Output<'a> {
    options: &'a ScriptOptions,
    lines: Vec<String>,
}

impl<'a> Output<'a> {
    fn new(options: &'a ScriptOptions) -> Self {
        Self {
            options,
            lines: Vec::new(),
        }
    }

    fn statement(&mut self, sql: String) {
        self.lines.push(sql);
        if self.options.script_batch_terminator {
            self.lines.push("GO".to_string());
        }
    }

    fn header(&mut self, kind: &str, table: &TableIdentifier) {
        if self.options.include_headers {
            self.lines
                .push(format!("/****** Object:  {} {} ******/", kind, table.quoted()));
        }
    }

    fn name(&self, table: &TableIdentifier) -> String {
        if self.options.schema_qualify {
            table.quoted()
        } else {
            quote_name(table.name())
        }
    }

    fn reference_name(&self, table: &TableIdentifier) -> String {
        if self.options.schema_qualify_foreign_keys_references {
            table.quoted()
        } else {
            quote_name(table.name())
        }
    }
}

fn on_off(value: bool) -> &'static str {
    if value { "ON" } else { "OFF" }
}

fn render_table(out: &mut Output<'_>, table: &TableDefinition) {
    let options = out.options;

    out.header("Table", &table.identifier);
    out.statement(format!("SET ANSI_NULLS {};", on_off(table.ansi_nulls)));
    out.statement(format!(
        "SET QUOTED_IDENTIFIER {};",
        on_off(table.quoted_identifier)
    ));
    if options.ansi_padding {
        out.statement("SET ANSI_PADDING ON;".to_string());
    }

    let mut body: Vec<String> = table
        .columns
        .iter()
        .map(|column| render_column(column, options))
        .collect();
    if options.dri_all {
        body.extend(table.key_constraints.iter().map(render_key_constraint));
    }

    let mut sql = format!(
        "CREATE TABLE {}(\n{}\n)",
        out.name(&table.identifier),
        body.join(",\n")
    );
    if let Some(filegroup) = &table.filegroup {
        sql.push_str(&format!(" ON {}", quote_name(filegroup)));
    }
    if let Some(filegroup) = &table.text_image_filegroup {
        sql.push_str(&format!(" TEXTIMAGE_ON {}", quote_name(filegroup)));
    }
    sql.push(';');
    out.statement(sql);

    if options.ansi_padding {
        out.statement("SET ANSI_PADDING OFF;".to_string());
    }

    if options.indexes {
        for index in &table.indexes {
            render_index(out, table, index);
        }
    }

    if options.triggers {
        for trigger in &table.triggers {
            render_trigger(out, table, trigger);
        }
    }
}

fn render_column(column: &ColumnDefinition, options: &ScriptOptions) -> String {
    let name = quote_name(&column.name);

    if let Some(computed) = &column.computed {
        let mut line = format!("\t{}  AS {}", name, computed.definition);
        if computed.is_persisted {
            line.push_str(" PERSISTED");
            if !column.is_nullable {
                line.push_str(" NOT NULL");
            }
        }
        return line;
    }

    let mut line = format!("\t{} {}", name, column.data_type.render());
    if let Some(identity) = &column.identity {
        line.push_str(&format!(
            " IDENTITY({},{})",
            identity.seed, identity.increment
        ));
        if identity.not_for_replication {
            line.push_str(" NOT FOR REPLICATION");
        }
    }
    if column.is_rowguidcol {
        line.push_str(" ROWGUIDCOL");
    }
    if !options.no_collation {
        if let Some(collation) = &column.collation {
            line.push_str(&format!(" COLLATE {}", collation));
        }
    }
    line.push_str(if column.is_nullable { " NULL" } else { " NOT NULL" });
    line
}

fn render_index_columns(columns: &[IndexColumn]) -> String {
    columns
        .iter()
        .map(|column| {
            format!(
                "\t{} {}",
                quote_name(&column.name),
                if column.descending { "DESC" } else { "ASC" }
            )
        })
        .collect::<Vec<_>>()
        .join(",\n")
}

fn render_index_options(options: &IndexOptions, filegroup: Option<&String>) -> String {
    let mut with = format!(
        "WITH (PAD_INDEX = {}, STATISTICS_NORECOMPUTE = {}, IGNORE_DUP_KEY = {}, ALLOW_ROW_LOCKS = {}, ALLOW_PAGE_LOCKS = {}",
        on_off(options.pad_index),
        on_off(options.statistics_norecompute),
        on_off(options.ignore_dup_key),
        on_off(options.allow_row_locks),
        on_off(options.allow_page_locks)
    );
    if options.fill_factor > 0 {
        with.push_str(&format!(", FILLFACTOR = {}", options.fill_factor));
    }
    with.push(')');
    if let Some(filegroup) = filegroup {
        with.push_str(&format!(" ON {}", quote_name(filegroup)));
    }
    with
}

fn clustering(clustered: bool) -> &'static str {
    if clustered { "CLUSTERED" } else { "NONCLUSTERED" }
}

fn render_key_constraint(key: &KeyConstraint) -> String {
    let kind = match key.kind {
        KeyKind::PrimaryKey => "PRIMARY KEY",
        KeyKind::Unique => "UNIQUE",
    };
    format!(
        " CONSTRAINT {} {} {}\n(\n{}\n){}",
        quote_name(&key.name),
        kind,
        clustering(key.clustered),
        render_index_columns(&key.columns),
        render_index_options(&key.options, key.filegroup.as_ref())
    )
}

fn render_default(out: &Output<'_>, table: &TableDefinition, default: &DefaultConstraint) -> String {
    let constraint = if default.is_system_named {
        String::new()
    } else {
        format!("CONSTRAINT {}  ", quote_name(&default.name))
    };
    format!(
        "ALTER TABLE {} ADD  {}DEFAULT {} FOR {};",
        out.name(&table.identifier),
        constraint,
        default.definition,
        quote_name(&default.column)
    )
}

fn check_keyword(checked: bool) -> &'static str {
    if checked { "CHECK" } else { "NOCHECK" }
}

fn render_foreign_key(out: &mut Output<'_>, table: &TableDefinition, fk: &ForeignKeyDefinition) {
    let quote_list = |columns: &[String]| {
        columns
            .iter()
            .map(|c| quote_name(c))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut sql = format!(
        "ALTER TABLE {}  WITH {} ADD  CONSTRAINT {} FOREIGN KEY({})\nREFERENCES {} ({})",
        out.name(&table.identifier),
        check_keyword(!fk.is_not_trusted),
        quote_name(&fk.name),
        quote_list(&fk.columns),
        out.reference_name(&fk.referenced_table),
        quote_list(&fk.referenced_columns)
    );
    if let Some(action) = fk.on_update.sql() {
        sql.push_str(&format!("\nON UPDATE {}", action));
    }
    if let Some(action) = fk.on_delete.sql() {
        sql.push_str(&format!("\nON DELETE {}", action));
    }
    if fk.not_for_replication {
        sql.push_str("\nNOT FOR REPLICATION");
    }
    sql.push(';');
    out.statement(sql);

    out.statement(format!(
        "ALTER TABLE {} {} CONSTRAINT {};",
        out.name(&table.identifier),
        check_keyword(!fk.is_disabled),
        quote_name(&fk.name)
    ));
}

fn render_check(out: &mut Output<'_>, table: &TableDefinition, check: &CheckConstraintDefinition) {
    let replication = if check.not_for_replication {
        "NOT FOR REPLICATION "
    } else {
        ""
    };
    out.statement(format!(
        "ALTER TABLE {}  WITH {} ADD  CONSTRAINT {} CHECK  {}({});",
        out.name(&table.identifier),
        check_keyword(!check.is_not_trusted),
        quote_name(&check.name),
        replication,
        check.definition
    ));
    out.statement(format!(
        "ALTER TABLE {} {} CONSTRAINT {};",
        out.name(&table.identifier),
        check_keyword(!check.is_disabled),
        quote_name(&check.name)
    ));
}

fn render_index(out: &mut Output<'_>, table: &TableDefinition, index: &IndexDefinition) {
    out.header("Index", &table.identifier);

    let mut sql = format!(
        "CREATE {}{} INDEX {} ON {}\n(\n{}\n)",
        if index.is_unique { "UNIQUE " } else { "" },
        clustering(index.clustered),
        quote_name(&index.name),
        out.name(&table.identifier),
        render_index_columns(&index.columns)
    );

    let mut separated = false;
    if !index.included_columns.is_empty() {
        let included = index
            .included_columns
            .iter()
            .map(|c| quote_name(c))
            .collect::<Vec<_>>()
            .join(",");
        sql.push_str(&format!("\nINCLUDE({})", included));
        separated = true;
    }
    if let Some(filter) = &index.filter {
        sql.push_str(&format!("\nWHERE {}", filter));
        separated = true;
    }
    if separated {
        sql.push('\n');
    }
    sql.push_str(&render_index_options(&index.options, index.filegroup.as_ref()));
    sql.push(';');
    out.statement(sql);

    if index.is_disabled {
        out.statement(format!(
            "ALTER INDEX {} ON {} DISABLE;",
            quote_name(&index.name),
            out.name(&table.identifier)
        ));
    }
}

fn render_trigger(out: &mut Output<'_>, table: &TableDefinition, trigger: &TriggerDefinition) {
    out.header("Trigger", &table.identifier);
    out.statement(format!("SET ANSI_NULLS {};", on_off(trigger.uses_ansi_nulls)));
    out.statement(format!(
        "SET QUOTED_IDENTIFIER {};",
        on_off(trigger.uses_quoted_identifier)
    ));

    let body = trigger.definition.trim();
    if body.ends_with(';') {
        out.statement(body.to_string());
    } else {
        out.statement(format!("{};", body));
    }

    out.statement(format!(
        "ALTER TABLE {} {} TRIGGER {};",
        out.name(&table.identifier),
        if trigger.is_disabled { "DISABLE" } else { "ENABLE" },
        quote_name(&trigger.name)
    ));
}
