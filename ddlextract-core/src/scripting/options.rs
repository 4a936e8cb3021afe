//! Scripting option policy.

use serde::{Deserialize, Serialize};

/// Switches that control what the scripter emits.
///
/// Two presets exist: [`ScriptOptions::batched`] is the canonical policy
/// (tables, keys and constraints) and [`ScriptOptions::legacy`] also emits
/// indexes and triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptOptions {
    /// Emit only `DROP TABLE` statements
    pub script_drops: bool,
    /// Pull in tables referenced by foreign keys, dependency-ordered
    pub with_dependencies: bool,
    /// Include indexes that do not back a constraint
    pub indexes: bool,
    /// Include keys, defaults, foreign keys and check constraints
    pub dri_all: bool,
    /// Include DML triggers
    pub triggers: bool,
    /// Emit an object header comment before each object
    pub include_headers: bool,
    /// Wrap tables in `SET ANSI_PADDING ON/OFF`
    pub ansi_padding: bool,
    /// Omit column `COLLATE` clauses
    pub no_collation: bool,
    /// Write `[schema].[table]` in statements
    pub schema_qualify: bool,
    /// Write `[schema].[table]` in `REFERENCES` clauses
    pub schema_qualify_foreign_keys_references: bool,
    /// Emit `GO` after each statement
    pub script_batch_terminator: bool,
}

impl ScriptOptions {
    /// Canonical policy used for batched extraction.
    pub const fn batched() -> Self {
        Self {
            script_drops: false,
            with_dependencies: false,
            indexes: false,
            dri_all: true,
            triggers: false,
            include_headers: false,
            ansi_padding: false,
            no_collation: true,
            schema_qualify: false,
            schema_qualify_foreign_keys_references: false,
            script_batch_terminator: false,
        }
    }

    /// Superseded per-table policy, which also scripts indexes and triggers.
    pub const fn legacy() -> Self {
        Self {
            indexes: true,
            triggers: true,
            ..Self::batched()
        }
    }
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self::batched()
    }
}
