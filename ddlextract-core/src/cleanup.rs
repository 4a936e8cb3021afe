//! Cosmetic normalization of generated DDL.
//!
//! The pipeline removes engine session directives, storage placement,
//! collation clauses, constraint re-enable statements, unnamed default
//! statements and blank-line runs. It is pure and idempotent.

use regex::Regex;
use std::sync::OnceLock;

/// Line prefixes that are dropped entirely (case-insensitive).
const DIRECTIVE_PREFIXES: [&str; 2] = ["SET ANSI_NULLS", "SET QUOTED_IDENTIFIER"];

/// Pre-compiled cleanup patterns.
///
/// Uses `OnceLock` for thread-safe lazy initialization.
struct CleanupPatterns {
    /// Applied in order; each match is deleted
    substitutions: Vec<Regex>,
    /// Two or more line breaks with only whitespace between them
    blank_runs: Regex,
}

impl CleanupPatterns {
    fn instance() -> &'static Self {
        static PATTERNS: OnceLock<CleanupPatterns> = OnceLock::new();
        PATTERNS.get_or_init(Self::compile)
    }

    // Leading horizontal whitespace is consumed with a clause so that its
    // removal does not leave a dangling space before `;` or `,`.
    fn compile() -> Self {
        let substitutions = vec![
            // index/constraint options plus their filegroup
            Regex::new(r"(?is)[ \t]*WITH\s*\((?:[^()]|\([^()]*\))*\)\s*ON\s*\[[^\]]*\]")
                .expect("Invalid WITH/ON pattern"),
            Regex::new(r"(?is)[ \t]*TEXTIMAGE_ON\s*\[.*?\]").expect("Invalid TEXTIMAGE_ON pattern"),
            Regex::new(r"(?is)[ \t]*COLLATE\s+\w+").expect("Invalid COLLATE pattern"),
            Regex::new(r"(?is)[ \t]*\bON\s+\[PRIMARY\]").expect("Invalid ON [PRIMARY] pattern"),
            // re-enable statements for foreign keys and checks
            Regex::new(r"(?is)ALTER\s+TABLE[^;]*?CHECK\s+CONSTRAINT[^;]*?;")
                .expect("Invalid CHECK CONSTRAINT pattern"),
            // system-named defaults
            Regex::new(r"(?is)ALTER\s+TABLE[^;]*?ADD\s+DEFAULT\s+\([^;]*?\)\s+FOR\s+\[[^;]*?\];")
                .expect("Invalid ADD DEFAULT pattern"),
        ];

        Self {
            substitutions,
            blank_runs: Regex::new(r"\r?\n(?:[ \t]*\r?\n)+").expect("Invalid blank run pattern"),
        }
    }
}

/// Cleans a raw script.
///
/// Runs the line filter, the substitutions, blank-run collapsing and a final
/// trim, repeating until a pass changes nothing. Every pass only shortens its
/// input, so the loop terminates and `clean(clean(x)) == clean(x)`.
///
/// # Example
/// ```rust
/// use ddlextract_core::cleanup::clean;
///
/// let raw = "SET ANSI_NULLS ON\nCREATE TABLE [T](\n\t[Id] [int] NOT NULL\n) ON [PRIMARY];\n\n\n";
/// assert_eq!(clean(raw), "CREATE TABLE [T](\n\t[Id] [int] NOT NULL\n);");
/// ```
pub fn clean(raw: &str) -> String {
    let mut current = clean_once(raw);
    loop {
        let next = clean_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn clean_once(input: &str) -> String {
    let mut text = drop_directive_lines(input);

    let patterns = CleanupPatterns::instance();
    for pattern in &patterns.substitutions {
        text = pattern.replace_all(&text, "").into_owned();
    }

    text = patterns.blank_runs.replace_all(&text, "\n").into_owned();
    text.trim().to_string()
}

fn drop_directive_lines(input: &str) -> String {
    input
        .split('\n')
        .filter(|line| !is_directive(line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_directive(line: &str) -> bool {
    let line = line.trim_start();
    DIRECTIVE_PREFIXES.iter().any(|prefix| {
        line.get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    })
}
