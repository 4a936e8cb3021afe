//! Extraction configuration.
//!
//! Holds the deadlines and policy switches for one [`crate::DdlExtractor`].
//! Credentials are never part of this struct; they travel in
//! [`crate::security::ConnectionTarget`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What to do with identifiers that do not resolve to an existing table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionMode {
    /// Skip them and log a warning
    #[default]
    Permissive,
    /// Fail the call with `DdlError::UnresolvedTables`
    Strict,
}

/// Named scripting option sets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptProfile {
    /// Tables, keys and constraints only
    #[default]
    Canonical,
    /// Also indexes and triggers, one table per invocation
    Legacy,
}

impl ScriptProfile {
    /// Invocation strategy that goes with this profile.
    pub fn default_strategy(self) -> InvocationStrategy {
        match self {
            Self::Canonical => InvocationStrategy::Batched,
            Self::Legacy => InvocationStrategy::PerTable,
        }
    }
}

/// How resolved tables are handed to the scripting backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvocationStrategy {
    /// One call for the whole selection
    #[default]
    Batched,
    /// One call per table, outputs concatenated in input order
    PerTable,
}

/// Configuration for a [`crate::DdlExtractor`].
///
/// # Example
/// ```rust
/// use ddlextract_core::config::{ExtractorConfig, ResolutionMode};
/// use std::time::Duration;
///
/// let config = ExtractorConfig::new()
///     .with_query_timeout(Duration::from_secs(10))
///     .with_resolution_mode(ResolutionMode::Strict);
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Deadline for opening one connection
    pub connect_timeout: Duration,
    /// Deadline for the table listing query
    pub query_timeout: Duration,
    /// Deadline for resolving and scripting a selection
    pub script_timeout: Duration,
    /// Handling of unknown identifiers
    pub resolution_mode: ResolutionMode,
    /// Scripting option set
    pub profile: ScriptProfile,
    /// Batch or per-table invocation
    pub strategy: InvocationStrategy,
    /// Include non-constraint indexes regardless of profile
    pub include_indexes: bool,
    /// Include DML triggers regardless of profile
    pub include_triggers: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            query_timeout: Duration::from_secs(30),
            script_timeout: Duration::from_secs(120),
            resolution_mode: ResolutionMode::default(),
            profile: ScriptProfile::default(),
            strategy: InvocationStrategy::default(),
            include_indexes: false,
            include_triggers: false,
        }
    }
}

impl ExtractorConfig {
    /// Creates a config with safe defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates configuration values.
    ///
    /// # Errors
    /// Returns `DdlError::Configuration` for zero or excessive timeouts.
    pub fn validate(&self) -> crate::Result<()> {
        for (name, value) in [
            ("connect_timeout", self.connect_timeout),
            ("query_timeout", self.query_timeout),
            ("script_timeout", self.script_timeout),
        ] {
            if value.is_zero() {
                return Err(crate::error::DdlError::configuration(format!(
                    "{} must be greater than 0",
                    name
                )));
            }
            if value > Duration::from_secs(3600) {
                return Err(crate::error::DdlError::configuration(format!(
                    "{} should not exceed one hour",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Builder method to set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Builder method to set the listing timeout.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Builder method to set the scripting timeout.
    pub fn with_script_timeout(mut self, timeout: Duration) -> Self {
        self.script_timeout = timeout;
        self
    }

    /// Builder method to set the resolution mode.
    pub fn with_resolution_mode(mut self, mode: ResolutionMode) -> Self {
        self.resolution_mode = mode;
        self
    }

    /// Builder method to set the profile together with its strategy.
    pub fn with_profile(mut self, profile: ScriptProfile) -> Self {
        self.profile = profile;
        self.strategy = profile.default_strategy();
        self
    }

    /// Builder method to override the invocation strategy.
    pub fn with_strategy(mut self, strategy: InvocationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Builder method to force indexes on.
    pub fn with_indexes(mut self, include: bool) -> Self {
        self.include_indexes = include;
        self
    }

    /// Builder method to force triggers on.
    pub fn with_triggers(mut self, include: bool) -> Self {
        self.include_triggers = include;
        self
    }

    /// Scripting options implied by the profile and overrides.
    pub fn script_options(&self) -> crate::scripting::ScriptOptions {
        let options = match self.profile {
            ScriptProfile::Canonical => crate::scripting::ScriptOptions::batched(),
            ScriptProfile::Legacy => crate::scripting::ScriptOptions::legacy(),
        };
        crate::scripting::ScriptOptions {
            indexes: options.indexes || self.include_indexes,
            triggers: options.triggers || self.include_triggers,
            ..options
        }
    }
}
