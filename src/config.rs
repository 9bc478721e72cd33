//! Configuration for the soft-delete layer: TOML file, then environment overrides.

use crate::errors::DbError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// How bulk lifecycle operations write their transitions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStrategy {
    /// Fetch candidates, transition each in memory, save each one.
    #[default]
    FetchThenSave,
    /// One store-side `update_many` guarded on the current `isDeleted` value.
    ConditionalUpdate,
}

impl FromStr for LifecycleStrategy {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "fetch_then_save" => Ok(Self::FetchThenSave),
            "conditional_update" => Ok(Self::ConditionalUpdate),
            other => Err(DbError::Config(format!("unknown lifecycle strategy '{other}'"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SoftDeleteConfig {
    pub strategy: LifecycleStrategy,
    /// Saves allowed in flight during a fetch-then-save bulk operation. `0` behaves as `1`.
    pub persist_concurrency: usize,
    /// Emit one audit line per transitioned document.
    pub audit: bool,
}

impl Default for SoftDeleteConfig {
    fn default() -> Self {
        Self { strategy: LifecycleStrategy::FetchThenSave, persist_concurrency: 1, audit: true }
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, DbError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(DbError::Config(format!("{key}: expected a boolean, got '{raw}'"))),
    }
}

impl SoftDeleteConfig {
    /// # Errors
    /// Returns `DbError::Toml` on malformed input or unknown keys.
    pub fn from_toml_str(s: &str) -> Result<Self, DbError> {
        Ok(toml::from_str(s)?)
    }

    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self, DbError> {
        let s = std::fs::read_to_string(path)
            .map_err(|e| DbError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&s)
    }

    /// Apply overrides from the process environment:
    /// - `SOFTDELETE_STRATEGY`
    /// - `SOFTDELETE_PERSIST_CONCURRENCY`
    /// - `SOFTDELETE_AUDIT`
    ///
    /// # Errors
    /// Returns `DbError::Config` when a variable is set to an invalid value.
    pub fn apply_env(self) -> Result<Self, DbError> {
        self.apply_vars(|k| std::env::var(k).ok())
    }

    /// Same as `apply_env` with an arbitrary variable lookup.
    ///
    /// # Errors
    /// Returns `DbError::Config` when a variable is set to an invalid value.
    pub fn apply_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DbError> {
        if let Some(s) = lookup("SOFTDELETE_STRATEGY") {
            self.strategy = s.parse()?;
        }
        if let Some(s) = lookup("SOFTDELETE_PERSIST_CONCURRENCY") {
            self.persist_concurrency = s.trim().parse().map_err(|e| {
                DbError::Config(format!("SOFTDELETE_PERSIST_CONCURRENCY: '{s}': {e}"))
            })?;
        }
        if let Some(s) = lookup("SOFTDELETE_AUDIT") {
            self.audit = parse_bool("SOFTDELETE_AUDIT", &s)?;
        }
        Ok(self)
    }

    #[must_use]
    pub fn effective_concurrency(&self) -> usize {
        self.persist_concurrency.max(1)
    }
}
