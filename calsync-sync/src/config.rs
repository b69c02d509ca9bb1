//! Configuration for duplicate cleanup.

use crate::error::SyncResult;
use serde::{Deserialize, Serialize};

/// Which member of a duplicate group survives the cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeepPolicy {
    /// Keep the first entity in first-observed order.
    #[default]
    FirstObserved,
    /// Keep the first entity that is paired with a remote entity, falling
    /// back to the first observed one.
    Related,
}

/// Settings for the duplicate cleanup sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    /// When false, announcements are ignored and the sweep does nothing.
    pub enabled: bool,
    /// Maximum number of duplicate groups processed at the same time.
    pub max_concurrent_groups: usize,
    /// Tie-break between the members of a duplicate group.
    pub keep_policy: KeepPolicy,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_concurrent_groups: 4,
            keep_policy: KeepPolicy::FirstObserved,
        }
    }
}

impl CleanupConfig {
    /// A configuration that turns duplicate cleanup off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Parses a JSON configuration document. Missing fields take their
    /// default values.
    pub fn from_json(json: &str) -> SyncResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Effective group concurrency, never below one.
    pub fn concurrency(&self) -> usize {
        self.max_concurrent_groups.max(1)
    }
}
