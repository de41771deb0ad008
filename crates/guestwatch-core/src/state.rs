use crate::error::{GuestwatchError, Result};
use crate::paths;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

const MAX_RUN_HISTORY: usize = 50;

// ---------------------------------------------------------------------------
// RunRecord
// ---------------------------------------------------------------------------

/// Summary of one completed run, kept for `guestwatch state`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub started_at: DateTime<Utc>,
    pub window_start: DateTime<Utc>,
    pub fetched: usize,
    pub qualifying: usize,
    pub new: usize,
    pub notified: usize,
    pub deliveries_ok: usize,
    pub deliveries_failed: usize,
}

// ---------------------------------------------------------------------------
// RunState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    #[serde(default = "default_version")]
    pub version: u32,
    pub last_checked_at: DateTime<Utc>,
    #[serde(default)]
    pub alerted_order_ids: BTreeSet<String>,
    #[serde(default)]
    pub runs: Vec<RunRecord>,
}

fn default_version() -> u32 {
    1
}

impl RunState {
    pub fn new(last_checked_at: DateTime<Utc>) -> Self {
        Self {
            version: 1,
            last_checked_at,
            alerted_order_ids: BTreeSet::new(),
            runs: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::state_path(root);
        if !path.exists() {
            return Err(GuestwatchError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let state: RunState = serde_yaml::from_str(&data)?;
        Ok(state)
    }

    /// Load persisted state, or start fresh with the last check one window ago.
    pub fn load_or_init(root: &Path, now: DateTime<Utc>, window: Duration) -> Result<Self> {
        match Self::load(root) {
            Err(GuestwatchError::NotInitialized) => {
                tracing::info!(
                    window_minutes = window.num_minutes(),
                    "no run state found, starting fresh"
                );
                Ok(Self::new(now - window))
            }
            other => other,
        }
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::state_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    pub fn is_alerted(&self, order_id: &str) -> bool {
        self.alerted_order_ids.contains(order_id)
    }

    pub fn mark_alerted<I, S>(&mut self, order_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alerted_order_ids
            .extend(order_ids.into_iter().map(Into::into));
    }

    /// Record a finished run. `checked_through` becomes the next window's
    /// anchor; it trails `now` while an undelivered order needs a retry.
    pub fn complete_run(&mut self, checked_through: DateTime<Utc>, record: RunRecord) {
        self.last_checked_at = checked_through;
        self.runs.push(record);
        if self.runs.len() > MAX_RUN_HISTORY {
            self.runs.drain(..self.runs.len() - MAX_RUN_HISTORY);
        }
    }

    pub fn last_run(&self) -> Option<&RunRecord> {
        self.runs.last()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
