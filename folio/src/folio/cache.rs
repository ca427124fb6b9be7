use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::folio::types::ActivityRecord;

/// Raw activity records as of the last collection.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySnapshot {
    pub last_fetched: DateTime<Utc>,
    pub dates: Vec<ActivityRecord>,
    #[serde(default)]
    pub bad_repos: Vec<String>,
}

impl ActivitySnapshot {
    /// Stale once the calendar month (UTC) has changed since the fetch.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        (self.last_fetched.year(), self.last_fetched.month()) != (now.year(), now.month())
    }

    pub fn needs_refresh(&self, now: DateTime<Utc>, force: bool) -> bool {
        force || self.is_stale(now)
    }
}

/// Snapshot persisted as one JSON document on disk.
#[derive(Clone, Debug)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when nothing has been stored yet.
    pub fn load(&self) -> Result<Option<ActivitySnapshot>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("reading snapshot {}", self.path.display()));
            }
        };
        let snapshot = serde_json::from_str(&contents)
            .with_context(|| format!("parsing snapshot {}", self.path.display()))?;
        Ok(Some(snapshot))
    }

    /// Replace the stored snapshot. The document is written next to the
    /// target and renamed over it, so readers never see a partial file.
    pub fn save(&self, snapshot: &ActivitySnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let body = serde_json::to_vec_pretty(snapshot).context("serializing snapshot")?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}
