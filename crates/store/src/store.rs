//! Decision Store
//!
//! Persisted store of prior grant/deny outcomes per permission. Reads are
//! served from an in-memory map; writes triggered by the orchestrator are
//! fire-and-forget background saves whose failure is logged and never
//! propagated.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, Utc};
use directories::ProjectDirs;
use parking_lot::RwLock;
use permflow_core::platform::DecisionCache;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::flags::{DecisionFlag, DecisionRecord};

/// Default "do not re-request after a denial" window, in hours.
pub const DEFAULT_DENY_BACKOFF_HOURS: i64 = 48;

/// Store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Explicit path of the decisions file. When unset the platform data
    /// directory is used.
    pub file: Option<PathBuf>,
    /// Window during which a denied permission should not be re-requested.
    pub deny_backoff: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            file: None,
            deny_backoff: Duration::hours(DEFAULT_DENY_BACKOFF_HOURS),
        }
    }
}

impl StoreConfig {
    /// Get the default data directory path
    pub fn data_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "permflow", "permflow")
            .map(|dirs| dirs.data_dir().to_path_buf())
    }

    fn resolve_file(&self) -> Result<PathBuf> {
        if let Some(file) = &self.file {
            return Ok(file.clone());
        }
        Self::data_dir()
            .map(|dir| dir.join("decisions.toml"))
            .ok_or_else(|| StoreError::Path("Cannot determine data directory".into()))
    }
}

/// On-disk shape of the store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreData {
    #[serde(default)]
    decisions: HashMap<String, DecisionRecord>,
}

/// Persisted per-permission decision records.
///
/// Cheap to clone; clones share the same in-memory map.
#[derive(Clone)]
pub struct DecisionStore {
    config: Arc<StoreConfig>,
    data: Arc<RwLock<HashMap<String, DecisionRecord>>>,
}

impl DecisionStore {
    /// Create an empty store that saves to the configured location.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config: Arc::new(config),
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Load the store from disk, starting empty when no file exists yet.
    pub async fn load(config: StoreConfig) -> Result<Self> {
        let file = config.resolve_file()?;
        let decisions = if file.exists() {
            debug!("Loading decision store from {:?}", file);
            let contents = tokio::fs::read_to_string(&file).await?;
            let data: StoreData = toml::from_str(&contents)?;
            data.decisions
        } else {
            info!("Decision store not found, starting empty");
            HashMap::new()
        };
        Ok(Self {
            config: Arc::new(config),
            data: Arc::new(RwLock::new(decisions)),
        })
    }

    /// Save the store to disk.
    pub async fn save(&self) -> Result<()> {
        let file = self.config.resolve_file()?;
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let data = StoreData {
            decisions: self.data.read().clone(),
        };
        let contents = toml::to_string_pretty(&data)?;
        tokio::fs::write(&file, contents).await?;
        debug!("Decision store saved to {:?}", file);
        Ok(())
    }

    /// Decision flag for one permission.
    pub fn flag(&self, permission: &str) -> DecisionFlag {
        self.data
            .read()
            .get(permission)
            .map(|record| record.flag)
            .unwrap_or_default()
    }

    /// Full record for one permission, if any request was recorded.
    pub fn record(&self, permission: &str) -> Option<DecisionRecord> {
        self.data.read().get(permission).cloned()
    }

    /// True when the permission was denied within the configured back-off
    /// window, meaning a new prompt would likely just annoy the user.
    pub fn recently_denied(&self, permission: &str) -> bool {
        self.data
            .read()
            .get(permission)
            .map(|record| record.denied_within(self.config.deny_backoff, Utc::now()))
            .unwrap_or(false)
    }

    /// Record a decision in memory without touching the disk.
    pub fn set_decision(&self, permission: &str, granted: bool) {
        let mut data = self.data.write();
        data.entry(permission.to_string())
            .or_default()
            .apply(granted, Utc::now());
    }

    /// Number of permissions with a recorded decision.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// True when nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl DecisionCache for DecisionStore {
    fn persist_decision(&self, permission: &str, granted: bool) {
        self.set_decision(permission, granted);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let store = self.clone();
                handle.spawn(async move {
                    if let Err(e) = store.save().await {
                        warn!("Failed to persist permission decision: {}", e);
                    }
                });
            }
            Err(_) => {
                debug!("No async runtime, decision kept in memory only");
            }
        }
    }
}
