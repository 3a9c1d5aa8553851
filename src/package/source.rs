//! The adapter contract every package manager backend implements.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::Result;
use crate::types::{AppRecord, Source};

/// One package manager the aggregator can query.
///
/// Implementations shell out to an external tool. They never re-query
/// themselves after an install; refreshing is the caller's job.
#[async_trait]
pub trait PackageSource: Send + Sync {
    /// Which source the records from this adapter carry.
    fn source(&self) -> Source;

    /// Bounded probe. Any failure means "not available", never an error.
    async fn is_available(&self) -> bool;

    async fn search(&self, query: &str) -> Result<Vec<AppRecord>>;

    /// Everything this manager reports as installed, all marked installed.
    async fn installed_apps(&self) -> Result<Vec<AppRecord>>;

    async fn install(&self, package_id: &str) -> Result<()>;
}

/// Time budgets for the different kinds of invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub probe_secs: u64,
    pub command_secs: u64,
    /// Installs can download and build, so they get the longest budget.
    pub install_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            probe_secs: 5,
            command_secs: 30,
            install_secs: 300,
        }
    }
}

impl Timeouts {
    pub fn probe(&self) -> Duration {
        Duration::from_secs(self.probe_secs)
    }

    pub fn command(&self) -> Duration {
        Duration::from_secs(self.command_secs)
    }

    pub fn install(&self) -> Duration {
        Duration::from_secs(self.install_secs)
    }
}
