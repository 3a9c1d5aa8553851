//! Windows Package Manager backend.

use async_trait::async_trait;

use super::command::{probe, run_captured, run_status};
use super::parse::{parse_winget_installed, parse_winget_table};
use super::source::{PackageSource, Timeouts};
use crate::error::Result;
use crate::types::{AppRecord, Source};

pub const DEFAULT_BINARY: &str = "winget";

#[derive(Debug, Clone)]
pub struct WingetSource {
    binary: String,
    timeouts: Timeouts,
}

impl WingetSource {
    pub fn new(binary: impl Into<String>, timeouts: Timeouts) -> Self {
        Self {
            binary: binary.into(),
            timeouts,
        }
    }
}

impl Default for WingetSource {
    fn default() -> Self {
        Self::new(DEFAULT_BINARY, Timeouts::default())
    }
}

#[async_trait]
impl PackageSource for WingetSource {
    fn source(&self) -> Source {
        Source::Winget
    }

    async fn is_available(&self) -> bool {
        probe(&self.binary, self.timeouts.probe()).await
    }

    async fn search(&self, query: &str) -> Result<Vec<AppRecord>> {
        let output = run_captured(
            &self.binary,
            &["search", query, "--accept-source-agreements"],
            self.timeouts.command(),
        )
        .await?;
        Ok(parse_winget_table(&output))
    }

    async fn installed_apps(&self) -> Result<Vec<AppRecord>> {
        let output = run_captured(&self.binary, &["list"], self.timeouts.command()).await?;
        Ok(parse_winget_installed(&output))
    }

    async fn install(&self, package_id: &str) -> Result<()> {
        run_status(
            &self.binary,
            &[
                "install",
                package_id,
                "--accept-source-agreements",
                "--accept-package-agreements",
            ],
            self.timeouts.install(),
        )
        .await
    }
}
