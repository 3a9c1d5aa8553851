//! Chocolatey backend. Always invoked with `--limit-output` so results come
//! back as `name|version` lines.

use async_trait::async_trait;

use super::command::{probe, run_captured, run_status};
use super::parse::{parse_choco_installed, parse_choco_lines};
use super::source::{PackageSource, Timeouts};
use crate::error::Result;
use crate::types::{AppRecord, Source};

pub const DEFAULT_BINARY: &str = "choco";

#[derive(Debug, Clone)]
pub struct ChocolateySource {
    binary: String,
    timeouts: Timeouts,
}

impl ChocolateySource {
    pub fn new(binary: impl Into<String>, timeouts: Timeouts) -> Self {
        Self {
            binary: binary.into(),
            timeouts,
        }
    }
}

impl Default for ChocolateySource {
    fn default() -> Self {
        Self::new(DEFAULT_BINARY, Timeouts::default())
    }
}

#[async_trait]
impl PackageSource for ChocolateySource {
    fn source(&self) -> Source {
        Source::Chocolatey
    }

    async fn is_available(&self) -> bool {
        probe(&self.binary, self.timeouts.probe()).await
    }

    async fn search(&self, query: &str) -> Result<Vec<AppRecord>> {
        let output = run_captured(
            &self.binary,
            &["search", query, "--limit-output"],
            self.timeouts.command(),
        )
        .await?;
        Ok(parse_choco_lines(&output))
    }

    async fn installed_apps(&self) -> Result<Vec<AppRecord>> {
        let output = run_captured(
            &self.binary,
            &["list", "--local-only", "--limit-output"],
            self.timeouts.command(),
        )
        .await?;
        Ok(parse_choco_installed(&output))
    }

    async fn install(&self, package_id: &str) -> Result<()> {
        run_status(
            &self.binary,
            &["install", package_id, "-y"],
            self.timeouts.install(),
        )
        .await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    /// Write a fake `choco` that prints canned output for `search`/`list`.
    fn fake_choco(dir: &std::path::Path, exit_code: i32) -> String {
        let path = dir.join("choco");
        let script = format!(
            "#!/bin/sh\n\
             case \"$1\" in\n\
               --version) echo 2.2.2 ;;\n\
               search) echo \"$2-pkg|1.0.0\"; echo \"$2-tools|0.3\" ;;\n\
               list) echo 'chocolatey|2.2.2' ;;\n\
             esac\n\
             exit {}\n",
            exit_code
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_search_through_fake_binary() {
        let dir = tempfile::tempdir().unwrap();
        let choco = ChocolateySource::new(fake_choco(dir.path(), 0), Timeouts::default());

        assert!(choco.is_available().await);

        let apps = choco.search("node").await.unwrap();
        let ids: Vec<&str> = apps.iter().map(|a| a.package_id.as_str()).collect();
        assert_eq!(ids, vec!["node-pkg", "node-tools"]);

        let installed = choco.installed_apps().await.unwrap();
        assert_eq!(installed.len(), 1);
        assert!(installed[0].is_installed);
    }

    #[tokio::test]
    async fn test_failing_binary_is_error_not_partial() {
        let dir = tempfile::tempdir().unwrap();
        let choco = ChocolateySource::new(fake_choco(dir.path(), 1), Timeouts::default());

        assert!(!choco.is_available().await);
        assert!(choco.search("node").await.is_err());
        assert!(choco.install("node-pkg").await.is_err());
    }
}
