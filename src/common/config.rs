//! appshelf configuration file
//!
//! Stored as TOML in the user config directory. A missing file means
//! defaults; unknown or missing keys fall back to defaults as well.
//!
//! ```toml
//! default_view = "installed"
//!
//! [winget]
//! enabled = true
//! binary = "winget"
//!
//! [chocolatey]
//! enabled = false
//! binary = "choco"
//!
//! [timeouts]
//! probe_secs = 5
//! command_secs = 30
//! install_secs = 300
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::manager::ViewFilter;
use crate::package::{Timeouts, chocolatey, winget};
use crate::types::Source;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub binary: String,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_view: ViewFilter,
    pub winget: SourceConfig,
    pub chocolatey: SourceConfig,
    pub timeouts: Timeouts,
    /// Overrides the default exports directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exports_dir: Option<PathBuf>,
    /// Overrides the default database location
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_view: ViewFilter::default(),
            winget: SourceConfig {
                enabled: true,
                binary: winget::DEFAULT_BINARY.to_string(),
            },
            chocolatey: SourceConfig {
                enabled: true,
                binary: chocolatey::DEFAULT_BINARY.to_string(),
            },
            timeouts: Timeouts::default(),
            exports_dir: None,
            database: None,
        }
    }
}

impl Config {
    /// Load from the default location.
    pub fn load() -> Result<Self> {
        Self::load_from(&super::paths::config_file()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&super::paths::config_file()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// The enabled-source set, validated.
    pub fn toggles(&self) -> Result<SourceToggles> {
        SourceToggles::new(self.winget.enabled, self.chocolatey.enabled)
    }

    pub fn apply_toggles(&mut self, toggles: &SourceToggles) {
        self.winget.enabled = toggles.winget;
        self.chocolatey.enabled = toggles.chocolatey;
    }

    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database {
            Some(path) => Ok(path.clone()),
            None => Ok(super::paths::database_file()?),
        }
    }

    pub fn exports_path(&self) -> Result<PathBuf> {
        match &self.exports_dir {
            Some(path) => {
                fs::create_dir_all(path)?;
                Ok(path.clone())
            }
            None => Ok(super::paths::exports_dir()?),
        }
    }
}

/// Which sources take part in searches and refreshes.
///
/// At least one source is always enabled; every constructor and setter
/// enforces that.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceToggles {
    winget: bool,
    chocolatey: bool,
}

impl Default for SourceToggles {
    fn default() -> Self {
        Self {
            winget: true,
            chocolatey: true,
        }
    }
}

impl SourceToggles {
    pub fn new(winget: bool, chocolatey: bool) -> Result<Self> {
        if !winget && !chocolatey {
            return Err(Error::LastSourceEnabled);
        }
        Ok(Self { winget, chocolatey })
    }

    pub fn is_enabled(&self, source: &Source) -> bool {
        match source {
            Source::Winget => self.winget,
            Source::Chocolatey => self.chocolatey,
            Source::Other(_) => false,
        }
    }

    /// Enable or disable one source. Disabling the last enabled source fails
    /// and leaves the toggles untouched.
    pub fn set(&mut self, source: &Source, enabled: bool) -> Result<()> {
        let mut next = *self;
        match source {
            Source::Winget => next.winget = enabled,
            Source::Chocolatey => next.chocolatey = enabled,
            Source::Other(name) => return Err(Error::UnknownSource(name.clone())),
        }
        *self = Self::new(next.winget, next.chocolatey)?;
        Ok(())
    }

    pub fn enabled_sources(&self) -> Vec<Source> {
        Source::KNOWN
            .into_iter()
            .filter(|source| self.is_enabled(source))
            .collect()
    }
}
