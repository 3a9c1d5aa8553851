//! View and source filters, and the pure function that composes the
//! displayed application set from them.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::types::{AppRecord, Source};

/// Which base population is shown when not in search mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewFilter {
    /// Installed apps plus saved apps that are not installed
    #[serde(rename = "all")]
    AllResults,
    #[default]
    #[serde(rename = "installed")]
    InstalledOnly,
    #[serde(rename = "saved")]
    SavedApps,
}

impl ViewFilter {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::AllResults => "All Results",
            Self::InstalledOnly => "Installed Only",
            Self::SavedApps => "Saved Apps",
        }
    }
}

impl fmt::Display for ViewFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ViewFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "all results" => Ok(Self::AllResults),
            "installed" | "installed only" => Ok(Self::InstalledOnly),
            "saved" | "saved apps" => Ok(Self::SavedApps),
            other => Err(format!(
                "unknown view '{}' (expected all, installed or saved)",
                other
            )),
        }
    }
}

/// Narrows the displayed set to one backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum SourceFilter {
    #[default]
    All,
    Only(Source),
}

impl SourceFilter {
    /// Exact, case-insensitive comparison of source names.
    pub fn matches(&self, app: &AppRecord) -> bool {
        match self {
            Self::All => true,
            Self::Only(source) => app.source.as_str().eq_ignore_ascii_case(source.as_str()),
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Self::All => "All Sources",
            Self::Only(source) => source.display_name(),
        }
    }
}

impl fmt::Display for SourceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for SourceFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("all") || trimmed.eq_ignore_ascii_case("all sources") {
            Ok(Self::All)
        } else {
            Ok(Self::Only(Source::from(trimmed)))
        }
    }
}

/// The base sets a view is composed from.
pub struct ViewInputs<'a> {
    pub all: &'a [AppRecord],
    pub installed: &'a [AppRecord],
    pub saved: &'a [AppRecord],
    pub is_search_mode: bool,
}

/// Compose the displayed apps.
///
/// In search mode the search results are shown whatever the view filter.
/// Otherwise the view picks the base set. "All Results" shows installed apps
/// followed by saved apps whose package id is not installed under any
/// source; installed entries win on conflict. The source filter then narrows
/// the base set without reordering it.
pub fn compose_view(
    inputs: ViewInputs<'_>,
    view: ViewFilter,
    source: &SourceFilter,
) -> Vec<AppRecord> {
    let base: Vec<&AppRecord> = if inputs.is_search_mode {
        inputs.all.iter().collect()
    } else {
        match view {
            ViewFilter::InstalledOnly => inputs.installed.iter().collect(),
            ViewFilter::SavedApps => inputs.saved.iter().collect(),
            ViewFilter::AllResults => {
                // Matches on package id alone, ignoring source
                let installed_ids: HashSet<&str> = inputs
                    .installed
                    .iter()
                    .map(|app| app.package_id.as_str())
                    .collect();
                inputs
                    .installed
                    .iter()
                    .chain(
                        inputs
                            .saved
                            .iter()
                            .filter(|app| !installed_ids.contains(app.package_id.as_str())),
                    )
                    .collect()
            }
        }
    };

    base.into_iter()
        .filter(|app| source.matches(app))
        .cloned()
        .collect()
}
