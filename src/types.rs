//! Core data types shared by the adapters, the list store, and the manager.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Id of the list created on first run. It can be renamed but never deleted.
pub const DEFAULT_LIST_ID: i64 = 1;

/// Name given to the default list when the database is created.
pub const DEFAULT_LIST_NAME: &str = "Default";

/// Description given to the default list when the database is created.
pub const DEFAULT_LIST_DESCRIPTION: &str = "Default saved applications list";

/// Where an application record came from.
///
/// `Other` only shows up for records that were imported or saved with a
/// source string this build does not know about. Such records can be listed
/// and exported but not installed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Source {
    /// Windows Package Manager
    Winget,
    /// Chocolatey
    Chocolatey,
    Other(String),
}

impl Source {
    /// The two sources this build can talk to, in query order.
    pub const KNOWN: [Source; 2] = [Source::Winget, Source::Chocolatey];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Winget => "winget",
            Self::Chocolatey => "chocolatey",
            Self::Other(name) => name,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Self::Winget => "Winget",
            Self::Chocolatey => "Chocolatey",
            Self::Other(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ok(match trimmed.to_ascii_lowercase().as_str() {
            "winget" => Self::Winget,
            "chocolatey" | "choco" => Self::Chocolatey,
            _ => Self::Other(trimmed.to_string()),
        })
    }
}

impl From<&str> for Source {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(source) => source,
            Err(never) => match never {},
        }
    }
}

impl Serialize for Source {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Source {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Source::from(raw.as_str()))
    }
}

/// One application as seen by the rest of the system.
///
/// `(package_id, source)` identifies a record inside one source's results.
/// The same package id under two sources yields two distinct records.
/// `is_saved` and `list_id` only describe membership in the currently
/// selected list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppRecord {
    pub name: String,
    pub package_id: String,
    pub version: String,
    pub source: Source,
    pub description: String,
    pub is_installed: bool,
    pub is_saved: bool,
    pub list_id: Option<i64>,
}

impl AppRecord {
    pub fn new(name: impl Into<String>, package_id: impl Into<String>, source: Source) -> Self {
        Self {
            name: name.into(),
            package_id: package_id.into(),
            version: String::new(),
            source,
            description: String::new(),
            is_installed: false,
            is_saved: false,
            list_id: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn installed(mut self) -> Self {
        self.is_installed = true;
        self
    }

    /// Case-insensitive substring match on name or package id.
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self.package_id.to_lowercase().contains(&needle)
    }
}

/// A user-named collection of saved applications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppList {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl AppList {
    pub fn is_default(&self) -> bool {
        self.id == DEFAULT_LIST_ID
    }
}

/// Outcome of importing one CSV file.
#[derive(Debug)]
pub struct ImportResult {
    pub path: std::path::PathBuf,
    pub list_name: Option<String>,
    pub imported: usize,
    pub error: Option<crate::Error>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_parsing() {
        assert_eq!(Source::from("winget"), Source::Winget);
        assert_eq!(Source::from("Chocolatey"), Source::Chocolatey);
        assert_eq!(Source::from("choco"), Source::Chocolatey);
        assert_eq!(Source::from(" scoop "), Source::Other("scoop".to_string()));
    }

    #[test]
    fn test_source_serde_uses_plain_strings() {
        let json = serde_json::to_string(&Source::Chocolatey).unwrap();
        assert_eq!(json, "\"chocolatey\"");
        let parsed: Source = serde_json::from_str("\"winget\"").unwrap();
        assert_eq!(parsed, Source::Winget);
    }

    #[test]
    fn test_matches_query() {
        let app = AppRecord::new("Visual Studio Code", "Microsoft.VisualStudioCode", Source::Winget);
        assert!(app.matches_query("studio"));
        assert!(app.matches_query("MICROSOFT."));
        assert!(!app.matches_query("firefox"));
    }
}
