use thiserror::Error;

use crate::types::Source;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{program} failed: {detail}")]
    CommandFailed { program: String, detail: String },

    #[error("{program} timed out after {secs} seconds")]
    Timeout { program: String, secs: u64 },

    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} is not available")]
    SourceUnavailable(Source),

    #[error("unknown package source: {0}")]
    UnknownSource(String),

    #[error("list name cannot be empty")]
    EmptyListName,

    #[error("no list selected")]
    NoListSelected,

    #[error("cannot delete the default list")]
    DefaultListProtected,

    #[error("at least one package source must stay enabled")]
    LastSourceEnabled,

    #[error("list {0} not found")]
    ListNotFound(i64),

    #[error("a list named '{0}' already exists")]
    DuplicateListName(String),

    #[error("invalid CSV format: {0}")]
    InvalidCsv(String),

    #[error("failed to install {name}: {source}")]
    BatchInstall {
        name: String,
        #[source]
        source: Box<Error>,
    },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a `CommandFailed` from a finished process that exited non-zero.
    pub fn from_exit_status(program: &str, status: std::process::ExitStatus, stderr: &str) -> Self {
        let detail = match status.code() {
            Some(code) if stderr.trim().is_empty() => format!("exit code {}", code),
            Some(code) => format!("exit code {}: {}", code, stderr.trim()),
            None => "terminated by signal".to_string(),
        };
        Error::CommandFailed {
            program: program.to_string(),
            detail,
        }
    }

    /// Validation errors are raised before any side effect takes place.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::EmptyListName
                | Error::NoListSelected
                | Error::DefaultListProtected
                | Error::LastSourceEnabled
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
