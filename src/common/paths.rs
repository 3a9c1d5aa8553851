use std::io;
use std::path::PathBuf;

/// Centralized path management for appshelf
/// This module provides a single source of truth for all application paths

const APP_DIR: &str = "appshelf";

/// Get the main appshelf config directory
pub fn config_dir() -> io::Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "unable to determine user config directory",
            )
        })?
        .join(APP_DIR);

    std::fs::create_dir_all(&config_dir)?;
    Ok(config_dir)
}

/// Get the main appshelf data directory
pub fn data_dir() -> io::Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR);

    std::fs::create_dir_all(&data_dir)?;
    Ok(data_dir)
}

pub fn config_file() -> io::Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// SQLite database holding lists and saved apps
pub fn database_file() -> io::Result<PathBuf> {
    Ok(data_dir()?.join("applications.db"))
}

/// Default directory for CSV exports
pub fn exports_dir() -> io::Result<PathBuf> {
    let exports = data_dir()?.join("exports");
    std::fs::create_dir_all(&exports)?;
    Ok(exports)
}
