//! appshelf: search, install and organize Windows applications across the
//! winget and Chocolatey package managers, with named lists of saved apps
//! persisted in SQLite.

pub mod commands;
pub mod common;
pub mod error;
pub mod manager;
pub mod package;
pub mod store;
pub mod transfer;
pub mod types;
pub mod ui;

pub use error::{Error, Result};
pub use manager::AppManager;
