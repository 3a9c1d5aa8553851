use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use serde_json::json;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::common::config::Config;
use crate::manager::{AppManager, SourceFilter, ViewFilter};
use crate::store::SqliteListStore;
use crate::types::{AppList, AppRecord, Source};
use crate::ui::prelude::*;

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Search for applications
    Search {
        query: String,
        /// Only show results from this source (winget, chocolatey)
        #[arg(long)]
        source: Option<String>,
        /// Population to search: all, installed or saved
        #[arg(long, default_value = "all")]
        view: ViewFilter,
    },
    /// Show installed applications
    Installed {
        /// Only show apps from this source
        #[arg(long)]
        source: Option<String>,
    },
    /// Install an application
    Install {
        package_id: String,
        /// Package manager to install with
        #[arg(long)]
        source: String,
    },
    /// Manage saved app lists
    Lists {
        #[command(subcommand)]
        command: ListCommands,
    },
    /// Inspect and toggle package sources
    Sources {
        #[command(subcommand)]
        command: SourceCommands,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ListCommands {
    /// Show all lists
    Show,
    /// Create a new list
    Create {
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// Rename a list or change its description
    Update {
        id: i64,
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// Delete a list and its saved apps
    Delete { id: i64 },
    /// Show the apps saved to a list (defaults to the current list)
    Apps { id: Option<i64> },
    /// Save an app to a list
    Save {
        package_id: String,
        #[arg(long)]
        source: String,
        /// Display name (defaults to the package id)
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value = "")]
        version: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Target list (defaults to the current list)
        #[arg(long)]
        list: Option<i64>,
    },
    /// Remove an app from a list
    Remove {
        package_id: String,
        #[arg(long)]
        list: Option<i64>,
    },
    /// Show every list an app is saved to
    Containing { package_id: String },
    /// Install every app in a list, stopping at the first failure
    InstallAll { id: Option<i64> },
    /// Export lists to CSV
    Export {
        id: Option<i64>,
        /// Export every list
        #[arg(long)]
        all: bool,
        /// Output directory (defaults to the exports directory)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Import lists from CSV files
    Import {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum SourceCommands {
    /// Show which sources are enabled and available
    Status,
    /// Enable a source
    Enable { source: String },
    /// Disable a source
    Disable { source: String },
}

/// Open the store and build a ready-to-use manager.
fn open_manager(config: &Config) -> Result<Arc<AppManager>> {
    let db_path = config.database_path()?;
    emit(
        Level::Debug,
        "database.open",
        &format!("Using database at {}", db_path.display()),
        None,
    );
    let store = SqliteListStore::open(&db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;
    let manager = AppManager::from_config(config, Arc::new(store))?;
    manager.initialize().context("Failed to load lists")?;
    Ok(Arc::new(manager))
}

/// `config_path` is the file given with `--config`, if any; without one the
/// default location is used when the config is written back.
pub async fn handle_command(
    command: Commands,
    config: Config,
    config_path: Option<&Path>,
) -> Result<()> {
    match command {
        Commands::Search {
            query,
            source,
            view,
        } => handle_search(&config, &query, source, view).await,
        Commands::Installed { source } => handle_installed(&config, source).await,
        Commands::Install { package_id, source } => {
            handle_install(&config, &package_id, &source).await
        }
        Commands::Lists { command } => handle_lists_command(command, &config).await,
        Commands::Sources { command } => {
            handle_sources_command(command, config, config_path).await
        }
    }
}

fn source_filter(source: Option<String>) -> SourceFilter {
    source
        .map(|s| SourceFilter::Only(Source::from(s.as_str())))
        .unwrap_or_default()
}

async fn handle_search(
    config: &Config,
    query: &str,
    source: Option<String>,
    view: ViewFilter,
) -> Result<()> {
    let manager = open_manager(config)?;
    manager.set_view_filter(view);
    manager.filter_by_source(source_filter(source));

    if view == ViewFilter::InstalledOnly {
        manager.refresh_installed_apps().await;
    }
    manager.search(query).await;

    let apps = manager.current_apps();
    emit(
        Level::Info,
        "search.results",
        &format!(
            "{} result(s) for '{}' ({})",
            apps.len(),
            query,
            view.display_name()
        ),
        Some(json!({ "apps": apps })),
    );
    print_apps(&apps);
    Ok(())
}

async fn handle_installed(config: &Config, source: Option<String>) -> Result<()> {
    let manager = open_manager(config)?;
    manager.set_view_filter(ViewFilter::InstalledOnly);
    manager.filter_by_source(source_filter(source));
    manager.refresh_installed_apps().await;

    let apps = manager.current_apps();
    emit(
        Level::Info,
        "installed.list",
        &format!("{} installed app(s)", apps.len()),
        Some(json!({ "apps": apps })),
    );
    print_apps(&apps);
    Ok(())
}

async fn handle_install(config: &Config, package_id: &str, source: &str) -> Result<()> {
    let manager = open_manager(config)?;
    let app = AppRecord::new(package_id, package_id, Source::from(source));

    emit(
        Level::Info,
        "install.start",
        &format!("Installing {} with {}...", package_id, app.source.display_name()),
        None,
    );
    manager
        .install_app_and_refresh(&app)
        .await
        .with_context(|| format!("Failed to install {}", package_id))?;
    emit(
        Level::Success,
        "install.done",
        &format!("Installed {}", package_id),
        Some(json!({ "package_id": package_id, "source": app.source })),
    );
    Ok(())
}

/// Resolve an optional list id to the current list.
fn list_or_current(manager: &AppManager, id: Option<i64>) -> Result<AppList> {
    match id {
        Some(id) => manager
            .lists()
            .into_iter()
            .find(|list| list.id == id)
            .ok_or_else(|| crate::Error::ListNotFound(id).into()),
        None => Ok(manager.current_list().ok_or(crate::Error::NoListSelected)?),
    }
}

async fn handle_lists_command(command: ListCommands, config: &Config) -> Result<()> {
    let manager = open_manager(config)?;

    match command {
        ListCommands::Show => {
            let lists = manager.lists();
            emit(
                Level::Info,
                "lists.show",
                &format!("{} list(s)", lists.len()),
                Some(json!({ "lists": lists })),
            );
            print_lists(&lists, manager.current_list().map(|l| l.id));
        }
        ListCommands::Create { name, description } => {
            let list = manager.create_list(&name, &description)?;
            emit(
                Level::Success,
                "lists.created",
                &format!("Created list '{}' (id {})", list.name, list.id),
                Some(json!({ "list": list })),
            );
        }
        ListCommands::Update {
            id,
            name,
            description,
        } => {
            manager.update_list(id, &name, &description)?;
            emit(
                Level::Success,
                "lists.updated",
                &format!("Updated list {}", id),
                None,
            );
        }
        ListCommands::Delete { id } => {
            manager.delete_list(id)?;
            emit(
                Level::Success,
                "lists.deleted",
                &format!("Deleted list {}", id),
                None,
            );
        }
        ListCommands::Apps { id } => {
            let list = list_or_current(&manager, id)?;
            let apps = manager.apps_in_list(list.id)?;
            emit(
                Level::Info,
                "lists.apps",
                &format!("{} app(s) in '{}'", apps.len(), list.name),
                Some(json!({ "list": list, "apps": apps })),
            );
            print_apps(&apps);
        }
        ListCommands::Save {
            package_id,
            source,
            name,
            version,
            description,
            list,
        } => {
            let target = list_or_current(&manager, list)?;
            let app = AppRecord::new(
                name.unwrap_or_else(|| package_id.clone()),
                package_id.as_str(),
                Source::from(source.as_str()),
            )
            .with_version(version)
            .with_description(description);
            manager.save_app_to_list(&app, target.id)?;
            emit(
                Level::Success,
                "lists.saved",
                &format!("Saved {} to '{}'", package_id, target.name),
                None,
            );
        }
        ListCommands::Remove { package_id, list } => {
            let target = list_or_current(&manager, list)?;
            manager.remove_app_from_list(&package_id, target.id)?;
            emit(
                Level::Success,
                "lists.removed",
                &format!("Removed {} from '{}'", package_id, target.name),
                None,
            );
        }
        ListCommands::Containing { package_id } => {
            let lists = manager.lists_containing(&package_id)?;
            emit(
                Level::Info,
                "lists.containing",
                &format!("{} is saved in {} list(s)", package_id, lists.len()),
                Some(json!({ "lists": lists })),
            );
            print_lists(&lists, None);
        }
        ListCommands::InstallAll { id } => {
            let list = list_or_current(&manager, id)?;
            emit(
                Level::Info,
                "lists.install_all",
                &format!("Installing all apps in '{}'...", list.name),
                None,
            );
            let installed = manager.install_all_apps_in_list(list.id).await?;
            emit(
                Level::Success,
                "lists.install_all.done",
                &format!("Installed {} app(s) from '{}'", installed, list.name),
                Some(json!({ "installed": installed })),
            );
        }
        ListCommands::Export { id, all, dir } => {
            let dir = match dir {
                Some(dir) => dir,
                None => config.exports_path()?,
            };
            let paths = if all {
                manager.export_all_lists(&dir)?
            } else {
                let list = list_or_current(&manager, id)?;
                vec![manager.export_list(list.id, &dir)?]
            };
            for path in &paths {
                emit(
                    Level::Success,
                    "lists.exported",
                    &format!("Exported {}", path.display()),
                    Some(json!({ "path": path })),
                );
            }
        }
        ListCommands::Import { files } => {
            let results = manager.import_lists(&files);
            let mut failed = 0;
            for result in &results {
                match (&result.error, &result.list_name) {
                    (Some(err), _) => {
                        failed += 1;
                        emit(
                            Level::Warn,
                            "lists.import.failed",
                            &format!("{}: {}", result.path.display(), err),
                            None,
                        );
                    }
                    (None, list_name) => emit(
                        Level::Success,
                        "lists.imported",
                        &format!(
                            "Imported {} app(s) from {} into '{}'",
                            result.imported,
                            result.path.display(),
                            list_name.as_deref().unwrap_or_default()
                        ),
                        Some(json!({ "imported": result.imported })),
                    ),
                }
            }
            if failed > 0 {
                anyhow::bail!("{} of {} file(s) failed to import", failed, results.len());
            }
        }
    }

    Ok(())
}

async fn handle_sources_command(
    command: SourceCommands,
    config: Config,
    config_path: Option<&Path>,
) -> Result<()> {
    match command {
        SourceCommands::Status => {
            let manager = open_manager(&config)?;
            let toggles = manager.source_toggles();
            for (source, available) in manager.source_availability().await {
                let enabled = toggles.is_enabled(&source);
                let state = match (enabled, available) {
                    (true, true) => "enabled".green().to_string(),
                    (true, false) => "enabled, not installed".yellow().to_string(),
                    (false, _) => "disabled".dimmed().to_string(),
                };
                emit(
                    Level::Info,
                    "sources.status",
                    &format!("{: <12} {}", source.display_name(), state),
                    Some(json!({
                        "source": source,
                        "enabled": enabled,
                        "available": available,
                    })),
                );
            }
        }
        SourceCommands::Enable { source } => {
            set_source_enabled(config, config_path, &source, true)?
        }
        SourceCommands::Disable { source } => {
            set_source_enabled(config, config_path, &source, false)?
        }
    }
    Ok(())
}

fn set_source_enabled(
    mut config: Config,
    config_path: Option<&Path>,
    source: &str,
    enable: bool,
) -> Result<()> {
    let source = Source::from(source);

    let mut toggles = config.toggles()?;
    toggles.set(&source, enable)?;
    config.apply_toggles(&toggles);
    match config_path {
        Some(path) => config
            .save_to(path)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => config.save().context("Failed to write config")?,
    }

    emit(
        Level::Success,
        "sources.updated",
        &format!(
            "{} {}",
            if enable { "Enabled" } else { "Disabled" },
            source.display_name()
        ),
        None,
    );
    Ok(())
}

fn fit(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

fn print_apps(apps: &[AppRecord]) {
    if apps.is_empty() {
        return;
    }

    let mut out = String::new();
    let header = format!(
        "{: <30} {: <35} {: <15} {: <10} {}",
        "Name", "Package ID", "Version", "Source", "Status"
    );
    let _ = writeln!(out, "{}", header.bold());
    for app in apps {
        let mut status = Vec::new();
        if app.is_installed {
            status.push("installed".green().to_string());
        }
        if app.is_saved {
            status.push("saved".cyan().to_string());
        }
        let _ = writeln!(
            out,
            "{: <30} {: <35} {: <15} {: <10} {}",
            fit(&app.name, 30),
            fit(&app.package_id, 35),
            fit(&app.version, 15),
            app.source.as_str(),
            status.join(" ")
        );
    }
    separator();
    print_block(&out);
}

fn print_lists(lists: &[AppList], current: Option<i64>) {
    let mut out = String::new();
    for list in lists {
        let marker = if Some(list.id) == current { "*" } else { " " };
        let _ = writeln!(
            out,
            "{} {: >4}  {: <30} {}",
            marker,
            list.id,
            fit(&list.name, 30),
            list.description.as_str().dimmed()
        );
    }
    print_block(&out);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_truncates_long_text() {
        assert_eq!(fit("Git", 5), "Git");
        assert_eq!(fit("Visual Studio Code", 8), "Visual …");
    }

    #[test]
    fn test_source_filter_from_flag() {
        assert_eq!(source_filter(None), SourceFilter::All);
        assert_eq!(
            source_filter(Some("choco".to_string())),
            SourceFilter::Only(Source::Chocolatey)
        );
    }
}
