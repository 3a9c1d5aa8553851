//! Application state and aggregation.
//!
//! [`AppManager`] owns every piece of shared state: installed apps, the
//! current list's saved apps, search results, the list collection and the
//! active filters. It fans queries out to the enabled package sources,
//! merges their results, stamps list membership and recomputes the displayed
//! set.
//!
//! # Locking
//!
//! A single reader/writer lock guards [`AppState`]. Process invocations and
//! database round-trips run outside of it; the lock is only held for the
//! read-modify-write of the fields and the filter recompute. Observers are
//! always notified after the lock is released.

mod filter;
mod observer;
mod state;

pub use filter::{SourceFilter, ViewFilter, ViewInputs, compose_view};
pub use observer::StateObserver;
pub use state::AppState;

use chrono::Local;
use futures_util::future::join_all;
use parking_lot::RwLock;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::common::config::{Config, SourceToggles};
use crate::error::{Error, Result};
use crate::package::{PackageSource, sources_from_config};
use crate::store::ListStore;
use crate::transfer;
use crate::types::{AppList, AppRecord, DEFAULT_LIST_ID, ImportResult, Source};

#[derive(Clone, Copy)]
enum Fetch<'a> {
    Search(&'a str),
    Installed,
}

pub struct AppManager {
    store: Arc<dyn ListStore>,
    sources: Vec<Arc<dyn PackageSource>>,
    toggles: RwLock<SourceToggles>,
    state: RwLock<AppState>,
    observers: RwLock<Vec<Arc<dyn StateObserver>>>,
}

impl AppManager {
    /// `sources` are queried in the given order; results are concatenated
    /// in that order.
    pub fn new(
        store: Arc<dyn ListStore>,
        sources: Vec<Arc<dyn PackageSource>>,
        toggles: SourceToggles,
        default_view: ViewFilter,
    ) -> Self {
        Self {
            store,
            sources,
            toggles: RwLock::new(toggles),
            state: RwLock::new(AppState::new(default_view)),
            observers: RwLock::new(Vec::new()),
        }
    }

    pub fn from_config(config: &Config, store: Arc<dyn ListStore>) -> Result<Self> {
        Ok(Self::new(
            store,
            sources_from_config(config),
            config.toggles()?,
            config.default_view,
        ))
    }

    /// Load the lists and select the default list (or the first one).
    pub fn initialize(&self) -> Result<()> {
        self.load_lists()?;

        let initial = {
            let state = self.state.read();
            state
                .all_lists
                .iter()
                .find(|list| list.id == DEFAULT_LIST_ID)
                .or_else(|| state.all_lists.first())
                .map(|list| list.id)
        };

        match initial {
            Some(list_id) => self.set_current_list(list_id),
            None => Ok(()),
        }
    }

    pub fn add_observer(&self, observer: Arc<dyn StateObserver>) {
        self.observers.write().push(observer);
    }

    fn notify(&self) {
        let observers = self.observers.read().clone();
        observer::dispatch(&observers);
    }

    /// Raise the loading flag and tell observers before any slow work starts.
    /// The flag is cleared under the same lock that publishes the results.
    fn start_loading(&self) {
        self.state.write().is_loading = true;
        self.notify();
    }

    // ------------------------------------------------------------------
    // Sources
    // ------------------------------------------------------------------

    pub fn source_toggles(&self) -> SourceToggles {
        *self.toggles.read()
    }

    /// Fails with `LastSourceEnabled` rather than disabling every source.
    pub fn set_source_enabled(&self, source: &Source, enabled: bool) -> Result<()> {
        self.toggles.write().set(source, enabled)?;
        self.notify();
        Ok(())
    }

    fn enabled_sources(&self) -> Vec<Arc<dyn PackageSource>> {
        let toggles = self.toggles.read();
        self.sources
            .iter()
            .filter(|source| toggles.is_enabled(&source.source()))
            .cloned()
            .collect()
    }

    /// Query every enabled, available source concurrently.
    ///
    /// Failures are logged and contribute nothing; the other sources'
    /// results are still returned.
    async fn fetch_from_sources(&self, fetch: Fetch<'_>) -> Vec<AppRecord> {
        let enabled = self.enabled_sources();

        let batches = join_all(enabled.iter().map(|source| async move {
            let kind = source.source();
            if !source.is_available().await {
                debug!(source = %kind, "skipping unavailable source");
                return Vec::new();
            }

            let result = match fetch {
                Fetch::Search(query) => source.search(query).await,
                Fetch::Installed => source.installed_apps().await,
            };

            match result {
                Ok(apps) => {
                    debug!(source = %kind, count = apps.len(), "source query finished");
                    apps
                }
                Err(err) => {
                    warn!(source = %kind, error = %err, "source query failed");
                    Vec::new()
                }
            }
        }))
        .await;

        batches.into_iter().flatten().collect()
    }

    /// Probe every configured source, enabled or not.
    pub async fn source_availability(&self) -> Vec<(Source, bool)> {
        join_all(self.sources.iter().map(|source| async move {
            (source.source(), source.is_available().await)
        }))
        .await
    }

    fn source_for(&self, source: &Source) -> Result<Arc<dyn PackageSource>> {
        if !source.is_known() {
            return Err(Error::UnknownSource(source.as_str().to_string()));
        }
        self.sources
            .iter()
            .find(|candidate| candidate.source() == *source)
            .cloned()
            .ok_or_else(|| Error::SourceUnavailable(source.clone()))
    }

    // ------------------------------------------------------------------
    // Search, refresh and install
    // ------------------------------------------------------------------

    /// Search for apps.
    ///
    /// A blank query leaves search mode. In the installed and saved views
    /// the already loaded apps are filtered in memory; in the "All Results"
    /// view every enabled source is queried.
    pub async fn search(&self, query: &str) {
        if query.trim().is_empty() {
            self.clear_search();
            return;
        }

        self.start_loading();

        let view = self.state.read().view_filter;
        let remote = match view {
            ViewFilter::AllResults => Some(self.fetch_from_sources(Fetch::Search(query)).await),
            ViewFilter::InstalledOnly | ViewFilter::SavedApps => None,
        };

        {
            let mut state = self.state.write();
            let results = match remote {
                Some(mut apps) => {
                    state.mark_saved_status(&mut apps);
                    apps
                }
                None => state.search_local(query),
            };
            state.search_query = query.to_string();
            state.is_search_mode = true;
            state.all_apps = results;
            state.is_loading = false;
            state.apply_all_filters();
        }

        self.notify();
    }

    pub fn clear_search(&self) {
        {
            let mut state = self.state.write();
            state.is_search_mode = false;
            state.search_query.clear();
            state.apply_all_filters();
        }
        self.notify();
    }

    /// Replace the installed set with a fresh query of every enabled source.
    /// Leaves search mode.
    pub async fn refresh_installed_apps(&self) {
        self.start_loading();

        let mut apps = self.fetch_from_sources(Fetch::Installed).await;

        {
            let mut state = self.state.write();
            state.is_search_mode = false;
            state.mark_saved_status(&mut apps);
            state.installed_apps = apps.clone();
            state.all_apps = apps;
            state.is_loading = false;
            state.apply_all_filters();
        }

        self.notify();
    }

    async fn install_without_refresh(&self, app: &AppRecord) -> Result<()> {
        let source = self.source_for(&app.source)?;
        if !source.is_available().await {
            return Err(Error::SourceUnavailable(app.source.clone()));
        }

        info!(source = %app.source, package = %app.package_id, "installing");
        source.install(&app.package_id).await
    }

    fn schedule_refresh(self: &Arc<Self>) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            manager.refresh_installed_apps().await;
        });
    }

    /// Install one app with the backend named by its source.
    ///
    /// On success a refresh of the installed apps is started in the
    /// background; this call does not wait for it.
    pub async fn install_app(self: &Arc<Self>, app: &AppRecord) -> Result<()> {
        self.install_without_refresh(app).await?;
        self.schedule_refresh();
        Ok(())
    }

    /// Install one app and wait for the installed apps to be refreshed.
    pub async fn install_app_and_refresh(&self, app: &AppRecord) -> Result<()> {
        self.install_without_refresh(app).await?;
        self.refresh_installed_apps().await;
        Ok(())
    }

    /// Install every app saved to a list, stopping at the first failure.
    /// Returns how many were installed.
    pub async fn install_all_apps_in_list(self: &Arc<Self>, list_id: i64) -> Result<usize> {
        let apps = self.store.apps_in_list(list_id)?;

        let mut installed = 0;
        let mut outcome = Ok(());
        for app in &apps {
            if let Err(err) = self.install_without_refresh(app).await {
                outcome = Err(Error::BatchInstall {
                    name: app.name.clone(),
                    source: Box::new(err),
                });
                break;
            }
            installed += 1;
        }

        if installed > 0 {
            self.schedule_refresh();
        }
        outcome.map(|()| installed)
    }

    pub async fn install_all_apps_in_current_list(self: &Arc<Self>) -> Result<usize> {
        let list_id = self.current_list_id()?;
        self.install_all_apps_in_list(list_id).await
    }

    // ------------------------------------------------------------------
    // Filters
    // ------------------------------------------------------------------

    /// Switch the base population. Leaves search mode.
    pub fn set_view_filter(&self, view: ViewFilter) {
        {
            let mut state = self.state.write();
            state.is_search_mode = false;
            state.view_filter = view;
            state.apply_all_filters();
        }
        self.notify();
    }

    pub fn filter_by_source(&self, filter: SourceFilter) {
        {
            let mut state = self.state.write();
            state.source_filter = filter;
            state.apply_all_filters();
        }
        self.notify();
    }

    // ------------------------------------------------------------------
    // Lists
    // ------------------------------------------------------------------

    fn current_list_id(&self) -> Result<i64> {
        self.state
            .read()
            .current_list
            .as_ref()
            .map(|list| list.id)
            .ok_or(Error::NoListSelected)
    }

    fn is_current_list(&self, list_id: i64) -> bool {
        self.state.read().is_current_list(list_id)
    }

    /// Reload the list collection from the store.
    pub fn load_lists(&self) -> Result<()> {
        let lists = self.store.lists()?;
        self.state.write().all_lists = lists;
        self.notify();
        Ok(())
    }

    fn reload_saved_apps(&self) -> Result<()> {
        let current = self.state.read().current_list.clone();
        let apps = match &current {
            Some(list) => self.store.apps_in_list(list.id)?,
            None => Vec::new(),
        };

        let mut state = self.state.write();
        state.saved_apps = apps;
        state.restamp();
        Ok(())
    }

    /// Reload the current list's members from the store.
    pub fn load_saved_apps(&self) -> Result<()> {
        self.reload_saved_apps()?;
        self.notify();
        Ok(())
    }

    pub fn set_current_list(&self, list_id: i64) -> Result<()> {
        let list = self
            .store
            .list_by_id(list_id)?
            .ok_or(Error::ListNotFound(list_id))?;
        let apps = self.store.apps_in_list(list_id)?;

        {
            let mut state = self.state.write();
            state.current_list = Some(list);
            state.saved_apps = apps;
            state.restamp();
        }
        self.notify();
        Ok(())
    }

    pub fn create_list(&self, name: &str, description: &str) -> Result<AppList> {
        let name = validate_list_name(name)?;
        let list_id = self.store.create_list(name, description)?;
        let lists = self.store.lists()?;

        let created = lists.iter().find(|list| list.id == list_id).cloned();
        self.state.write().all_lists = lists;
        self.notify();

        created.ok_or(Error::ListNotFound(list_id))
    }

    pub fn update_list(&self, list_id: i64, name: &str, description: &str) -> Result<()> {
        let name = validate_list_name(name)?;
        self.store.update_list(list_id, name, description)?;
        let lists = self.store.lists()?;

        {
            let mut state = self.state.write();
            if state.is_current_list(list_id) {
                state.current_list = lists.iter().find(|list| list.id == list_id).cloned();
            }
            state.all_lists = lists;
        }
        self.notify();
        Ok(())
    }

    /// Delete a list. If it was selected, the first remaining list by name
    /// becomes current, or nothing when no list is left.
    pub fn delete_list(&self, list_id: i64) -> Result<()> {
        if list_id == DEFAULT_LIST_ID {
            return Err(Error::DefaultListProtected);
        }

        self.store.delete_list(list_id)?;
        let lists = self.store.lists()?;

        if !self.is_current_list(list_id) {
            self.state.write().all_lists = lists;
            self.notify();
            return Ok(());
        }

        let next = lists.first().cloned();
        let saved = match &next {
            Some(list) => self.store.apps_in_list(list.id)?,
            None => Vec::new(),
        };

        {
            let mut state = self.state.write();
            state.all_lists = lists;
            state.current_list = next;
            state.saved_apps = saved;
            state.restamp();
        }
        self.notify();
        Ok(())
    }

    /// Save (or re-save) an app to a list. Observers are notified even when
    /// the list is not the current one.
    pub fn save_app_to_list(&self, app: &AppRecord, list_id: i64) -> Result<()> {
        self.store.save_app(list_id, app)?;
        if self.is_current_list(list_id) {
            self.reload_saved_apps()?;
        }
        self.notify();
        Ok(())
    }

    pub fn save_app_to_current_list(&self, app: &AppRecord) -> Result<()> {
        let list_id = self.current_list_id()?;
        self.save_app_to_list(app, list_id)
    }

    pub fn remove_app_from_list(&self, package_id: &str, list_id: i64) -> Result<()> {
        self.store.remove_app(list_id, package_id)?;
        if self.is_current_list(list_id) {
            self.reload_saved_apps()?;
        }
        self.notify();
        Ok(())
    }

    pub fn remove_app_from_current_list(&self, package_id: &str) -> Result<()> {
        let list_id = self.current_list_id()?;
        self.remove_app_from_list(package_id, list_id)
    }

    /// Every list an app is saved to, straight from the store.
    pub fn lists_containing(&self, package_id: &str) -> Result<Vec<AppList>> {
        self.store.lists_containing(package_id)
    }

    pub fn is_app_in_list(&self, list_id: i64, package_id: &str) -> Result<bool> {
        self.store.contains_app(list_id, package_id)
    }

    pub fn apps_in_list(&self, list_id: i64) -> Result<Vec<AppRecord>> {
        self.store.apps_in_list(list_id)
    }

    // ------------------------------------------------------------------
    // CSV export / import
    // ------------------------------------------------------------------

    /// Write a list to `{dir}/{list}_{timestamp}.csv` and return the path.
    pub fn export_list(&self, list_id: i64, dir: &Path) -> Result<PathBuf> {
        let list = self
            .store
            .list_by_id(list_id)?
            .ok_or(Error::ListNotFound(list_id))?;
        let apps = self.store.apps_in_list(list_id)?;

        std::fs::create_dir_all(dir)?;
        let path = dir.join(transfer::export_file_name(
            &list.name,
            Local::now().naive_local(),
        ));
        transfer::write_apps(BufWriter::new(File::create(&path)?), &apps)?;

        debug!(list = %list.name, path = %path.display(), count = apps.len(), "exported list");
        Ok(path)
    }

    pub fn export_current_list(&self, dir: &Path) -> Result<PathBuf> {
        let list_id = self.current_list_id()?;
        self.export_list(list_id, dir)
    }

    pub fn export_all_lists(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        self.store
            .lists()?
            .iter()
            .map(|list| self.export_list(list.id, dir))
            .collect()
    }

    /// Import a CSV file into the list named after it.
    ///
    /// An existing list with that name (case-insensitive) is reused.
    /// Apps already in the list are left as they are; returns the list and
    /// the number of newly added apps.
    pub fn import_list(&self, path: &Path) -> Result<(AppList, usize)> {
        let outcome = self.import_file(path);
        self.reload_after_import()?;
        self.notify();
        outcome
    }

    /// Import several files, reporting the outcome of each. Observers are
    /// notified once, after the last file.
    pub fn import_lists(&self, paths: &[PathBuf]) -> Vec<ImportResult> {
        let results = paths
            .iter()
            .map(|path| match self.import_file(path) {
                Ok((list, imported)) => ImportResult {
                    path: path.clone(),
                    list_name: Some(list.name),
                    imported,
                    error: None,
                },
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "import failed");
                    ImportResult {
                        path: path.clone(),
                        list_name: None,
                        imported: 0,
                        error: Some(err),
                    }
                }
            })
            .collect();

        if let Err(err) = self.reload_after_import() {
            warn!(error = %err, "failed to reload lists after import");
        }
        self.notify();
        results
    }

    fn import_file(&self, path: &Path) -> Result<(AppList, usize)> {
        let apps = transfer::read_apps(File::open(path)?)?;

        let list_name = transfer::list_name_from_path(path);
        let wanted = list_name.to_lowercase();
        let existing = self
            .store
            .lists()?
            .into_iter()
            .find(|list| list.name.to_lowercase() == wanted);

        let target = match existing {
            Some(list) => list,
            None => {
                let file_name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let list_id = self
                    .store
                    .create_list(&list_name, &format!("Imported from {}", file_name))?;
                self.store
                    .list_by_id(list_id)?
                    .ok_or(Error::ListNotFound(list_id))?
            }
        };

        let mut imported = 0;
        for app in &apps {
            if self.store.contains_app(target.id, &app.package_id)? {
                continue;
            }
            self.store.save_app(target.id, app)?;
            imported += 1;
        }

        info!(list = %target.name, imported, "imported list");
        Ok((target, imported))
    }

    fn reload_after_import(&self) -> Result<()> {
        let lists = self.store.lists()?;
        self.state.write().all_lists = lists;
        self.reload_saved_apps()
    }

    // ------------------------------------------------------------------
    // Read access. Everything returned is an owned copy.
    // ------------------------------------------------------------------

    pub fn current_apps(&self) -> Vec<AppRecord> {
        self.state.read().current_apps.clone()
    }

    pub fn all_apps(&self) -> Vec<AppRecord> {
        self.state.read().all_apps.clone()
    }

    pub fn installed_apps(&self) -> Vec<AppRecord> {
        self.state.read().installed_apps.clone()
    }

    pub fn saved_apps(&self) -> Vec<AppRecord> {
        self.state.read().saved_apps.clone()
    }

    pub fn lists(&self) -> Vec<AppList> {
        self.state.read().all_lists.clone()
    }

    pub fn current_list(&self) -> Option<AppList> {
        self.state.read().current_list.clone()
    }

    pub fn source_filter(&self) -> SourceFilter {
        self.state.read().source_filter.clone()
    }

    pub fn view_filter(&self) -> ViewFilter {
        self.state.read().view_filter
    }

    pub fn search_query(&self) -> String {
        self.state.read().search_query.clone()
    }

    pub fn is_search_mode(&self) -> bool {
        self.state.read().is_search_mode
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().is_loading
    }

    /// Copy of the whole state.
    pub fn snapshot(&self) -> AppState {
        self.state.read().clone()
    }
}

fn validate_list_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::EmptyListName);
    }
    Ok(trimmed)
}
