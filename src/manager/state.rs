use std::collections::HashSet;

use super::filter::{SourceFilter, ViewFilter, ViewInputs, compose_view};
use crate::types::{AppList, AppRecord};

/// Everything the manager guards with its lock.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Last fetched unfiltered set: search results in search mode,
    /// installed apps otherwise
    pub all_apps: Vec<AppRecord>,
    pub installed_apps: Vec<AppRecord>,
    /// Members of the current list
    pub saved_apps: Vec<AppRecord>,
    /// What the UI renders. Only `apply_all_filters` writes this.
    pub current_apps: Vec<AppRecord>,
    pub all_lists: Vec<AppList>,
    pub current_list: Option<AppList>,
    pub source_filter: SourceFilter,
    pub view_filter: ViewFilter,
    pub search_query: String,
    pub is_search_mode: bool,
    pub is_loading: bool,
}

impl AppState {
    pub fn new(view_filter: ViewFilter) -> Self {
        Self {
            view_filter,
            ..Self::default()
        }
    }

    /// Recompute `current_apps` from the base sets and filters.
    pub fn apply_all_filters(&mut self) {
        self.current_apps = compose_view(
            ViewInputs {
                all: &self.all_apps,
                installed: &self.installed_apps,
                saved: &self.saved_apps,
                is_search_mode: self.is_search_mode,
            },
            self.view_filter,
            &self.source_filter,
        );
    }

    /// Stamp membership of the current list onto `apps`.
    ///
    /// `is_saved` is set from the current list only; `list_id` is written
    /// for saved apps and left alone otherwise. No-op without a current list.
    pub fn mark_saved_status(&self, apps: &mut [AppRecord]) {
        let Some(current) = &self.current_list else {
            return;
        };

        let saved_ids: HashSet<&str> = self
            .saved_apps
            .iter()
            .map(|app| app.package_id.as_str())
            .collect();

        for app in apps.iter_mut() {
            app.is_saved = saved_ids.contains(app.package_id.as_str());
            if app.is_saved {
                app.list_id = Some(current.id);
            }
        }
    }

    /// Re-stamp the base sets after membership changed, then rebuild the view.
    pub fn restamp(&mut self) {
        let mut installed = std::mem::take(&mut self.installed_apps);
        let mut all = std::mem::take(&mut self.all_apps);
        self.mark_saved_status(&mut installed);
        self.mark_saved_status(&mut all);
        self.installed_apps = installed;
        self.all_apps = all;
        self.apply_all_filters();
    }

    /// In-memory search used by the installed and saved views.
    pub fn search_local(&self, query: &str) -> Vec<AppRecord> {
        let pool = match self.view_filter {
            ViewFilter::SavedApps => &self.saved_apps,
            _ => &self.installed_apps,
        };
        pool.iter()
            .filter(|app| app.matches_query(query))
            .cloned()
            .collect()
    }

    pub fn is_current_list(&self, list_id: i64) -> bool {
        self.current_list
            .as_ref()
            .is_some_and(|list| list.id == list_id)
    }
}
