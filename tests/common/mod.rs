#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use appshelf::common::config::SourceToggles;
use appshelf::manager::{AppManager, StateObserver, ViewFilter};
use appshelf::package::PackageSource;
use appshelf::store::SqliteListStore;
use appshelf::types::{AppRecord, Source};
use appshelf::{Error, Result};

/// Scripted package source.
pub struct FakeSource {
    source: Source,
    available: bool,
    failing: bool,
    search_results: Vec<AppRecord>,
    installed: Mutex<Vec<AppRecord>>,
    fail_install: Option<String>,
    installs: Mutex<Vec<String>>,
    installed_queries: AtomicUsize,
}

impl FakeSource {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            available: true,
            failing: false,
            search_results: Vec::new(),
            installed: Mutex::new(Vec::new()),
            fail_install: None,
            installs: Mutex::new(Vec::new()),
            installed_queries: AtomicUsize::new(0),
        }
    }

    pub fn with_search(mut self, results: Vec<AppRecord>) -> Self {
        self.search_results = results;
        self
    }

    pub fn with_installed(self, apps: Vec<AppRecord>) -> Self {
        *self.installed.lock().unwrap() = apps;
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Every query returns an error.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn failing_install(mut self, package_id: &str) -> Self {
        self.fail_install = Some(package_id.to_string());
        self
    }

    pub fn installs(&self) -> Vec<String> {
        self.installs.lock().unwrap().clone()
    }

    pub fn installed_queries(&self) -> usize {
        self.installed_queries.load(Ordering::SeqCst)
    }

    fn query_failure(&self) -> Error {
        Error::CommandFailed {
            program: self.source.as_str().to_string(),
            detail: "exit status: 1".to_string(),
        }
    }
}

#[async_trait]
impl PackageSource for FakeSource {
    fn source(&self) -> Source {
        self.source.clone()
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn search(&self, query: &str) -> Result<Vec<AppRecord>> {
        if self.failing {
            return Err(self.query_failure());
        }
        Ok(self
            .search_results
            .iter()
            .filter(|app| app.matches_query(query))
            .cloned()
            .collect())
    }

    async fn installed_apps(&self) -> Result<Vec<AppRecord>> {
        self.installed_queries.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(self.query_failure());
        }
        Ok(self.installed.lock().unwrap().clone())
    }

    async fn install(&self, package_id: &str) -> Result<()> {
        self.installs.lock().unwrap().push(package_id.to_string());
        if self.fail_install.as_deref() == Some(package_id) {
            return Err(self.query_failure());
        }
        let app = AppRecord::new(package_id, package_id, self.source.clone()).installed();
        self.installed.lock().unwrap().push(app);
        Ok(())
    }
}

pub fn winget_app(name: &str, package_id: &str) -> AppRecord {
    AppRecord::new(name, package_id, Source::Winget).with_version("1.0")
}

pub fn choco_app(name: &str, package_id: &str) -> AppRecord {
    AppRecord::new(name, package_id, Source::Chocolatey).with_version("1.0")
}

/// Manager over an in-memory store, initialized and on the default list.
pub fn manager_with(sources: Vec<Arc<FakeSource>>, view: ViewFilter) -> Arc<AppManager> {
    let store = SqliteListStore::open_in_memory().unwrap();
    let sources = sources
        .into_iter()
        .map(|source| source as Arc<dyn PackageSource>)
        .collect();
    let toggles = SourceToggles::new(true, true).unwrap();
    let manager = AppManager::new(Arc::new(store), sources, toggles, view);
    manager.initialize().unwrap();
    Arc::new(manager)
}

/// Counts notifications.
#[derive(Default)]
pub struct CountingObserver {
    hits: AtomicUsize,
}

impl CountingObserver {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl StateObserver for CountingObserver {
    fn state_changed(&self) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }
}

/// Poll until `condition` holds or a second has passed.
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
