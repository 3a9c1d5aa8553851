//! Persistence gateway for lists and list membership.
//!
//! The store is the single source of truth for list definitions and for
//! which apps are saved where. The manager reloads from it after every
//! write instead of patching its in-memory copy.

mod db;

pub use db::SqliteListStore;

use crate::error::Result;
use crate::types::{AppList, AppRecord};

pub trait ListStore: Send + Sync {
    /// Create a list and return its id. Fails with `DuplicateListName` if
    /// the name is taken.
    fn create_list(&self, name: &str, description: &str) -> Result<i64>;

    /// All lists, sorted by name.
    fn lists(&self) -> Result<Vec<AppList>>;

    fn list_by_id(&self, list_id: i64) -> Result<Option<AppList>>;

    fn list_by_name(&self, name: &str) -> Result<Option<AppList>>;

    fn update_list(&self, list_id: i64, name: &str, description: &str) -> Result<()>;

    /// Delete a list and all of its memberships. The default list cannot be
    /// deleted.
    fn delete_list(&self, list_id: i64) -> Result<()>;

    /// Insert or replace the membership row for `(list_id, app.package_id)`.
    fn save_app(&self, list_id: i64, app: &AppRecord) -> Result<()>;

    /// Apps saved to a list, sorted by name, each marked saved to `list_id`.
    fn apps_in_list(&self, list_id: i64) -> Result<Vec<AppRecord>>;

    fn remove_app(&self, list_id: i64, package_id: &str) -> Result<()>;

    fn contains_app(&self, list_id: i64, package_id: &str) -> Result<bool>;

    /// Every list that has `package_id` saved, sorted by name.
    fn lists_containing(&self, package_id: &str) -> Result<Vec<AppList>>;
}
