use chrono::{DateTime, NaiveDateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use tracing::debug;

use super::ListStore;
use crate::error::{Error, Result};
use crate::types::{
    AppList, AppRecord, DEFAULT_LIST_DESCRIPTION, DEFAULT_LIST_ID, DEFAULT_LIST_NAME, Source,
};

const CURRENT_SCHEMA_VERSION: i32 = 1;

/// `CURRENT_TIMESTAMP` format used by SQLite
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct SqliteListStore {
    conn: Mutex<Connection>,
}

impl SqliteListStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        // Required for the saved_apps cascade
        conn.execute("PRAGMA foreign_keys = ON", ())?;

        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER NOT NULL,
                updated TEXT NOT NULL,
                PRIMARY KEY (version)
            )",
            (),
        )?;

        let version = match conn.query_row(
            "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
            [],
            |row| row.get(0),
        ) {
            Ok(v) => v,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                conn.execute(
                    "INSERT INTO schema_version (version, updated) VALUES (0, datetime('now'))",
                    [],
                )?;
                0
            }
            Err(e) => return Err(e.into()),
        };

        if version < CURRENT_SCHEMA_VERSION {
            Self::migrate_schema(conn, version)?;
        }

        Ok(())
    }

    fn migrate_schema(conn: &Connection, from_version: i32) -> Result<()> {
        match from_version {
            0 => {
                debug!("creating list database schema");
                conn.execute_batch(
                    "CREATE TABLE IF NOT EXISTS lists (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        name TEXT NOT NULL UNIQUE,
                        description TEXT NOT NULL DEFAULT '',
                        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
                    );

                    CREATE TABLE IF NOT EXISTS saved_apps (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        list_id INTEGER NOT NULL,
                        name TEXT NOT NULL,
                        package_id TEXT NOT NULL,
                        version TEXT NOT NULL DEFAULT '',
                        source TEXT NOT NULL,
                        description TEXT NOT NULL DEFAULT '',
                        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                        FOREIGN KEY (list_id) REFERENCES lists(id) ON DELETE CASCADE,
                        UNIQUE(list_id, package_id)
                    );

                    CREATE INDEX IF NOT EXISTS idx_package_id ON saved_apps(package_id);
                    CREATE INDEX IF NOT EXISTS idx_source ON saved_apps(source);
                    CREATE INDEX IF NOT EXISTS idx_list_id ON saved_apps(list_id);",
                )?;

                conn.execute(
                    "INSERT OR IGNORE INTO lists (id, name, description) VALUES (?1, ?2, ?3)",
                    params![DEFAULT_LIST_ID, DEFAULT_LIST_NAME, DEFAULT_LIST_DESCRIPTION],
                )?;

                conn.execute(
                    "INSERT INTO schema_version (version, updated) VALUES (1, datetime('now'))",
                    [],
                )?;
            }
            // Future migrations can be added here
            _ => {}
        }
        Ok(())
    }
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn list_from_row(row: &Row<'_>) -> rusqlite::Result<AppList> {
    let created_at: String = row.get(3)?;
    Ok(AppList {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: parse_timestamp(3, &created_at)?,
    })
}

fn is_constraint(err: &rusqlite::Error, extended_code: std::ffi::c_int) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _) if e.extended_code == extended_code)
}

fn map_name_conflict(err: rusqlite::Error, name: &str) -> Error {
    if is_constraint(&err, rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE) {
        Error::DuplicateListName(name.to_string())
    } else {
        Error::Database(err)
    }
}

const LIST_COLUMNS: &str = "id, name, description, created_at";

impl ListStore for SqliteListStore {
    fn create_list(&self, name: &str, description: &str) -> Result<i64> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO lists (name, description) VALUES (?1, ?2)",
            params![name, description],
        )
        .map_err(|e| map_name_conflict(e, name))?;
        Ok(conn.last_insert_rowid())
    }

    fn lists(&self) -> Result<Vec<AppList>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("SELECT {LIST_COLUMNS} FROM lists ORDER BY name"))?;
        let lists = stmt
            .query_map([], list_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(lists)
    }

    fn list_by_id(&self, list_id: i64) -> Result<Option<AppList>> {
        let conn = self.conn.lock();
        let list = conn
            .query_row(
                &format!("SELECT {LIST_COLUMNS} FROM lists WHERE id = ?1"),
                [list_id],
                list_from_row,
            )
            .optional()?;
        Ok(list)
    }

    fn list_by_name(&self, name: &str) -> Result<Option<AppList>> {
        let conn = self.conn.lock();
        let list = conn
            .query_row(
                &format!("SELECT {LIST_COLUMNS} FROM lists WHERE name = ?1"),
                [name],
                list_from_row,
            )
            .optional()?;
        Ok(list)
    }

    fn update_list(&self, list_id: i64, name: &str, description: &str) -> Result<()> {
        let conn = self.conn.lock();
        let changed = conn
            .execute(
                "UPDATE lists SET name = ?1, description = ?2 WHERE id = ?3",
                params![name, description, list_id],
            )
            .map_err(|e| map_name_conflict(e, name))?;
        if changed == 0 {
            return Err(Error::ListNotFound(list_id));
        }
        Ok(())
    }

    fn delete_list(&self, list_id: i64) -> Result<()> {
        if list_id == DEFAULT_LIST_ID {
            return Err(Error::DefaultListProtected);
        }

        let conn = self.conn.lock();
        let changed = conn.execute("DELETE FROM lists WHERE id = ?1", [list_id])?;
        if changed == 0 {
            return Err(Error::ListNotFound(list_id));
        }
        Ok(())
    }

    fn save_app(&self, list_id: i64, app: &AppRecord) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO saved_apps (list_id, name, package_id, version, source, description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                list_id,
                app.name,
                app.package_id,
                app.version,
                app.source.as_str(),
                app.description
            ],
        )
        .map_err(|e| {
            if is_constraint(&e, rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY) {
                Error::ListNotFound(list_id)
            } else {
                Error::Database(e)
            }
        })?;
        Ok(())
    }

    fn apps_in_list(&self, list_id: i64) -> Result<Vec<AppRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT name, package_id, version, source, description
             FROM saved_apps
             WHERE list_id = ?1
             ORDER BY name",
        )?;
        let apps = stmt
            .query_map([list_id], |row| {
                let source: String = row.get(3)?;
                Ok(AppRecord {
                    name: row.get(0)?,
                    package_id: row.get(1)?,
                    version: row.get(2)?,
                    source: Source::from(source.as_str()),
                    description: row.get(4)?,
                    is_installed: false,
                    is_saved: true,
                    list_id: Some(list_id),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(apps)
    }

    fn remove_app(&self, list_id: i64, package_id: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM saved_apps WHERE list_id = ?1 AND package_id = ?2",
            params![list_id, package_id],
        )?;
        Ok(())
    }

    fn contains_app(&self, list_id: i64, package_id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM saved_apps WHERE list_id = ?1 AND package_id = ?2",
            params![list_id, package_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn lists_containing(&self, package_id: &str) -> Result<Vec<AppList>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT l.id, l.name, l.description, l.created_at
             FROM lists l
             INNER JOIN saved_apps sa ON l.id = sa.list_id
             WHERE sa.package_id = ?1
             ORDER BY l.name",
        )?;
        let lists = stmt
            .query_map([package_id], list_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(lists)
    }
}
