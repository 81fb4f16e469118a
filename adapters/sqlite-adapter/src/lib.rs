//! sqlite-adapter — SQLite implementation of the theme-switch ports for local/dev.
//!
//! Purpose
//! - Provide a lightweight, file-based backend to run the system locally.
//! - Implements `SettingsStore`, `DomainDirectory`, `ThemeDirectory` and
//!   `GlobalThemeDefaults` from the `theme-switch` crate.
//! - Exposes seeding helpers (`upsert_domain`, `upsert_theme`,
//!   `ensure_system_theme`) since domain and theme records are owned elsewhere
//!   in a real deployment.
//!
//! Notes
//! - Uses `rusqlite` with the `bundled` feature for portability.
//! - All configuration lives in one `config(name, key, value)` table; the
//!   per-domain assignments use `domain_theme_switch.settings` and the global
//!   defaults use `system.theme`.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use theme_switch::{
    CoreError, Domain, DomainDirectory, DomainId, GlobalThemeDefaults, SettingsBatch,
    SettingsStore, Theme, ThemeDefaults, ThemeDirectory, ThemeId, SETTINGS_NAME,
};
use tracing::debug;

/// Configuration name holding the global default (`default`) and admin
/// (`admin`) themes.
pub const SYSTEM_THEME_NAME: &str = "system.theme";

/// SQLite-backed repository for local development.
pub struct SqliteRepo {
    conn: Mutex<Connection>,
}

impl SqliteRepo {
    /// Open (or create) a SQLite database at the given path and ensure schema.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        let conn = Connection::open(path).map_err(map_sqerr)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Like [`SqliteRepo::new`], creating the parent directory first.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        if let Some(dir) = path.as_ref().parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| CoreError::Store(format!("create {}: {e}", dir.display())))?;
        }
        Self::new(path)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CoreError> {
        self.conn
            .lock()
            .map_err(|_| CoreError::Store("mutex poisoned".into()))
    }

    /// Insert or rename a domain. New domains are listed after existing ones.
    pub fn upsert_domain(&self, domain: &Domain) -> Result<(), CoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO domains(id, hostname) VALUES(?1, ?2)
             ON CONFLICT(id) DO UPDATE SET hostname = excluded.hostname",
            params![domain.id.as_str(), domain.hostname],
        )
        .map_err(map_direrr)?;
        Ok(())
    }

    /// Remove a domain record. Its stored assignments are left in place.
    pub fn remove_domain(&self, id: &DomainId) -> Result<bool, CoreError> {
        let conn = self.lock()?;
        let n = conn
            .execute("DELETE FROM domains WHERE id = ?1", params![id.as_str()])
            .map_err(map_direrr)?;
        Ok(n > 0)
    }

    /// Insert or rename an installed theme.
    pub fn upsert_theme(&self, theme: &Theme) -> Result<(), CoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO themes(id, name) VALUES(?1, ?2)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name",
            params![theme.id.as_str(), theme.display_name],
        )
        .map_err(map_direrr)?;
        Ok(())
    }

    /// Write the global defaults unless they are already set.
    pub fn ensure_system_theme(&self, defaults: &ThemeDefaults) -> Result<(), CoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(map_sqerr)?;
        for (key, theme) in [("default", &defaults.site), ("admin", &defaults.admin)] {
            tx.execute(
                "INSERT OR IGNORE INTO config(name, key, value) VALUES(?1, ?2, ?3)",
                params![SYSTEM_THEME_NAME, key, theme.as_str()],
            )
            .map_err(map_sqerr)?;
        }
        tx.commit().map_err(map_sqerr)?;
        Ok(())
    }

    fn config_value(&self, name: &str, key: &str) -> Result<Option<String>, CoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT value FROM config WHERE name = ?1 AND key = ?2",
            params![name, key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(map_sqerr)
    }

    fn system_theme(&self, key: &str) -> Result<ThemeId, CoreError> {
        self.config_value(SYSTEM_THEME_NAME, key)?
            .map(ThemeId::new)
            .ok_or_else(|| {
                CoreError::Directory(format!("{SYSTEM_THEME_NAME}.{key} is not set"))
            })
    }
}

fn init_schema(conn: &Connection) -> Result<(), CoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS config (
            name TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            PRIMARY KEY (name, key)
        );
        CREATE TABLE IF NOT EXISTS domains (
            id TEXT PRIMARY KEY,
            hostname TEXT NOT NULL,
            weight INTEGER NOT NULL DEFAULT 0
        );
        CREATE TABLE IF NOT EXISTS themes (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            weight INTEGER NOT NULL DEFAULT 0
        );
        "#,
    )
    .map_err(map_sqerr)?;
    Ok(())
}

fn map_sqerr<E: std::fmt::Display>(e: E) -> CoreError {
    CoreError::Store(format!("sqlite error: {e}"))
}

fn map_direrr<E: std::fmt::Display>(e: E) -> CoreError {
    CoreError::Directory(format!("sqlite error: {e}"))
}

impl SettingsStore for SqliteRepo {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        self.config_value(SETTINGS_NAME, key)
    }

    fn save(&self, batch: &SettingsBatch) -> Result<(), CoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(map_sqerr)?;
        for (key, value) in batch.entries() {
            let res = match value {
                Some(v) => tx.execute(
                    "INSERT INTO config(name, key, value) VALUES(?1, ?2, ?3)
                     ON CONFLICT(name, key) DO UPDATE SET value = excluded.value",
                    params![SETTINGS_NAME, key, v],
                ),
                None => tx.execute(
                    "DELETE FROM config WHERE name = ?1 AND key = ?2",
                    params![SETTINGS_NAME, key],
                ),
            };
            res.map_err(map_sqerr)?;
        }
        tx.commit().map_err(map_sqerr)?;
        debug!(entries = batch.len(), "sqlite settings saved");
        Ok(())
    }
}

impl DomainDirectory for SqliteRepo {
    fn list_all(&self) -> Result<Vec<Domain>, CoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, hostname FROM domains ORDER BY weight, rowid")
            .map_err(map_direrr)?;
        let mut rows = stmt.query([]).map_err(map_direrr)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(map_direrr)? {
            let id: String = row.get(0).map_err(map_direrr)?;
            let hostname: String = row.get(1).map_err(map_direrr)?;
            let id = DomainId::new(id)
                .map_err(|e| CoreError::Directory(format!("bad domain id in db: {e}")))?;
            out.push(Domain::new(id, hostname));
        }
        Ok(out)
    }
}

impl ThemeDirectory for SqliteRepo {
    fn list_installed(&self) -> Result<Vec<Theme>, CoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, name FROM themes ORDER BY weight, rowid")
            .map_err(map_direrr)?;
        let themes = stmt
            .query_map([], |row| {
                Ok(Theme::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(map_direrr)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_direrr)?;
        Ok(themes)
    }
}

impl GlobalThemeDefaults for SqliteRepo {
    fn default_site_theme(&self) -> Result<ThemeId, CoreError> {
        self.system_theme("default")
    }

    fn default_admin_theme(&self) -> Result<ThemeId, CoreError> {
        self.system_theme("admin")
    }
}
