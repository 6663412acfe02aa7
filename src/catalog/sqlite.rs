//! SQLite-backed command catalog
//!
//! One connection guarded by a mutex: every query scopes itself to the lock,
//! so suggestion lookups and resolutions issued from different tasks
//! serialize on the handle.

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::CommandCatalog;
use crate::error::{Error, Result};
use crate::models::{CommandEntry, CommandLink, CommandMode, LinkOverride, StepConfig, Visibility};

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS commands (
    name        TEXT PRIMARY KEY,
    description TEXT NOT NULL DEFAULT '',
    visibility  TEXT NOT NULL DEFAULT 'public',
    starred     INTEGER NOT NULL DEFAULT 0,
    use_count   INTEGER NOT NULL DEFAULT 0,
    mode        TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS terminal_steps (
    name                       TEXT PRIMARY KEY REFERENCES commands(name) ON DELETE CASCADE,
    waitable                   INTEGER NOT NULL DEFAULT 0,
    has_executor               INTEGER NOT NULL DEFAULT 0,
    executor_path              TEXT,
    target_path                TEXT NOT NULL DEFAULT '',
    supports_incremental_query INTEGER NOT NULL DEFAULT 0,
    preset_input               TEXT NOT NULL DEFAULT ''
);
CREATE TABLE IF NOT EXISTS command_links (
    parent                TEXT NOT NULL REFERENCES commands(name) ON DELETE CASCADE,
    order_index           INTEGER NOT NULL,
    child                 TEXT NOT NULL,
    waitable_override     INTEGER NOT NULL DEFAULT 1,
    preset_input_override TEXT,
    PRIMARY KEY (parent, order_index)
);
CREATE INDEX IF NOT EXISTS idx_commands_rank ON commands(starred DESC, use_count DESC);
";

const SEARCH_SQL: &str = r"
SELECT name
  FROM commands
 WHERE name LIKE ?1 ESCAPE '\'
   AND (?2 = 1 OR visibility = 'public')
 ORDER BY starred DESC, use_count DESC, name ASC
 LIMIT ?3";

const ENTRY_SQL: &str = r"
SELECT name, description, visibility, starred, use_count, mode
  FROM commands
 WHERE name = ?1
   AND (?2 = 1 OR visibility = 'public')";

const LINKS_SQL: &str = r"
SELECT parent, order_index, child, waitable_override, preset_input_override
  FROM command_links
 WHERE parent = ?1
 ORDER BY order_index ASC";

const FETCH_STEPS_SQL: &str = r"
SELECT c.name, c.description, c.visibility, c.starred, c.use_count,
       t.waitable, t.has_executor, t.executor_path, t.target_path,
       t.supports_incremental_query, t.preset_input
  FROM commands c
  JOIN terminal_steps t ON c.name = t.name
 WHERE c.name IN (SELECT value FROM json_each(?1))
   AND (?2 = 1 OR c.visibility = 'public')";

const UPSERT_COMMAND_SQL: &str = r"
INSERT INTO commands (name, description, visibility, starred, use_count, mode)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)
ON CONFLICT(name) DO UPDATE SET
    description = excluded.description,
    visibility  = excluded.visibility,
    mode        = excluded.mode";

/// Catalog stored in an SQLite database file
#[derive(Debug)]
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl SqliteCatalog {
    /// Open (creating if needed) the catalog at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        let catalog = Self {
            conn: Mutex::new(conn),
            db_path: Some(path.to_path_buf()),
        };
        catalog.init_schema()?;
        debug!("Opened command catalog at {}", path.display());
        Ok(catalog)
    }

    /// Private catalog living only as long as this value
    pub fn open_in_memory() -> Result<Self> {
        let catalog = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
            db_path: None,
        };
        catalog.init_schema()?;
        Ok(catalog)
    }

    /// Create tables and indexes if they are missing
    pub fn init_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Database file, `None` for in-memory catalogs
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Insert or replace a terminal command and its step row
    ///
    /// Any links left over from a previous composite registration are dropped.
    pub fn register_terminal(&self, entry: &CommandEntry, step: &StepConfig) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        upsert_command(&tx, entry, CommandMode::Terminal)?;
        tx.execute("DELETE FROM command_links WHERE parent = ?1", params![entry.name])?;
        tx.execute(
            r"
INSERT INTO terminal_steps
    (name, waitable, has_executor, executor_path, target_path, supports_incremental_query, preset_input)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
ON CONFLICT(name) DO UPDATE SET
    waitable = excluded.waitable,
    has_executor = excluded.has_executor,
    executor_path = excluded.executor_path,
    target_path = excluded.target_path,
    supports_incremental_query = excluded.supports_incremental_query,
    preset_input = excluded.preset_input",
            params![
                entry.name,
                step.waitable,
                step.has_executor,
                step.executor_path,
                step.target_path,
                step.supports_incremental_query,
                step.preset_input,
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Insert or replace a composite command and its full link list
    pub fn register_composite(&self, entry: &CommandEntry, links: &[CommandLink]) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        upsert_command(&tx, entry, CommandMode::Composite)?;
        tx.execute("DELETE FROM terminal_steps WHERE name = ?1", params![entry.name])?;
        tx.execute("DELETE FROM command_links WHERE parent = ?1", params![entry.name])?;
        for link in links {
            tx.execute(
                r"
INSERT INTO command_links (parent, order_index, child, waitable_override, preset_input_override)
VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    entry.name,
                    link.overrides.order_index,
                    link.child,
                    link.overrides.waitable_override,
                    link.overrides.preset_input_override,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Pin or unpin an entry; `false` when no such entry exists
    pub fn set_starred(&self, name: &str, starred: bool) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE commands SET starred = ?2 WHERE name = ?1",
            params![name, starred],
        )?;
        Ok(changed != 0)
    }

    /// Number of catalog entries
    pub fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row("SELECT COUNT(1) FROM commands", [], |r| r.get(0))?;
        Ok(n as usize)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| Error::Storage {
            reason: "catalog connection lock poisoned".to_string(),
        })
    }
}

impl CommandCatalog for SqliteCatalog {
    fn search(&self, pattern: &str, allow_restricted: bool, limit: usize) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(SEARCH_SQL)?;
        let like = format!("%{}%", escape_like(pattern));
        let names = stmt
            .query_map(params![like, allow_restricted, limit as i64], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    fn entry(&self, name: &str, allow_restricted: bool) -> Result<Option<CommandEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(ENTRY_SQL)?;
        let entry = stmt
            .query_row(params![name, allow_restricted], entry_from_row)
            .optional()?;
        Ok(entry)
    }

    fn links(&self, parent: &str) -> Result<Vec<CommandLink>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(LINKS_SQL)?;
        let links = stmt
            .query_map(params![parent], |row| {
                Ok(CommandLink {
                    parent: row.get(0)?,
                    child: row.get(2)?,
                    overrides: LinkOverride {
                        order_index: row.get(1)?,
                        waitable_override: row.get(3)?,
                        preset_input_override: row.get(4)?,
                    },
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(links)
    }

    fn fetch_steps(&self, names: &[String], allow_restricted: bool) -> Result<Vec<StepConfig>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let batch = serde_json::to_string(names)?;
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(FETCH_STEPS_SQL)?;
        let steps = stmt
            .query_map(params![batch, allow_restricted], step_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(steps)
    }

    fn increment_usage(&self, name: &str) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE commands SET use_count = use_count + 1 WHERE name = ?1",
            params![name],
        )?;
        Ok(changed != 0)
    }
}

fn upsert_command(conn: &Connection, entry: &CommandEntry, mode: CommandMode) -> Result<()> {
    conn.execute(
        UPSERT_COMMAND_SQL,
        params![
            entry.name,
            entry.description,
            entry.visibility.as_str(),
            entry.starred,
            entry.use_count,
            mode.as_str(),
        ],
    )?;
    Ok(())
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<CommandEntry> {
    Ok(CommandEntry {
        name: row.get(0)?,
        description: row.get(1)?,
        visibility: parse_column(2, row.get(2)?, Visibility::parse)?,
        starred: row.get(3)?,
        use_count: row.get(4)?,
        mode: parse_column(5, row.get(5)?, CommandMode::parse)?,
    })
}

fn step_from_row(row: &Row<'_>) -> rusqlite::Result<StepConfig> {
    Ok(StepConfig {
        name: row.get(0)?,
        description: row.get(1)?,
        visibility: parse_column(2, row.get(2)?, Visibility::parse)?,
        starred: row.get(3)?,
        use_count: row.get(4)?,
        waitable: row.get(5)?,
        has_executor: row.get(6)?,
        executor_path: row.get(7)?,
        target_path: row.get(8)?,
        supports_incremental_query: row.get(9)?,
        preset_input: row.get(10)?,
    })
}

fn parse_column<T>(idx: usize, value: String, parse: fn(&str) -> Result<T>) -> rusqlite::Result<T> {
    parse(&value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Escape `LIKE` wildcards so user input matches literally
fn escape_like(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    for ch in pattern.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
