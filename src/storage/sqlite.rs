//! SQLite store implementation
//!
//! Durable backend for large or resumable crawls. History rows carry a
//! completion flag so an interrupted run can be picked up again.

use crate::state::HostErrorState;
use crate::storage::schema::{initialize_schema, RESET_SQL};
use crate::storage::traits::{CrawlStore, OriginClassification, StoreError, StoreResult};
use crate::storage::{RunRecord, RunStatus};
use crate::url::{host, registrable_domain};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use url::Url;

/// SQLite store backend
///
/// All access goes through one connection, so store operations are
/// serialized. Crawl operations run on tokio's blocking pool.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Opens or creates the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Database file, created when missing
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - A store with its schema in place
    /// * `Err(StoreError)` - The file could not be opened or the schema applied
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Runs `f` against the connection on the blocking thread pool
    async fn blocking<F, R>(&self, f: F) -> StoreResult<R>
    where
        F: FnOnce(&Connection) -> StoreResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("sqlite task failed: {}", e)))?
    }

    /// Clears all crawl state, keeping the run log
    pub fn reset(&self) -> StoreResult<()> {
        self.conn()?.execute_batch(RESET_SQL)?;
        Ok(())
    }

    // ===== Run Management =====

    /// Records the start of a run and returns its ID
    pub fn create_run(&self, config_hash: &str) -> StoreResult<i64> {
        let conn = self.conn()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn update_run_status(&self, run_id: i64, status: RunStatus) -> StoreResult<()> {
        self.conn()?.execute(
            "UPDATE runs SET status = ?1 WHERE id = ?2",
            params![status.to_db_string(), run_id],
        )?;
        Ok(())
    }

    /// Marks a run as completed with a finish timestamp
    pub fn complete_run(&self, run_id: i64) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn()?.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![RunStatus::Completed.to_db_string(), now, run_id],
        )?;
        Ok(())
    }

    /// Gets the most recent run
    pub fn latest_run(&self) -> StoreResult<Option<RunRecord>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(id, started_at, finished_at, config_hash, status)| {
            let status = RunStatus::from_db_string(&status)
                .ok_or_else(|| StoreError::Corrupt(format!("run {} has status '{}'", id, status)))?;
            Ok(RunRecord {
                id,
                started_at,
                finished_at,
                config_hash,
                status,
            })
        })
        .transpose()
    }

    fn contains_origin(conn: &Connection, table: &str, column: &str, value: Option<String>) -> StoreResult<bool> {
        let Some(value) = value else {
            return Ok(false);
        };
        let found: Option<i64> = conn
            .query_row(
                &format!("SELECT 1 FROM {} WHERE {} = ?1", table, column),
                params![value],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

#[async_trait]
impl CrawlStore for SqliteStore {
    async fn check_and_mark_history(&self, url: &str) -> StoreResult<bool> {
        let url = url.to_string();
        self.blocking(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO history (url, completed, claimed_at) VALUES (?1, 0, ?2)",
                params![url, Utc::now().to_rfc3339()],
            )?;
            Ok(inserted == 0)
        })
        .await
    }

    async fn remove_from_history(&self, url: &str) -> StoreResult<()> {
        let url = url.to_string();
        self.blocking(move |conn| {
            conn.execute("DELETE FROM history WHERE url = ?1", params![url])?;
            Ok(())
        })
        .await
    }

    async fn mark_completed(&self, url: &str) -> StoreResult<()> {
        let url = url.to_string();
        self.blocking(move |conn| {
            conn.execute("UPDATE history SET completed = 1 WHERE url = ?1", params![url])?;
            Ok(())
        })
        .await
    }

    async fn interrupted_urls(&self) -> StoreResult<Vec<String>> {
        self.blocking(|conn| {
            let mut stmt =
                conn.prepare("SELECT url FROM history WHERE completed = 0 ORDER BY claimed_at")?;
            let urls = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(urls)
        })
        .await
    }

    async fn get_depth(&self, url: &str) -> StoreResult<Option<u32>> {
        let url = url.to_string();
        self.blocking(move |conn| {
            let depth = conn
                .query_row("SELECT depth FROM depths WHERE url = ?1", params![url], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(depth)
        })
        .await
    }

    async fn set_depth(&self, url: &str, depth: u32) -> StoreResult<()> {
        let url = url.to_string();
        self.blocking(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO depths (url, depth) VALUES (?1, ?2)",
                params![url, depth],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_host_errors(&self, host: &str) -> StoreResult<Option<HostErrorState>> {
        let host = host.to_string();
        self.blocking(move |conn| {
            let state = conn
                .query_row(
                    "SELECT host, number_of_errors, current_rate_limit_index, force_rate_limits, stop_crawl
                     FROM host_errors WHERE host = ?1",
                    params![host],
                    |row| {
                        Ok(HostErrorState {
                            host: row.get(0)?,
                            number_of_errors: row.get(1)?,
                            current_rate_limit_index: row
                                .get::<_, Option<i64>>(2)?
                                .map(|i| i as usize),
                            force_rate_limits: row.get::<_, i32>(3)? != 0,
                            stop_crawl_on_this_domain: row.get::<_, i32>(4)? != 0,
                        })
                    },
                )
                .optional()?;
            Ok(state)
        })
        .await
    }

    async fn set_host_errors(&self, state: &HostErrorState) -> StoreResult<()> {
        let state = state.clone();
        self.blocking(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO host_errors
                 (host, number_of_errors, current_rate_limit_index, force_rate_limits, stop_crawl)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    state.host,
                    state.number_of_errors,
                    state.current_rate_limit_index.map(|i| i as i64),
                    state.force_rate_limits as i32,
                    state.stop_crawl_on_this_domain as i32,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn add_start_origins(&self, urls: &[Url]) -> StoreResult<()> {
        let origins: Vec<(Option<String>, Option<String>)> = urls
            .iter()
            .map(|url| (host(url), registrable_domain(url)))
            .collect();

        self.blocking(move |conn| {
            for (h, d) in origins {
                if let Some(h) = h {
                    conn.execute("INSERT OR IGNORE INTO start_hosts (host) VALUES (?1)", params![h])?;
                }
                if let Some(d) = d {
                    conn.execute(
                        "INSERT OR IGNORE INTO start_domains (domain) VALUES (?1)",
                        params![d],
                    )?;
                }
            }
            Ok(())
        })
        .await
    }

    async fn classify(&self, parent: &Url, link: &Url) -> StoreResult<OriginClassification> {
        let (parent_host, parent_domain) = (host(parent), registrable_domain(parent));
        let (link_host, link_domain) = (host(link), registrable_domain(link));

        self.blocking(move |conn| {
            Ok(OriginClassification {
                parent_is_start_host: Self::contains_origin(conn, "start_hosts", "host", parent_host)?,
                parent_is_start_domain: Self::contains_origin(
                    conn,
                    "start_domains",
                    "domain",
                    parent_domain,
                )?,
                link_is_start_host: Self::contains_origin(conn, "start_hosts", "host", link_host)?,
                link_is_start_domain: Self::contains_origin(
                    conn,
                    "start_domains",
                    "domain",
                    link_domain,
                )?,
            })
        })
        .await
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
