//! Storage module for crawl bookkeeping
//!
//! This module holds the pluggable history/depth/host-state store:
//! - `CrawlStore`: the trait the crawl engine talks to
//! - `MemoryStore`: the default, process-local backend
//! - `SqliteStore`: a durable backend that also tracks runs for resumption

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{CrawlStore, OriginClassification, StoreError, StoreResult};

use crate::config::{StoreConfig, StoreKind};
use crate::RippleError;
use std::path::Path;
use std::sync::Arc;

/// A store opened for one run
///
/// Durable backends also carry the run record that `finish` closes.
pub struct StoreSession {
    store: Arc<dyn CrawlStore>,
    run: Option<(Arc<SqliteStore>, i64)>,
    resume: bool,
}

impl StoreSession {
    pub fn store(&self) -> Arc<dyn CrawlStore> {
        self.store.clone()
    }

    /// Returns true if URLs left unfinished by an earlier run should be re-queued
    pub fn should_resume(&self) -> bool {
        self.resume
    }

    pub fn run_id(&self) -> Option<i64> {
        self.run.as_ref().map(|(_, id)| *id)
    }

    /// Marks the run as completed
    pub fn finish(&self) -> Result<(), RippleError> {
        if let Some((store, run_id)) = &self.run {
            store.complete_run(*run_id)?;
            tracing::info!("Run {} completed", run_id);
        }
        Ok(())
    }
}

/// Opens the store selected by the configuration and starts a run on it
///
/// # Arguments
///
/// * `config` - Store section of the configuration
/// * `config_hash` - Hash of the configuration file, recorded with the run
/// * `fresh` - Discard any stored state instead of resuming
///
/// # Returns
///
/// * `Ok(StoreSession)` - The store, plus its run record for sqlite
/// * `Err(RippleError)` - The database could not be opened or updated
pub fn open_store(
    config: &StoreConfig,
    config_hash: &str,
    fresh: bool,
) -> Result<StoreSession, RippleError> {
    match config.kind {
        StoreKind::Memory => Ok(StoreSession {
            store: Arc::new(MemoryStore::new()),
            run: None,
            resume: false,
        }),
        StoreKind::Sqlite => {
            let store = Arc::new(SqliteStore::open(Path::new(&config.path))?);
            settle_previous_run(&store, config_hash, fresh)?;

            let run_id = store.create_run(config_hash)?;
            tracing::info!("Starting run {} on {}", run_id, config.path);

            Ok(StoreSession {
                store: store.clone(),
                run: Some((store, run_id)),
                resume: !fresh,
            })
        }
    }
}

/// Resets state for a fresh run, or marks an unfinished previous run interrupted
fn settle_previous_run(store: &SqliteStore, config_hash: &str, fresh: bool) -> StoreResult<()> {
    if fresh {
        tracing::info!("Starting fresh crawl (discarding stored state)");
        return store.reset();
    }

    if let Some(previous) = store.latest_run()? {
        if previous.config_hash != config_hash {
            tracing::warn!(
                "Configuration changed since run {} (hash {}); resuming anyway",
                previous.id,
                previous.config_hash
            );
        }
        if previous.status == RunStatus::Running {
            tracing::info!("Run {} did not finish; resuming it", previous.id);
            store.update_run_status(previous.id, RunStatus::Interrupted)?;
        }
    }

    Ok(())
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_invalid() {
        assert_eq!(RunStatus::from_db_string("failed"), None);
        assert_eq!(RunStatus::from_db_string("running"), Some(RunStatus::Running));
    }

    #[tokio::test]
    async fn test_open_memory_store() {
        let session = open_store(&StoreConfig::default(), "hash", false).unwrap();
        assert_eq!(session.store().name(), "memory");
        assert!(!session.should_resume());
        assert_eq!(session.run_id(), None);
        session.finish().unwrap();
    }

    fn sqlite_config(dir: &tempfile::TempDir) -> StoreConfig {
        StoreConfig {
            kind: StoreKind::Sqlite,
            path: dir.path().join("ripple.db").to_string_lossy().into_owned(),
        }
    }

    #[tokio::test]
    async fn test_sqlite_session_marks_unfinished_run_interrupted() {
        let dir = tempfile::tempdir().unwrap();
        let config = sqlite_config(&dir);

        let first = open_store(&config, "hash-1", false).unwrap();
        let first_id = first.run_id().unwrap();
        first.store().check_and_mark_history("https://example.com/").await.unwrap();
        drop(first);

        let second = open_store(&config, "hash-2", false).unwrap();
        assert!(second.should_resume());
        assert_ne!(second.run_id(), Some(first_id));
        assert_eq!(
            second.store().interrupted_urls().await.unwrap(),
            vec!["https://example.com/".to_string()]
        );
        second.finish().unwrap();

        let db = SqliteStore::open(Path::new(&config.path)).unwrap();
        let latest = db.latest_run().unwrap().unwrap();
        assert_eq!(latest.status, RunStatus::Completed);
        assert_eq!(latest.config_hash, "hash-2");
    }

    #[tokio::test]
    async fn test_fresh_sqlite_session_discards_state() {
        let dir = tempfile::tempdir().unwrap();
        let config = sqlite_config(&dir);

        let first = open_store(&config, "hash", false).unwrap();
        first.store().check_and_mark_history("https://example.com/").await.unwrap();
        drop(first);

        let fresh = open_store(&config, "hash", true).unwrap();
        assert!(!fresh.should_resume());
        assert!(fresh.store().interrupted_urls().await.unwrap().is_empty());
    }

    #[test]
    fn test_open_failure_surfaces_as_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            kind: StoreKind::Sqlite,
            path: dir.path().join("missing").join("ripple.db").to_string_lossy().into_owned(),
        };

        let err = open_store(&config, "hash", false).err().unwrap();
        assert!(matches!(err, RippleError::Store(_)));
    }
}
