//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the durable store.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- Claimed URLs; completed = 0 means the pipeline never finished
CREATE TABLE IF NOT EXISTS history (
    url TEXT PRIMARY KEY,
    completed INTEGER NOT NULL DEFAULT 0,
    claimed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_history_completed ON history(completed);

-- First-discovery depth per URL
CREATE TABLE IF NOT EXISTS depths (
    url TEXT PRIMARY KEY,
    depth INTEGER NOT NULL
);

-- Per-host error escalation state
CREATE TABLE IF NOT EXISTS host_errors (
    host TEXT PRIMARY KEY,
    number_of_errors INTEGER NOT NULL DEFAULT 0,
    current_rate_limit_index INTEGER,
    force_rate_limits INTEGER NOT NULL DEFAULT 0,
    stop_crawl INTEGER NOT NULL DEFAULT 0
);

-- Hosts and registrable domains the crawl started from
CREATE TABLE IF NOT EXISTS start_hosts (
    host TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS start_domains (
    domain TEXT PRIMARY KEY
);
"#;

/// Tables emptied when a run is started fresh
pub const RESET_SQL: &str = r#"
DELETE FROM history;
DELETE FROM depths;
DELETE FROM host_errors;
DELETE FROM start_hosts;
DELETE FROM start_domains;
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
