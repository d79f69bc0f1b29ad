//! SQLite persistence for analyzed combat sessions.
//!
//! Storage is strictly best-effort: the analysis pipeline never depends
//! on it, and callers are expected to log and swallow any [`StorageError`].
//! A session and all of its derived rows are written in one transaction,
//! so a session is either stored completely or not at all.

use std::path::Path;

use rusqlite::{params, Connection};
use thiserror::Error;

use crate::models::{CombatSession, PlayerItemStats, PlayerStats, SessionSummary};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Wrapper around a `rusqlite::Connection`. `Send` but not `Sync`;
/// multi-threaded callers put it behind a `Mutex`.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (and initialize) a database file, creating it if necessary.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.init()?;
        Ok(db)
    }

    /// In-memory database for tests.
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.init()?;
        Ok(db)
    }

    /// Idempotent schema setup.
    fn init(&self) -> Result<(), StorageError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS combat_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL UNIQUE,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP,
                player_names TEXT NOT NULL,
                total_duration REAL,
                total_events INTEGER
            );

            CREATE TABLE IF NOT EXISTS combat_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                timestamp REAL NOT NULL,
                player TEXT NOT NULL,
                item TEXT NOT NULL,
                action TEXT NOT NULL,
                value INTEGER,
                target TEXT,
                is_critical INTEGER DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_combat_events_session ON combat_events(session_id);
            CREATE INDEX IF NOT EXISTS idx_combat_events_player ON combat_events(player);
            CREATE INDEX IF NOT EXISTS idx_combat_events_timestamp ON combat_events(timestamp);

            CREATE TABLE IF NOT EXISTS player_stats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                player_name TEXT NOT NULL,
                total_damage INTEGER DEFAULT 0,
                total_healing INTEGER DEFAULT 0,
                total_armor_gained INTEGER DEFAULT 0,
                damage_taken INTEGER DEFAULT 0,
                status_effects_applied INTEGER DEFAULT 0,
                status_effects_received INTEGER DEFAULT 0,
                critical_hits INTEGER DEFAULT 0,
                missed_attacks INTEGER DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_player_stats_session ON player_stats(session_id);

            CREATE TABLE IF NOT EXISTS item_usage (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                player_name TEXT NOT NULL,
                item_name TEXT NOT NULL,
                usage_count INTEGER DEFAULT 0,
                total_damage INTEGER DEFAULT 0,
                total_healing INTEGER DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_item_usage_session ON item_usage(session_id);
            ",
        )?;
        Ok(())
    }

    /// Store a session with its events, player stats, and flattened
    /// (player, item) usage rows in one transaction.
    pub fn store_session(
        &mut self,
        session: &CombatSession,
        player_stats: &[PlayerStats],
        item_usage: &[PlayerItemStats],
    ) -> Result<(), StorageError> {
        let player_names = serde_json::to_string(&session.player_names)?;
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO combat_sessions (session_id, player_names, total_duration, total_events)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                session.session_id,
                player_names,
                session.total_duration,
                session.total_events as i64
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO combat_events (session_id, timestamp, player, item, action, value, target, is_critical)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for event in &session.events {
                stmt.execute(params![
                    session.session_id,
                    event.timestamp,
                    event.player,
                    event.item,
                    event.action.as_str(),
                    event.value.unwrap_or(0),
                    event.target.as_deref(),
                    event.is_critical.unwrap_or(false),
                ])?;
            }
        }

        {
            let mut stmt = tx.prepare(
                "INSERT INTO player_stats (session_id, player_name, total_damage, total_healing,
                    total_armor_gained, damage_taken, status_effects_applied,
                    status_effects_received, critical_hits, missed_attacks)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for stats in player_stats {
                stmt.execute(params![
                    session.session_id,
                    stats.player_name,
                    stats.total_damage,
                    stats.total_healing,
                    stats.total_armor_gained,
                    stats.damage_taken,
                    stats.status_effects_applied,
                    stats.status_effects_received,
                    stats.critical_hits,
                    stats.missed_attacks,
                ])?;
            }
        }

        {
            let mut stmt = tx.prepare(
                "INSERT INTO item_usage (session_id, player_name, item_name, usage_count, total_damage, total_healing)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for player_items in item_usage {
                for item in &player_items.items {
                    stmt.execute(params![
                        session.session_id,
                        player_items.player_name,
                        item.item_name,
                        item.usage_count,
                        item.total_damage,
                        item.total_healing,
                    ])?;
                }
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Latest stored sessions, newest first.
    pub fn list_sessions(&self, limit: u32) -> Result<Vec<SessionSummary>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT session_id, player_names, total_duration, total_events, created_at
             FROM combat_sessions
             ORDER BY created_at DESC, id DESC
             LIMIT ?1",
        )?;

        let rows = stmt.query_map([limit], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            let (session_id, names_json, total_duration, total_events, created_at) = row?;
            sessions.push(SessionSummary {
                session_id,
                player_names: serde_json::from_str(&names_json).unwrap_or_default(),
                total_duration,
                total_events,
                created_at,
            });
        }
        Ok(sessions)
    }
}
