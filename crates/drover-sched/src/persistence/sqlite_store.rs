//! SQLite-based checkpoint storage.

use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::SecondsFormat;
use rusqlite::{Connection, OptionalExtension};

use crate::error::{SchedError, SchedResult};
use crate::persistence::{Checkpoint, CheckpointStore};

/// SQLite-based checkpoint store.
///
/// Keeps the latest checkpoint per job name, so several orchestrators can
/// share one database file.
pub struct SqliteCheckpointStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCheckpointStore {
    /// Create a new SQLite store at the given path.
    pub fn new(path: impl AsRef<Path>) -> SchedResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema_sync()?;
        Ok(store)
    }

    /// Create a new in-memory SQLite store.
    pub fn in_memory() -> SchedResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema_sync()?;
        Ok(store)
    }

    fn lock(&self) -> SchedResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| SchedError::Database(e.to_string()))
    }

    fn init_schema_sync(&self) -> SchedResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS checkpoints (
                job_name TEXT PRIMARY KEY,
                version INTEGER NOT NULL,
                outstanding INTEGER NOT NULL,
                data TEXT NOT NULL,
                saved_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_checkpoints_saved_at ON checkpoints(saved_at);
            "#,
        )?;
        Ok(())
    }

    /// Job names with a stored checkpoint, most recent first.
    pub fn job_names(&self) -> SchedResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT job_name FROM checkpoints ORDER BY saved_at DESC")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    async fn save(&self, checkpoint: &Checkpoint) -> SchedResult<()> {
        let data = checkpoint.to_json()?;
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO checkpoints (job_name, version, outstanding, data, saved_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            rusqlite::params![
                checkpoint.job_name,
                checkpoint.version,
                checkpoint.outstanding() as i64,
                data,
                checkpoint
                    .saved_at
                    .to_rfc3339_opts(SecondsFormat::Nanos, true),
            ],
        )?;
        Ok(())
    }

    async fn load(&self, job_name: Option<&str>) -> SchedResult<Option<Checkpoint>> {
        let data: Option<String> = {
            let conn = self.lock()?;
            match job_name {
                Some(name) => conn
                    .query_row(
                        "SELECT data FROM checkpoints WHERE job_name = ?1",
                        rusqlite::params![name],
                        |row| row.get(0),
                    )
                    .optional()?,
                None => conn
                    .query_row(
                        "SELECT data FROM checkpoints ORDER BY saved_at DESC LIMIT 1",
                        [],
                        |row| row.get(0),
                    )
                    .optional()?,
            }
        };

        data.map(|json| Checkpoint::from_json(&json)).transpose()
    }

    async fn remove(&self, job_name: &str) -> SchedResult<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM checkpoints WHERE job_name = ?1",
            rusqlite::params![job_name],
        )?;
        Ok(deleted > 0)
    }
}
