//! SQLite round store: the relational backend the retention manager prunes.
//!
//! All access is synchronous (rusqlite) behind a mutex. The async
//! `RetentionStore` impl moves the delete onto the blocking pool. Its deadline
//! covers both waiting for the connection and running the statement: the lock
//! is taken with `try_lock_for`, and a progress handler installed only for the
//! delete aborts it once the deadline passes. Other statements on the same
//! connection are never interrupted, and a delete that reports `Timeout` has
//! removed nothing.

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::retention::store::{RetentionStore, StoreError};
use crate::utils::Result;

const SCHEMA_DDL: &str = "
    CREATE TABLE IF NOT EXISTS txn (
        round INTEGER NOT NULL,
        intra INTEGER NOT NULL,
        payload TEXT NOT NULL DEFAULT '{}',
        PRIMARY KEY (round, intra)
    );
";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// VM instructions between deadline checks while a delete runs.
const PROGRESS_OPS: i32 = 1_000;

fn to_sql(round: u64) -> i64 {
    i64::try_from(round).unwrap_or(i64::MAX)
}

#[derive(Clone)]
pub struct SqliteRoundStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteRoundStore {
    /// Open (or create) a database file and make sure the schema exists.
    /// `:memory:` opens a private in-memory database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path == Path::new(":memory:") {
            return Self::open_in_memory();
        }
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn, Some(path.to_path_buf()))
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, None)
    }

    fn with_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA_DDL)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)), path })
    }

    pub fn path(&self) -> Option<PathBuf> {
        self.path.clone()
    }

    pub fn insert_txn(&self, round: u64, intra: u64, payload: &str) -> Result<()> {
        self.conn.lock().execute(
            "INSERT OR REPLACE INTO txn (round, intra, payload) VALUES (?1, ?2, ?3)",
            params![to_sql(round), to_sql(intra), payload],
        )?;
        Ok(())
    }

    /// Insert one row per round in `rounds`, in a single transaction.
    pub fn insert_rounds(&self, rounds: RangeInclusive<u64>) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut n = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO txn (round, intra, payload) VALUES (?1, ?1, '{}')",
            )?;
            for round in rounds {
                stmt.execute(params![to_sql(round)])?;
                n += 1;
            }
        }
        tx.commit()?;
        Ok(n)
    }

    pub fn row_count(&self) -> Result<u64> {
        let n: i64 = self.conn.lock().query_row("SELECT count(*) FROM txn", [], |r| r.get(0))?;
        Ok(n as u64)
    }

    /// Distinct rounds present, ascending.
    pub fn rounds(&self) -> Result<Vec<u64>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT DISTINCT round FROM txn ORDER BY round")?;
        let rows = stmt.query_map([], |r| r.get::<_, i64>(0))?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r? as u64);
        }
        Ok(out)
    }

    /// Lowest and highest round present, `None` when empty.
    pub fn round_bounds(&self) -> Result<Option<(u64, u64)>> {
        let bounds = self
            .conn
            .lock()
            .query_row("SELECT min(round), max(round) FROM txn", [], |r| {
                Ok((r.get::<_, Option<i64>>(0)?, r.get::<_, Option<i64>>(1)?))
            })
            .optional()?;
        Ok(match bounds {
            Some((Some(lo), Some(hi))) => Some((lo as u64, hi as u64)),
            _ => None,
        })
    }
}

fn delete_before(conn: &Mutex<Connection>, cutoff: u64, timeout: Duration) -> std::result::Result<u64, StoreError> {
    let deadline = Instant::now() + timeout;
    let Some(conn) = conn.try_lock_for(timeout) else {
        warn!(cutoff, ?timeout, "store connection busy past the delete timeout");
        return Err(StoreError::Timeout(timeout));
    };
    if Instant::now() >= deadline {
        return Err(StoreError::Timeout(timeout));
    }

    conn.progress_handler(PROGRESS_OPS, Some(move || Instant::now() >= deadline));
    let res = conn.execute("DELETE FROM txn WHERE round < ?1", params![to_sql(cutoff)]);
    conn.progress_handler(PROGRESS_OPS, None::<fn() -> bool>);

    match res {
        Ok(rows) => Ok(rows as u64),
        // the statement is rolled back, nothing was removed
        Err(e) if e.sqlite_error_code() == Some(ErrorCode::OperationInterrupted) => {
            warn!(cutoff, ?timeout, "delete exceeded timeout, aborted");
            Err(StoreError::Timeout(timeout))
        }
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl RetentionStore for SqliteRoundStore {
    async fn delete_older_than(&self, cutoff: u64, timeout: Duration) -> std::result::Result<u64, StoreError> {
        let conn = self.conn.clone();
        let rows = tokio::task::spawn_blocking(move || delete_before(&conn, cutoff, timeout)).await??;
        debug!(cutoff, rows, "deleted rounds below cutoff");
        Ok(rows)
    }
}
