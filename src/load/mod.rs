//! Play-history persistence using SQLite.
//!
//! Rows are only ever inserted; a play whose `id` is already stored is
//! skipped, which is what makes repeated runs over overlapping windows safe.

use crate::config::validate_table_name;
use crate::error::EtlError;
use crate::transform::CanonicalPlayRecord;
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::debug;

/// Append-only store of canonical plays.
///
/// # Schema
/// ```sql
/// CREATE TABLE spotify_recent_tracks (
///     id          INTEGER PRIMARY KEY,  -- millisecond epoch of played_at
///     date        TEXT NOT NULL,        -- local calendar date
///     song_name   TEXT NOT NULL,
///     artist_name TEXT NOT NULL,
///     played_at   TEXT NOT NULL         -- local time, YYYY-MM-DD HH:MM:SS
/// );
/// ```
pub struct Loader {
    conn: Connection,
    table_name: String,
}

impl Loader {
    /// Opens (or creates) the database file. The table is created lazily by
    /// the first non-empty [`merge`](Self::merge).
    pub fn open<P: AsRef<Path>>(db_path: P, table_name: &str) -> Result<Self, EtlError> {
        let conn = Connection::open(db_path.as_ref()).map_err(|e| {
            EtlError::Storage(format!(
                "Failed to open database at {}: {}",
                db_path.as_ref().display(),
                e
            ))
        })?;
        Self::with_connection(conn, table_name)
    }

    /// Uses an existing connection (e.g. `Connection::open_in_memory()`).
    pub fn with_connection(conn: Connection, table_name: &str) -> Result<Self, EtlError> {
        validate_table_name(table_name)?;
        Ok(Self {
            conn,
            table_name: table_name.to_string(),
        })
    }

    fn ensure_table(&self) -> Result<(), EtlError> {
        self.conn
            .execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    id          INTEGER PRIMARY KEY,
                    date        TEXT NOT NULL,
                    song_name   TEXT NOT NULL,
                    artist_name TEXT NOT NULL,
                    played_at   TEXT NOT NULL
                );",
                self.table_name
            ))
            .map_err(EtlError::storage("Failed to create play history table"))
    }

    /// Insert-if-absent for a batch, in one transaction.
    ///
    /// # Returns
    /// * `Ok(n)` - Number of rows that were not already stored
    /// * `Err(Storage)` - Any failure other than a duplicate `id`; the batch
    ///   is rolled back
    pub fn merge(&mut self, rows: &[CanonicalPlayRecord]) -> Result<usize, EtlError> {
        if rows.is_empty() {
            debug!(table = %self.table_name, "No rows to merge");
            return Ok(0);
        }

        self.ensure_table()?;

        let tx = self
            .conn
            .transaction()
            .map_err(EtlError::storage("Failed to begin transaction"))?;

        let mut inserted = 0;
        {
            // ON CONFLICT(id) only absorbs key collisions; NOT NULL and other
            // constraint failures still abort.
            let mut stmt = tx
                .prepare(&format!(
                    "INSERT INTO {} (id, date, song_name, artist_name, played_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(id) DO NOTHING",
                    self.table_name
                ))
                .map_err(EtlError::storage("Failed to prepare insert"))?;

            for row in rows {
                inserted += stmt
                    .execute(params![
                        row.id,
                        row.local_date,
                        row.track_name,
                        row.artist_name,
                        row.local_played_at,
                    ])
                    .map_err(|e| {
                        EtlError::Storage(format!("Failed to insert play {}: {}", row.id, e))
                    })?;
            }
        }

        tx.commit()
            .map_err(EtlError::storage("Failed to commit play history"))?;

        if inserted == 0 {
            debug!(table = %self.table_name, offered = rows.len(), "No new rows");
        } else {
            debug!(table = %self.table_name, inserted, offered = rows.len(), "Inserted rows");
        }

        Ok(inserted)
    }

    /// Total stored rows; 0 when the table does not exist yet.
    pub fn row_count(&self) -> Result<u64, EtlError> {
        let exists: bool = self
            .conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
                params![self.table_name],
                |row| row.get(0),
            )
            .map_err(EtlError::storage("Failed to inspect schema"))?;
        if !exists {
            return Ok(0);
        }

        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", self.table_name), [], |row| {
                row.get(0)
            })
            .map_err(EtlError::storage("Failed to count rows"))?;
        Ok(count.max(0) as u64)
    }
}
