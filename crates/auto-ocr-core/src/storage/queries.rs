use super::models::*;
use super::sqlite::Ledger;
use crate::error::Error;
use rusqlite::types::Value;
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

const RECORD_COLUMNS: &str = "id, filename, input_dir, output_dir, file_hash, \
                              input_size, output_size, duration, processed_at";

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<ProcessedFileRecord> {
    Ok(ProcessedFileRecord {
        id: row.get(0)?,
        filename: row.get(1)?,
        input_dir: row.get(2)?,
        output_dir: row.get(3)?,
        file_hash: row.get(4)?,
        input_size: row.get(5)?,
        output_size: row.get(6)?,
        duration: row.get(7)?,
        processed_at: timestamp_text(row.get(8)?),
    })
}

/// Rows carried over from older generations may hold non-text timestamps.
fn timestamp_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Text(s) => Some(s),
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(f) => Some(f.to_string()),
        Value::Blob(b) => Some(String::from_utf8_lossy(&b).into_owned()),
    }
}

impl Ledger {
    pub fn is_processed(&self, file_hash: &str) -> Result<bool, Error> {
        let conn = self.connect()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM processed_files WHERE file_hash = ?1",
                params![file_hash],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Records a processed file under a freshly minted id.
    ///
    /// A record with the same `file_hash` already present makes this a no-op;
    /// returns whether a row was actually inserted.
    pub fn mark_processed(&self, record: &NewRecord<'_>) -> Result<bool, Error> {
        let id = self.next_id()?;
        let conn = self.connect()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO processed_files \
             (id, filename, input_dir, output_dir, file_hash, input_size, output_size, duration) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id,
                record.filename,
                record.input_dir,
                record.output_dir,
                record.file_hash,
                record.input_size.map(|v| v as i64),
                record.output_size.map(|v| v as i64),
                record.duration,
            ],
        )?;
        if inserted == 0 {
            debug!("{} already recorded, insert ignored", record.file_hash);
        }
        Ok(inserted > 0)
    }

    pub fn find_by_hash(&self, file_hash: &str) -> Result<Option<ProcessedFileRecord>, Error> {
        let conn = self.connect()?;
        let record = conn
            .query_row(
                &format!("SELECT {} FROM processed_files WHERE file_hash = ?1", RECORD_COLUMNS),
                params![file_hash],
                record_from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Most recent records first (ids are time-sortable).
    pub fn list_records(&self, limit: usize) -> Result<Vec<ProcessedFileRecord>, Error> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM processed_files ORDER BY id DESC LIMIT ?1",
            RECORD_COLUMNS
        ))?;
        let records = stmt
            .query_map(params![limit as i64], record_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    pub fn count(&self) -> Result<i64, Error> {
        let conn = self.connect()?;
        let count = conn.query_row("SELECT COUNT(*) FROM processed_files", [], |row| row.get(0))?;
        Ok(count)
    }
}
