use chrono::NaiveDateTime;

/// One successfully processed file, keyed by content fingerprint.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedFileRecord {
    /// ULID, sortable by creation time.
    pub id: String,
    pub filename: String,
    pub input_dir: String,
    pub output_dir: String,
    /// Hex-encoded SHA-256 of the input content.
    pub file_hash: String,
    pub input_size: Option<i64>,
    pub output_size: Option<i64>,
    /// Seconds spent in the transformer.
    pub duration: Option<f64>,
    pub processed_at: Option<String>,
}

impl ProcessedFileRecord {
    /// Parses `processed_at` as written by SQLite's `CURRENT_TIMESTAMP`.
    pub fn processed_at_utc(&self) -> Option<NaiveDateTime> {
        let raw = self.processed_at.as_deref()?;
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
    }
}

/// Metadata written alongside a fingerprint by `Ledger::mark_processed`.
#[derive(Debug, Clone, Default)]
pub struct NewRecord<'a> {
    pub filename: &'a str,
    pub input_dir: &'a str,
    pub output_dir: &'a str,
    pub file_hash: &'a str,
    pub input_size: Option<u64>,
    pub output_size: Option<u64>,
    pub duration: Option<f64>,
}
