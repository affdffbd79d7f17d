use super::migrate;
use crate::error::Error;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info};
use ulid::Generator;

const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Append-only record of processed files, keyed by content hash.
///
/// The store is opened per operation (open, one statement, close) so nothing
/// holds a lock between cycles. Schema reconciliation runs once in `open`.
pub struct Ledger {
    path: PathBuf,
    ids: Mutex<Generator>,
}

impl Ledger {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let ledger = Ledger {
            path: path.as_ref().to_path_buf(),
            ids: Mutex::new(Generator::new()),
        };

        let mut conn = ledger.connect()?;
        let strategy = migrate::reconcile_schema(&mut conn, &ledger.path, || ledger.next_id())?;
        info!(
            "Ledger ready at {} ({})",
            ledger.path.display(),
            strategy.describe()
        );
        Ok(ledger)
    }

    pub(crate) fn connect(&self) -> rusqlite::Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        debug!("Opened ledger connection to {}", self.path.display());
        Ok(conn)
    }

    /// Mints a ULID that sorts after every id minted before it by this ledger.
    pub(crate) fn next_id(&self) -> Result<String, Error> {
        let mut generator = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(generator.generate()?.to_string())
    }
}
