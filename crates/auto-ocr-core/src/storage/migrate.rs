//! Live schema reconciliation for the `processed_files` table.
//!
//! Three generations can be found on disk: no table at all, a legacy table
//! keyed by an auto-incrementing integer, and the current table keyed by a
//! textual ULID. Each generation maps to exactly one strategy, executed once
//! inside a single transaction when the ledger is opened.

use crate::error::Error;
use rusqlite::types::Value;
use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

pub const TABLE: &str = "processed_files";

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Non-unique hash index written by earlier releases.
const LEGACY_HASH_INDEX: &str = "idx_hash";

/// A column as reported by `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub decl_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub ddl: &'static str,
}

/// Columns the current generation has beyond the legacy `filename`/`file_hash`
/// pair. SQLite rejects non-constant defaults in `ALTER TABLE`, so
/// `processed_at` is added without one.
pub const ADDITIVE_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec { name: "input_dir", ddl: "TEXT NOT NULL DEFAULT ''" },
    ColumnSpec { name: "output_dir", ddl: "TEXT NOT NULL DEFAULT ''" },
    ColumnSpec { name: "input_size", ddl: "INTEGER" },
    ColumnSpec { name: "output_size", ddl: "INTEGER" },
    ColumnSpec { name: "duration", ddl: "REAL" },
    ColumnSpec { name: "processed_at", ddl: "TIMESTAMP" },
];

/// Columns carried across a rebuild, in insert order.
const CARRIED_COLUMNS: [&str; 8] = [
    "filename",
    "input_dir",
    "output_dir",
    "file_hash",
    "input_size",
    "output_size",
    "duration",
    "processed_at",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaGeneration {
    Absent,
    /// Key column missing or not `TEXT`.
    Legacy,
    Current,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationStrategy {
    CreateFresh,
    Noop,
    AddColumns(Vec<ColumnSpec>),
    Rebuild,
}

impl MigrationStrategy {
    pub fn describe(&self) -> String {
        match self {
            MigrationStrategy::CreateFresh => "created fresh schema".to_string(),
            MigrationStrategy::Noop => "schema up to date".to_string(),
            MigrationStrategy::AddColumns(cols) => {
                let names: Vec<&str> = cols.iter().map(|c| c.name).collect();
                format!("added columns: {}", names.join(", "))
            }
            MigrationStrategy::Rebuild => "rebuilt legacy table".to_string(),
        }
    }
}

pub fn read_columns(conn: &Connection) -> rusqlite::Result<Vec<ColumnInfo>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", TABLE))?;
    let columns = stmt
        .query_map([], |row| {
            Ok(ColumnInfo {
                name: row.get(1)?,
                decl_type: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}

pub fn detect_generation(columns: &[ColumnInfo]) -> SchemaGeneration {
    if columns.is_empty() {
        return SchemaGeneration::Absent;
    }
    match columns.iter().find(|c| c.name == "id") {
        Some(id) if id.decl_type.eq_ignore_ascii_case("TEXT") => SchemaGeneration::Current,
        _ => SchemaGeneration::Legacy,
    }
}

/// Chooses the strategy for what is on disk. A table without `file_hash`
/// carries no identity to preserve and is rejected.
pub fn plan(columns: &[ColumnInfo]) -> Result<MigrationStrategy, String> {
    let generation = detect_generation(columns);
    if generation != SchemaGeneration::Absent && !columns.iter().any(|c| c.name == "file_hash") {
        return Err(format!("table {} has no file_hash column", TABLE));
    }

    let strategy = match generation {
        SchemaGeneration::Absent => MigrationStrategy::CreateFresh,
        SchemaGeneration::Legacy => MigrationStrategy::Rebuild,
        SchemaGeneration::Current => {
            let present: HashSet<&str> = columns.iter().map(|c| c.name.as_str()).collect();
            let missing: Vec<ColumnSpec> = ADDITIVE_COLUMNS
                .iter()
                .filter(|spec| !present.contains(spec.name))
                .copied()
                .collect();
            if missing.is_empty() {
                MigrationStrategy::Noop
            } else {
                MigrationStrategy::AddColumns(missing)
            }
        }
    };
    Ok(strategy)
}

/// Inspects the live schema and applies the planned strategy atomically.
/// `mint_id` supplies identifiers for rows re-keyed by a rebuild.
pub fn reconcile_schema<F>(
    conn: &mut Connection,
    path: &Path,
    mut mint_id: F,
) -> Result<MigrationStrategy, Error>
where
    F: FnMut() -> Result<String, Error>,
{
    let tx = conn.transaction()?;
    let columns = read_columns(&tx)?;
    let strategy = plan(&columns).map_err(|reason| Error::IncompatibleSchema {
        path: path.to_path_buf(),
        reason,
    })?;

    match &strategy {
        MigrationStrategy::CreateFresh => {
            tx.execute_batch(SCHEMA_SQL)?;
        }
        MigrationStrategy::Noop => {
            enforce_unique_hash(&tx)?;
        }
        MigrationStrategy::AddColumns(missing) => {
            for spec in missing {
                debug!("Adding column {} {}", spec.name, spec.ddl);
                tx.execute_batch(&format!(
                    "ALTER TABLE {} ADD COLUMN {} {}",
                    TABLE, spec.name, spec.ddl
                ))?;
            }
            enforce_unique_hash(&tx)?;
        }
        MigrationStrategy::Rebuild => {
            let count = rebuild(&tx, &columns, &mut mint_id)?;
            info!("Rebuilt legacy {} table, re-keyed {} rows", TABLE, count);
        }
    }

    tx.commit()?;
    Ok(strategy)
}

/// Collapses rows sharing a hash to the earliest one, then installs the unique
/// hash index so tables created without `UNIQUE` still dedupe inserts.
fn enforce_unique_hash(conn: &Connection) -> Result<(), Error> {
    let removed = conn.execute(
        &format!(
            "DELETE FROM {table} WHERE file_hash IS NOT NULL AND rowid NOT IN \
             (SELECT MIN(rowid) FROM {table} GROUP BY file_hash)",
            table = TABLE
        ),
        [],
    )?;
    if removed > 0 {
        warn!("Removed {} duplicate {} rows sharing a file_hash", removed, TABLE);
    }
    conn.execute_batch(&format!("DROP INDEX IF EXISTS {}", LEGACY_HASH_INDEX))?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

struct LegacyRow {
    filename: Option<String>,
    input_dir: Option<String>,
    output_dir: Option<String>,
    file_hash: Option<String>,
    input_size: Option<i64>,
    output_size: Option<i64>,
    duration: Option<f64>,
    processed_at: Value,
}

fn rebuild<F>(conn: &Connection, columns: &[ColumnInfo], mint_id: &mut F) -> Result<usize, Error>
where
    F: FnMut() -> Result<String, Error>,
{
    let present: HashSet<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    let select_list: Vec<&str> = CARRIED_COLUMNS
        .iter()
        .map(|name| if present.contains(name) { *name } else { "NULL" })
        .collect();

    let snapshot: Vec<LegacyRow> = {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} ORDER BY rowid",
            select_list.join(", "),
            TABLE
        ))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(LegacyRow {
                    filename: row.get(0)?,
                    input_dir: row.get(1)?,
                    output_dir: row.get(2)?,
                    file_hash: row.get(3)?,
                    input_size: row.get(4)?,
                    output_size: row.get(5)?,
                    duration: row.get(6)?,
                    processed_at: row.get(7)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows
    };

    conn.execute_batch(&format!("DROP TABLE {}", TABLE))?;
    conn.execute_batch(SCHEMA_SQL)?;

    let mut stmt = conn.prepare(&format!(
        "INSERT OR IGNORE INTO {} \
         (id, filename, input_dir, output_dir, file_hash, \
          input_size, output_size, duration, processed_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, COALESCE(?9, CURRENT_TIMESTAMP))",
        TABLE
    ))?;
    let mut carried = 0;
    for row in &snapshot {
        let Some(file_hash) = row.file_hash.as_deref() else {
            warn!("Dropping legacy row without a file_hash during rebuild");
            continue;
        };
        let id = mint_id()?;
        carried += stmt.execute(params![
            id,
            row.filename.as_deref().unwrap_or_default(),
            row.input_dir.as_deref().unwrap_or_default(),
            row.output_dir.as_deref().unwrap_or_default(),
            file_hash,
            row.input_size,
            row.output_size,
            row.duration,
            row.processed_at,
        ])?;
    }
    Ok(carried)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str, decl_type: &str) -> ColumnInfo {
        ColumnInfo {
            name: name.to_string(),
            decl_type: decl_type.to_string(),
        }
    }

    #[test]
    fn test_plan_per_generation() {
        assert_eq!(plan(&[]).unwrap(), MigrationStrategy::CreateFresh);

        let legacy = vec![
            col("id", "INTEGER"),
            col("filename", "TEXT"),
            col("file_hash", "TEXT"),
            col("processed_at", "TIMESTAMP"),
        ];
        assert_eq!(detect_generation(&legacy), SchemaGeneration::Legacy);
        assert_eq!(plan(&legacy).unwrap(), MigrationStrategy::Rebuild);

        let partial = vec![
            col("id", "text"),
            col("filename", "TEXT"),
            col("input_dir", "TEXT"),
            col("output_dir", "TEXT"),
            col("file_hash", "TEXT"),
            col("input_size", "INTEGER"),
            col("output_size", "INTEGER"),
            col("processed_at", "TIMESTAMP"),
        ];
        match plan(&partial).unwrap() {
            MigrationStrategy::AddColumns(cols) => {
                assert_eq!(cols.len(), 1);
                assert_eq!(cols[0].name, "duration");
            }
            other => panic!("expected AddColumns, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_id_is_legacy() {
        let cols = vec![col("filename", "TEXT"), col("file_hash", "TEXT")];
        assert_eq!(plan(&cols).unwrap(), MigrationStrategy::Rebuild);
    }

    #[test]
    fn test_missing_hash_is_rejected() {
        let cols = vec![col("id", "INTEGER"), col("filename", "TEXT")];
        assert!(plan(&cols).is_err());
    }
}
