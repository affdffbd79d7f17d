pub mod migrate;
pub mod models;
pub mod queries;
pub mod sqlite;

pub use models::{NewRecord, ProcessedFileRecord};
pub use sqlite::Ledger;
