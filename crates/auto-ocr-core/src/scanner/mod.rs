pub mod list;

pub use list::{Scanner, PDF_PATTERN};
