//! Storage layer
//!
//! In-memory tables guarded by a per-table lock, persisted as one JSON file per table

mod table;
pub mod persistence;

pub use table::Table;
pub use persistence::{list_table_files, load_table, save_table, table_file_exists};
