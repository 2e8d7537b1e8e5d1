//! mini-rdbms: a single-process relational engine
//!
//! ## Pipeline
//! - SQL text → `sql::Lexer` → `sql::Parser` (AST)
//! - SELECT → `query::Planner` → plan tree (`Scan`, `IndexScan`, `Join`, `Filter`, `Limit`)
//! - CREATE/INSERT/UPDATE/DELETE → straight to the `storage::Table`, then saved
//!
//! ## Storage
//! - One in-memory `Table` per name: primary key → row, plus a hash index per
//!   primary/unique column, all behind one reader/writer lock
//! - One JSON file per table, replaced atomically (temp file + rename + fsync)
//! - Tables on disk are loaded lazily on first reference
//!
//! ```ignore
//! use mini_rdbms::{Cancellation, Engine, EngineConfig};
//!
//! let engine = Engine::open(EngineConfig::new("data"))?;
//! let cancel = Cancellation::new();
//! engine.execute("CREATE TABLE items (id INT PRIMARY KEY, name TEXT)", &cancel)?;
//! engine.execute("INSERT INTO items VALUES (10, 'Book')", &cancel)?;
//! let result = engine.execute("SELECT * FROM items WHERE id = 10", &cancel)?;
//! ```

pub mod cancel;
pub mod catalog;
pub mod config;
pub mod database;
pub mod index;
pub mod query;
pub mod sql;
pub mod storage;
pub mod types;

mod error;

pub use cancel::Cancellation;
pub use catalog::TableRegistry;
pub use config::{DurabilityLevel, EngineConfig};
pub use database::Engine;
pub use error::{DbError, ErrorKind, Result};
pub use sql::{execute_sql, QueryResult};
pub use storage::Table;
pub use types::{ColumnDef, ColumnType, ForeignKeyDef, Row, TableSchema, Value};
