//! Database Module
//!
//! # Module Structure
//! - `core`: Engine struct, `open` and `execute`
//! - `table`: Table management (create/resolve/list, foreign-key check)

pub mod core;
pub mod table;

pub use self::core::Engine;
