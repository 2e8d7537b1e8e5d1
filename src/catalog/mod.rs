//! Catalog: which tables exist and where they live

mod registry;

pub use registry::TableRegistry;
