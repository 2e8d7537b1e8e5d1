/// Table registry: the engine's name -> table map
///
/// Tables are created through the registry or loaded lazily from
/// `<data_dir>/<name>.json` on first use. The map is a `DashMap`, so lookups of
/// different tables never contend on a single lock.
use crate::config::EngineConfig;
use crate::error::{DbError, Result};
use crate::storage::{self, Table};
use crate::types::TableSchema;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fs;
use std::sync::Arc;

pub struct TableRegistry {
    config: EngineConfig,
    tables: DashMap<String, Arc<Table>>,
}

impl TableRegistry {
    /// Create a registry over `config.data_dir`, creating the directory if needed
    pub fn new(config: EngineConfig) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;
        Ok(Self {
            config,
            tables: DashMap::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register and persist a new, empty table.
    ///
    /// Fails with `TableExists` if the name is taken in memory or on disk.
    pub fn create_table(&self, schema: TableSchema) -> Result<Arc<Table>> {
        validate_name("table", &schema.name)?;
        for col in &schema.columns {
            validate_name("column", &col.name)?;
        }

        let table = Arc::new(Table::new(schema)?);
        let name = table.name().to_string();

        match self.tables.entry(name.clone()) {
            Entry::Occupied(_) => return Err(DbError::TableExists(name)),
            Entry::Vacant(slot) => {
                if storage::table_file_exists(&name, &self.config) {
                    return Err(DbError::TableExists(name));
                }
                slot.insert(Arc::clone(&table));
            }
        }

        if let Err(e) = storage::save_table(&table, &self.config) {
            self.tables.remove(&name);
            return Err(e);
        }

        tracing::info!(table = %name, columns = table.schema().column_count(), "table created");
        Ok(table)
    }

    /// Resolve a table, loading it from disk on first use
    pub fn get_table(&self, name: &str) -> Result<Arc<Table>> {
        if let Some(table) = self.tables.get(name) {
            return Ok(Arc::clone(table.value()));
        }

        // file I/O happens outside the shard lock; if two callers race, the
        // first copy inserted wins and the other is dropped
        let loaded = Arc::new(storage::load_table(name, &self.config)?);
        let table = Arc::clone(self.tables.entry(name.to_string()).or_insert(loaded).value());
        Ok(table)
    }

    /// Persist the current contents of `table`
    pub fn save(&self, table: &Table) -> Result<()> {
        storage::save_table(table, &self.config)
    }

    /// Whether the table is loaded or has a file on disk
    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.contains_key(name) || storage::table_file_exists(name, &self.config)
    }

    /// Loaded and persisted table names, sorted
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let mut names = storage::list_table_files(&self.config)?;
        names.extend(self.tables.iter().map(|e| e.key().clone()));
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Number of tables currently held in memory
    pub fn loaded_count(&self) -> usize {
        self.tables.len()
    }
}

/// Names become file names and take part in `table.column` resolution,
/// so only `[A-Za-z0-9_]` is accepted and the first character must not be a digit.
fn validate_name(kind: &str, name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(DbError::ConstraintViolation(format!("invalid {} name: {:?}", kind, name)))
    }
}
