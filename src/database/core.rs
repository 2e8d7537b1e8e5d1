//! Engine structure and statement entry point

use crate::cancel::Cancellation;
use crate::catalog::TableRegistry;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::sql::{self, QueryExecutor, QueryResult};

/// Engine instance
///
/// Safe to share between threads (`Arc<Engine>`); every statement locks only the
/// tables it touches.
pub struct Engine {
    /// Table registry (catalog)
    pub(crate) registry: TableRegistry,
}

impl Engine {
    /// Open an engine over `config.data_dir`, creating the directory if needed.
    ///
    /// Persisted tables are not read here; each one is loaded on first reference.
    ///
    /// # Example
    /// ```ignore
    /// let engine = Engine::open(EngineConfig::new("data"))?;
    /// engine.execute("CREATE TABLE items (id INT PRIMARY KEY, name TEXT)", &Cancellation::new())?;
    /// ```
    pub fn open(config: EngineConfig) -> Result<Self> {
        tracing::info!(
            data_dir = %config.data_dir.display(),
            durability = config.durability.description(),
            "opening engine"
        );
        Ok(Self {
            registry: TableRegistry::new(config)?,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        self.registry.config()
    }

    /// Parse and run one statement.
    ///
    /// `cancel` is checked before anything starts; scans and joins poll it per row.
    pub fn execute(&self, sql: &str, cancel: &Cancellation) -> Result<QueryResult> {
        cancel.check()?;
        let statement = sql::parse(sql)?;
        QueryExecutor::new(&self.registry).execute(statement, cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::types::Value;
    use tempfile::tempdir;

    #[test]
    fn test_scenario_items() {
        let dir = tempdir().unwrap();
        let engine = Engine::open(EngineConfig::for_testing(dir.path())).unwrap();
        let cancel = Cancellation::new();

        engine
            .execute("CREATE TABLE items (id INT PRIMARY KEY, name TEXT)", &cancel)
            .unwrap();
        engine.execute("INSERT INTO items VALUES (10, 'Book')", &cancel).unwrap();
        let result = engine.execute("SELECT * FROM items WHERE id = 10", &cancel).unwrap();

        let (columns, rows) = result.select_rows().unwrap();
        assert_eq!(columns, ["id".to_string(), "name".to_string()]);
        assert_eq!(rows, [vec![Value::Integer(10), Value::from("Book")]]);
    }

    #[test]
    fn test_open_creates_data_dir() {
        let dir = tempdir().unwrap();
        let data_dir = dir.path().join("nested").join("data");
        let engine = Engine::open(EngineConfig::for_testing(&data_dir)).unwrap();
        assert!(data_dir.is_dir());
        assert_eq!(engine.config().data_dir, data_dir);
    }

    #[test]
    fn test_execute_checks_cancellation_first() {
        let dir = tempdir().unwrap();
        let engine = Engine::open(EngineConfig::for_testing(dir.path())).unwrap();
        let cancel = Cancellation::new();
        cancel.cancel();

        let err = engine
            .execute("CREATE TABLE t (id INT PRIMARY KEY)", &cancel)
            .unwrap_err();
        assert!(matches!(err, DbError::Cancelled));
        assert!(!dir.path().join("t.json").exists());
    }
}
