//! Table files
//!
//! One JSON document per table at `<data_dir>/<name>.json`:
//!
//! ```text
//! { "name": ..., "columns": [{name, type, is_primary, is_unique}],
//!   "rows": [{"values": [{"type": "INT", "value": 10}, ...]}],
//!   "foreign_keys": [...] }
//! ```
//!
//! # Atomic save
//!
//! 1. Create a fresh `tmp-*.json` in the data directory
//! 2. Serialize, flush, fsync the temp file
//! 3. rename(temp → `<name>.json`)  ← commit point
//! 4. fsync the data directory
//!
//! A failure before step 3 drops (and deletes) the temp file; the previous table
//! file is never touched. `DurabilityLevel::NoSync` skips both fsyncs.

use crate::config::EngineConfig;
use crate::error::{DbError, Result};
use crate::storage::Table;
use crate::types::{ColumnDef, ColumnType, ForeignKeyDef, Row, TableSchema, Value};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

const TABLE_FILE_EXT: &str = "json";
const TEMP_PREFIX: &str = "tmp-";

#[derive(Debug, Serialize, Deserialize)]
struct TableFile {
    name: String,
    columns: Vec<ColumnDef>,
    #[serde(default)]
    rows: Vec<StoredRow>,
    #[serde(default)]
    foreign_keys: Vec<ForeignKeyDef>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredRow {
    values: Vec<StoredValue>,
}

/// Tagged cell. `value` stays loosely typed so numbers written as floats
/// (`10.0`) still load into `INT` columns.
#[derive(Debug, Serialize, Deserialize)]
struct StoredValue {
    #[serde(rename = "type")]
    value_type: ColumnType,
    value: serde_json::Value,
}

impl From<&Value> for StoredValue {
    fn from(v: &Value) -> Self {
        match v {
            Value::Integer(i) => StoredValue {
                value_type: ColumnType::Integer,
                value: serde_json::Value::from(*i),
            },
            Value::Text(s) => StoredValue {
                value_type: ColumnType::Text,
                value: serde_json::Value::from(s.as_str()),
            },
        }
    }
}

impl StoredValue {
    fn into_value(self) -> Result<Value> {
        match (self.value_type, self.value) {
            (ColumnType::Integer, serde_json::Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    return Ok(Value::Integer(i));
                }
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
                        Ok(Value::Integer(f as i64))
                    }
                    _ => Err(DbError::Corruption(format!("invalid INT value: {}", n))),
                }
            }
            (ColumnType::Text, serde_json::Value::String(s)) => Ok(Value::Text(s)),
            (t, other) => Err(DbError::Corruption(format!(
                "value {} does not match declared type {}",
                other, t
            ))),
        }
    }
}

/// Snapshot `table` and atomically replace its file.
///
/// Saves of the same table are serialized so an older snapshot never lands
/// after a newer one.
pub fn save_table(table: &Table, config: &EngineConfig) -> Result<()> {
    let _guard = table.save_guard();

    let schema = table.schema();
    let file = TableFile {
        name: schema.name.clone(),
        columns: schema.columns.clone(),
        rows: table
            .snapshot()
            .iter()
            .map(|row| StoredRow {
                values: row.iter().map(StoredValue::from).collect(),
            })
            .collect(),
        foreign_keys: schema.foreign_keys.clone(),
    };

    let path = config.table_path(&schema.name);
    write_atomic(&config.data_dir, &path, config.durability.requires_sync(), |w| {
        serde_json::to_writer_pretty(w, &file)?;
        Ok(())
    })?;

    tracing::debug!(table = %schema.name, rows = file.rows.len(), path = %path.display(), "table saved");
    Ok(())
}

/// Write through a fresh temp file in `dir`, then rename it over `path`
pub(crate) fn write_atomic<F>(dir: &Path, path: &Path, sync: bool, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<&File>) -> Result<()>,
{
    fs::create_dir_all(dir)?;

    let temp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(&format!(".{}", TABLE_FILE_EXT))
        .tempfile_in(dir)?;

    {
        let mut writer = BufWriter::new(temp.as_file());
        write(&mut writer)?;
        writer.flush()?;
    }

    if sync {
        temp.as_file().sync_all()?;
    }

    temp.persist(path).map_err(|e| DbError::Io(e.error))?;

    if sync {
        sync_dir(dir)?;
    }

    Ok(())
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    use std::os::unix::io::AsRawFd;

    let dir = File::open(dir)?;
    let rc = unsafe { libc::fsync(dir.as_raw_fd()) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error().into());
    }
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}

/// Load `<data_dir>/<name>.json`, validate it, and rebuild every index
pub fn load_table(name: &str, config: &EngineConfig) -> Result<Table> {
    let path = config.table_path(name);
    let file = File::open(&path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DbError::TableNotFound(name.to_string()),
        _ => DbError::Io(e),
    })?;

    let stored: TableFile = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| DbError::Corruption(format!("{}: {}", path.display(), e)))?;

    if stored.name != name {
        return Err(DbError::Corruption(format!(
            "{} holds table {}",
            path.display(),
            stored.name
        )));
    }

    let mut schema = TableSchema::new(stored.name, stored.columns);
    schema.foreign_keys = stored.foreign_keys;
    schema
        .validate()
        .map_err(|e| DbError::Corruption(format!("{}: {}", path.display(), e)))?;

    let rows = stored
        .rows
        .into_iter()
        .map(|r| {
            r.values
                .into_iter()
                .map(StoredValue::into_value)
                .collect::<Result<Row>>()
        })
        .collect::<Result<Vec<Row>>>()?;

    let table = Table::from_rows(schema, rows)?;
    tracing::info!(table = %name, rows = table.len(), "table loaded from disk");
    Ok(table)
}

pub fn table_file_exists(name: &str, config: &EngineConfig) -> bool {
    config.table_path(name).is_file()
}

/// Names of all persisted tables in the data directory (temp files excluded)
pub fn list_table_files(config: &EngineConfig) -> Result<Vec<String>> {
    let entries = match fs::read_dir(&config.data_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut names = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(TABLE_FILE_EXT) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            if !stem.starts_with(TEMP_PREFIX) {
                names.push(stem.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}
