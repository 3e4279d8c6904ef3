use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::{PgPool, Row};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::database::manager::DatabaseError;
use crate::database::QueryCounter;

/// Errors from fixture serialization and bulk load
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("fixture I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid fixture JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid table name: '{0}'")]
    InvalidTable(String),

    #[error("duplicate fixture row for table '{table}' pk {pk}")]
    DuplicatePk { table: String, pk: String },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// A table to dump, with the column holding its primary key.
///
/// Root tables key on `id`; subtype tables key on the column carrying the
/// shared primary key of their parent row (e.g. `account_id`).
#[derive(Debug, Clone)]
pub struct TableSpec {
    pub name: String,
    pub pk_column: String,
}

impl TableSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), pk_column: "id".to_string() }
    }

    pub fn with_pk(name: impl Into<String>, pk_column: impl Into<String>) -> Self {
        Self { name: name.into(), pk_column: pk_column.into() }
    }

    /// Parse `table` or `table:pk_column`.
    pub fn parse(s: &str) -> Self {
        match s.split_once(':') {
            Some((name, pk)) => Self::with_pk(name.trim(), pk.trim()),
            None => Self::new(s.trim()),
        }
    }
}

/// One row in a fixture file.
///
/// `pk` is carried outside `fields` so rows of subtype tables state the
/// shared primary key of their parent explicitly; `fields` still holds
/// every column, so a record loads without knowing which column was the
/// key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureRecord {
    pub table: String,
    pub pk: Value,
    pub fields: Map<String, Value>,
}

/// An ordered collection of fixture rows, serialized as a flat JSON array.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FixtureSet {
    pub records: Vec<FixtureRecord>,
}

impl FixtureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: FixtureRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Reject duplicate (table, pk) pairs.
    pub fn validate(&self) -> Result<(), FixtureError> {
        let mut seen = HashSet::new();
        for record in &self.records {
            let key = (record.table.clone(), record.pk.to_string());
            if !seen.insert(key) {
                return Err(FixtureError::DuplicatePk {
                    table: record.table.clone(),
                    pk: record.pk.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Stably order records for loading: tables named in `order` first, in
    /// that order (parents before their subtype tables), then everything
    /// else in input order.
    pub fn sort_for_load(&mut self, order: &[&str]) {
        self.records.sort_by_key(|record| {
            order
                .iter()
                .position(|t| *t == record.table)
                .unwrap_or(usize::MAX)
        });
    }

    /// Record counts per table, in first-seen order.
    pub fn counts(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for record in &self.records {
            match counts.iter_mut().find(|(table, _)| *table == record.table) {
                Some((_, n)) => *n += 1,
                None => counts.push((record.table.clone(), 1)),
            }
        }
        counts
    }

    pub fn from_json(value: Value) -> Result<Self, FixtureError> {
        let set: FixtureSet = serde_json::from_value(value)?;
        set.validate()?;
        Ok(set)
    }

    pub fn to_json(&self) -> Result<Value, FixtureError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn read_file(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let content = fs::read_to_string(path)?;
        let set: FixtureSet = serde_json::from_str(&content)?;
        set.validate()?;
        Ok(set)
    }

    pub fn write_file(&self, path: impl AsRef<Path>) -> Result<(), FixtureError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// Quote SQL identifier to prevent injection
fn quote_identifier(name: &str) -> Result<String, FixtureError> {
    if name.is_empty() || name.contains('\0') {
        return Err(FixtureError::InvalidTable(name.to_string()));
    }
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

/// Dump whole tables as a fixture set. One SELECT per table, with rows
/// serialized server-side via `row_to_json`.
pub async fn dump_tables(
    pool: &PgPool,
    counter: &QueryCounter,
    tables: &[TableSpec],
) -> Result<FixtureSet, FixtureError> {
    let mut set = FixtureSet::new();

    for table in tables {
        let quoted = quote_identifier(&table.name)?;
        let sql = format!("SELECT row_to_json(t) AS row FROM {} t", quoted);

        counter.record();
        let rows = sqlx::query(&sql)
            .fetch_all(pool)
            .await
            .map_err(DatabaseError::from)?;

        for row in rows {
            let value: Value = row.try_get("row").map_err(DatabaseError::from)?;
            let Value::Object(fields) = value else {
                continue;
            };
            let pk = fields.get(&table.pk_column).cloned().unwrap_or(Value::Null);
            set.push(FixtureRecord { table: table.name.clone(), pk, fields });
        }

        tracing::debug!("dumped table {}", table.name);
    }

    set.validate()?;
    Ok(set)
}

/// Load a fixture set inside one transaction, parents before children.
/// Returns the number of inserted rows.
pub async fn load_set(
    pool: &PgPool,
    counter: &QueryCounter,
    set: &FixtureSet,
    order: &[&str],
) -> Result<u64, FixtureError> {
    set.validate()?;

    let mut ordered = set.clone();
    ordered.sort_for_load(order);

    let mut tx = pool.begin().await.map_err(DatabaseError::from)?;
    let mut inserted = 0u64;

    for record in &ordered.records {
        let quoted = quote_identifier(&record.table)?;
        let sql = format!(
            "INSERT INTO {} SELECT * FROM jsonb_populate_record(NULL::{}, $1)",
            quoted, quoted
        );

        counter.record();
        sqlx::query(&sql)
            .bind(Value::Object(record.fields.clone()))
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::from)?;
        inserted += 1;
    }

    tx.commit().await.map_err(DatabaseError::from)?;
    Ok(inserted)
}
