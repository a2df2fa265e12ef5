//! SQLite-backed dataset store.

use std::sync::Mutex;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use log::debug;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, params, params_from_iter};
use serde_json::Value as Json;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::{Backend, Datapoint, Dataset, ImportSummary};
use crate::query::{Filter, Row, SelectQuery, TableRef, Value};

/// SQLite implementation of the queryable backend, plus the dataset and
/// datapoint operations built on top of it.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
            CREATE TABLE IF NOT EXISTS datasets (
                id         TEXT PRIMARY KEY,
                name       TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE TABLE IF NOT EXISTS datapoints (
                id           TEXT PRIMARY KEY,
                dataset_id   TEXT NOT NULL REFERENCES datasets(id) ON DELETE CASCADE,
                data         TEXT NOT NULL,
                target       TEXT,
                metadata     TEXT NOT NULL DEFAULT '{}',
                content_hash TEXT NOT NULL,
                created_at   TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE (dataset_id, content_hash)
            );
            CREATE INDEX IF NOT EXISTS idx_datapoints_dataset
                ON datapoints (dataset_id);",
        )
        .context("failed to create schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    /// Create a dataset, or return the existing one with that name.
    pub fn create_dataset(&self, name: &str) -> Result<Dataset> {
        if let Some(existing) = self.dataset(name)? {
            return Ok(existing);
        }
        let id = Uuid::new_v4();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO datasets (id, name) VALUES (?1, ?2)",
            params![id.to_string(), name],
        )?;
        let created_at = conn.query_row(
            "SELECT created_at FROM datasets WHERE id = ?1",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(Dataset {
            id,
            name: name.to_string(),
            created_at,
        })
    }

    /// Look up a dataset by name.
    pub fn dataset(&self, name: &str) -> Result<Option<Dataset>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT id, name, created_at FROM datasets WHERE name = ?1")?;
        let mut rows = stmt.query([name])?;
        match rows.next()? {
            Some(row) => Ok(Some(dataset_from_sql(row)?)),
            None => Ok(None),
        }
    }

    /// All datasets, by name.
    pub fn datasets(&self) -> Result<Vec<Dataset>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT id, name, created_at FROM datasets ORDER BY name ASC")?;
        let datasets = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|(id, name, created_at)| {
                Ok(Dataset {
                    id: Uuid::parse_str(&id)?,
                    name,
                    created_at,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(datasets)
    }

    /// Number of datapoints in a dataset.
    pub fn datapoint_count(&self, dataset_id: Uuid) -> Result<u64> {
        let conn = self.conn.lock().unwrap();
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM datapoints WHERE dataset_id = ?1",
            [dataset_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    /// Number of datapoints across all datasets.
    pub fn total_datapoints(&self) -> Result<u64> {
        let conn = self.conn.lock().unwrap();
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM datapoints", [], |row| row.get(0))?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    /// Delete a dataset and (by cascade) its datapoints.
    /// Returns false if no dataset had that name.
    pub fn delete_dataset(&self, name: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM datasets WHERE name = ?1", [name])?;
        Ok(deleted > 0)
    }

    /// Normalize and insert raw records into a dataset.
    ///
    /// Null records and records whose content hash already exists in the
    /// dataset count as skipped.
    pub fn insert_datapoints(&self, dataset_id: Uuid, records: &[Json]) -> Result<ImportSummary> {
        let mut summary = ImportSummary::default();
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "INSERT OR IGNORE INTO datapoints
                (id, dataset_id, data, target, metadata, content_hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for raw in records {
            let Some(dp) = Datapoint::try_from_raw(dataset_id, raw) else {
                summary.skipped += 1;
                continue;
            };
            let data = dp.data.to_string();
            let target = dp.target.as_ref().map(Json::to_string);
            let metadata = serde_json::to_string(&dp.metadata)?;
            let hash = content_hash(&data, target.as_deref(), &metadata);
            let inserted = stmt.execute(params![
                dp.id.to_string(),
                dataset_id.to_string(),
                data,
                target,
                metadata,
                hash,
            ])?;
            if inserted == 0 {
                summary.skipped += 1;
            } else {
                summary.inserted += 1;
            }
        }
        debug!(
            "insert into {dataset_id}: {} new, {} skipped",
            summary.inserted, summary.skipped
        );
        Ok(summary)
    }
}

#[async_trait]
impl Backend for SqliteStore {
    async fn select(&self, query: &SelectQuery) -> Result<Vec<Row>> {
        let (sql, bindings) = build_query(query, QueryShape::Page)?;
        debug!("select: {sql}");
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let names: Vec<String> = stmt
            .column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        let rows = stmt
            .query_map(params_from_iter(bindings), |sql_row| {
                let mut row = Row::default();
                for (i, name) in names.iter().enumerate() {
                    row.push(name.clone(), from_sql_ref(sql_row.get_ref(i)?));
                }
                Ok(row)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    async fn count(&self, query: &SelectQuery) -> Result<u64> {
        let (sql, bindings) = build_query(query, QueryShape::Count)?;
        debug!("count: {sql}");
        let conn = self.conn.lock().unwrap();
        let n: i64 = conn.query_row(&sql, params_from_iter(bindings), |row| row.get(0))?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    async fn exists(&self, table: &TableRef, filters: &[Filter]) -> Result<bool> {
        let mut bindings = Vec::new();
        let mut sql = format!("SELECT EXISTS (SELECT 1 FROM {}", table.name());
        if !filters.is_empty() {
            sql.push_str(" WHERE ");
            push_filters(&mut sql, filters, &mut bindings);
        }
        sql.push(')');
        debug!("exists: {sql}");
        let conn = self.conn.lock().unwrap();
        let n: i64 = conn.query_row(&sql, params_from_iter(bindings), |row| row.get(0))?;
        Ok(n != 0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum QueryShape {
    Page,
    Count,
}

/// Render a `SelectQuery` as a CTE-scoped SQL statement.
///
/// The CTE materializes the base relation (table columns + computed
/// columns under base filters only); additional filters, ordering, and
/// paging apply to the outer select. Filter values bind as parameters.
fn build_query(query: &SelectQuery, shape: QueryShape) -> Result<(String, Vec<SqlValue>)> {
    let mut bindings = Vec::new();
    let mut sql = String::from("WITH scope AS (SELECT t.*");
    for col in &query.additional_columns {
        sql.push_str(", ");
        sql.push_str(&col.expr);
        sql.push_str(" AS ");
        sql.push_str(col.alias.as_str());
    }
    sql.push_str(" FROM ");
    sql.push_str(query.table.name());
    sql.push_str(" t");
    if !query.base_filters.is_empty() {
        sql.push_str(" WHERE ");
        push_filters(&mut sql, &query.base_filters, &mut bindings);
    }
    sql.push_str(") SELECT ");
    sql.push_str(match shape {
        QueryShape::Page => "*",
        QueryShape::Count => "COUNT(*)",
    });
    sql.push_str(" FROM scope");
    if !query.filters.is_empty() {
        sql.push_str(" WHERE ");
        push_filters(&mut sql, &query.filters, &mut bindings);
    }
    if shape == QueryShape::Page {
        if let Some(order) = &query.order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(order.column.as_str());
            sql.push(' ');
            sql.push_str(order.direction.sql());
        }
        if let Some(limit) = query.limit {
            bindings.push(SqlValue::Integer(i64::from(limit)));
            sql.push_str(&format!(" LIMIT ?{}", bindings.len()));
        }
        if let Some(offset) = query.offset {
            let offset =
                i64::try_from(offset).context("page offset exceeds supported range")?;
            // SQLite requires a LIMIT clause before OFFSET.
            if query.limit.is_none() {
                sql.push_str(" LIMIT -1");
            }
            bindings.push(SqlValue::Integer(offset));
            sql.push_str(&format!(" OFFSET ?{}", bindings.len()));
        }
    }
    Ok((sql, bindings))
}

fn push_filters(sql: &mut String, filters: &[Filter], bindings: &mut Vec<SqlValue>) {
    for (i, filter) in filters.iter().enumerate() {
        if i > 0 {
            sql.push_str(" AND ");
        }
        sql.push_str(filter.column.as_str());
        sql.push(' ');
        sql.push_str(filter.op.sql());
        if filter.op.takes_value() {
            bindings.push(to_sql_value(&filter.value));
            sql.push_str(&format!(" ?{}", bindings.len()));
        }
    }
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(n) => SqlValue::Integer(*n),
        Value::Real(n) => SqlValue::Real(*n),
        Value::Text(s) => SqlValue::Text(s.clone()),
    }
}

fn from_sql_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::Integer(n),
        ValueRef::Real(n) => Value::Real(n),
        ValueRef::Text(s) => Value::Text(String::from_utf8_lossy(s).into_owned()),
        ValueRef::Blob(b) => Value::Text(format!("<{} bytes>", b.len())),
    }
}

fn dataset_from_sql(row: &rusqlite::Row<'_>) -> Result<Dataset> {
    let id: String = row.get(0)?;
    Ok(Dataset {
        id: Uuid::parse_str(&id)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
    })
}

/// Stable hash of a datapoint's normalized content, for import dedup.
fn content_hash(data: &str, target: Option<&str>, metadata: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    hasher.update([0]);
    if let Some(target) = target {
        hasher.update(target.as_bytes());
    }
    hasher.update([0]);
    hasher.update(metadata.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
