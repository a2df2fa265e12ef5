//! Dataset storage: domain records and the queryable backend seam.

pub mod sqlite;

use std::collections::HashMap;

use anyhow::{Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use uuid::Uuid;

use crate::query::{Filter, Row, SelectQuery, TableRef, Value};

/// A named collection of datapoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub id: Uuid,
    pub name: String,
    pub created_at: String,
}

/// A single record in a dataset: the payload itself, an optional expected
/// output, and free-form metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Datapoint {
    pub id: Uuid,
    pub dataset_id: Uuid,
    pub data: Json,
    pub target: Option<Json>,
    pub metadata: HashMap<String, Json>,
}

impl Datapoint {
    /// Normalize one raw import record.
    ///
    /// An object carrying only `data`/`target`/`metadata`/`id` keys maps
    /// field-by-field. Any other object is wrapped whole into `data`.
    /// A `null` record is dropped; a bare scalar or array wraps into
    /// `data`.
    pub fn try_from_raw(dataset_id: Uuid, raw: &Json) -> Option<Self> {
        match raw {
            Json::Object(obj) => {
                let id = obj
                    .get("id")
                    .and_then(|v| v.as_str())
                    .and_then(|s| Uuid::parse_str(s).ok())
                    .unwrap_or_else(Uuid::new_v4);
                let known_keys = obj
                    .keys()
                    .all(|k| matches!(k.as_str(), "data" | "target" | "metadata" | "id"));
                match obj.get("data") {
                    Some(data) if known_keys => {
                        let metadata = obj
                            .get("metadata")
                            .cloned()
                            .and_then(|m| serde_json::from_value(m).ok())
                            .unwrap_or_default();
                        Some(Self {
                            id,
                            dataset_id,
                            data: data.clone(),
                            target: obj.get("target").cloned(),
                            metadata,
                        })
                    }
                    _ => Some(Self {
                        id,
                        dataset_id,
                        data: raw.clone(),
                        target: None,
                        metadata: HashMap::new(),
                    }),
                }
            }
            Json::Null => None,
            other => Some(Self {
                id: Uuid::new_v4(),
                dataset_id,
                data: other.clone(),
                target: None,
                metadata: HashMap::new(),
            }),
        }
    }

    /// Rebuild a datapoint from a queried row.
    pub fn from_row(row: &Row) -> Result<Self> {
        let text = |name: &str| -> Result<&str> {
            match row.get(name) {
                Some(Value::Text(s)) => Ok(s),
                other => bail!("column {name} missing or not text: {other:?}"),
            }
        };

        let id = Uuid::parse_str(text("id")?)?;
        let dataset_id = Uuid::parse_str(text("dataset_id")?)?;
        let data = serde_json::from_str(text("data")?)?;
        let target = match row.get("target") {
            Some(Value::Text(s)) => Some(serde_json::from_str(s)?),
            _ => None,
        };
        let metadata = match row.get("metadata") {
            Some(Value::Text(s)) => serde_json::from_str(s).unwrap_or_default(),
            _ => HashMap::new(),
        };

        Ok(Self {
            id,
            dataset_id,
            data,
            target,
            metadata,
        })
    }
}

/// Count summary from one import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: u64,
    /// Records that were null, or whose content already exists in the
    /// dataset.
    pub skipped: u64,
}

impl ImportSummary {
    pub fn merge(&mut self, other: ImportSummary) {
        self.inserted += other.inserted;
        self.skipped += other.skipped;
    }
}

/// The narrow queryable-table capability that paginated queries run
/// against. One implementation per concrete storage engine.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Materialize the filtered base relation and return matching rows,
    /// honoring order, limit, and offset.
    async fn select(&self, query: &SelectQuery) -> Result<Vec<Row>>;

    /// Count rows of the same relation, ignoring order and paging.
    async fn count(&self, query: &SelectQuery) -> Result<u64>;

    /// Whether any row of `table` matches `filters`.
    async fn exists(&self, table: &TableRef, filters: &[Filter]) -> Result<bool>;
}

/// Handle to the datapoints table.
pub fn datapoints_table() -> TableRef {
    TableRef::new("datapoints").expect("static table name")
}

/// Handle to the datasets table.
pub fn datasets_table() -> TableRef {
    TableRef::new("datasets").expect("static table name")
}
