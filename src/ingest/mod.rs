//! Import parsing: datapoint records from JSON, JSONL, and CSV sources.

pub mod fetch;

use std::collections::HashMap;
use std::io::{BufReader, Cursor};
use std::path::Path;

use anyhow::{Context as _, Result, bail};
use serde_json::Value as Json;

use crate::consts::IMPORT_CHUNK;
use crate::progress::Progress;
use crate::store::sqlite::SqliteStore;
use crate::store::{Dataset, ImportSummary};

/// Parse raw records according to the source's file extension.
pub fn records_from_bytes(bytes: &[u8], filename: &str) -> Result<Vec<Json>> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "jsonl" => read_jsonl(bytes),
        "json" => read_json(bytes),
        "csv" => read_csv(bytes),
        "" => bail!("cannot tell the format of {filename} (expected .json, .jsonl, or .csv)"),
        other => bail!("unsupported import format .{other} (expected .json, .jsonl, or .csv)"),
    }
}

/// One JSON value per line.
pub fn read_jsonl(bytes: &[u8]) -> Result<Vec<Json>> {
    let buf = BufReader::new(Cursor::new(bytes));
    let reader = serde_jsonlines::JsonLinesReader::new(buf);
    reader
        .read_all::<Json>()
        .collect::<std::io::Result<Vec<_>>>()
        .context("error parsing json lines")
}

/// A single top-level array of records.
pub fn read_json(bytes: &[u8]) -> Result<Vec<Json>> {
    let content: Json = serde_json::from_slice(bytes)?;
    match content {
        Json::Array(values) => Ok(values),
        _ => bail!("the file must contain an array of json objects"),
    }
}

/// Header row required; every record becomes a flat string map.
/// Unreadable rows are logged and skipped rather than failing the import.
pub fn read_csv(bytes: &[u8]) -> Result<Vec<Json>> {
    let mut reader = csv::Reader::from_reader(bytes);
    let headers = reader.headers()?.clone();
    let mut result = Vec::new();
    for record in reader.records() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                log::error!("couldn't read line in CSV, {e}");
                continue;
            }
        };
        let mut row = HashMap::new();
        for (i, header) in headers.iter().enumerate() {
            let value = record.get(i).unwrap_or_default();
            row.insert(header.to_string(), value.to_string());
        }
        result.push(serde_json::to_value(row)?);
    }
    Ok(result)
}

/// Load an import source from disk or over HTTP.
pub async fn load_source(source: &str) -> Result<(Vec<u8>, String)> {
    if fetch::is_url(source) {
        fetch::fetch_bytes(source).await
    } else {
        let bytes = tokio::fs::read(source)
            .await
            .with_context(|| format!("failed to read {source}"))?;
        Ok((bytes, source.to_string()))
    }
}

/// Import a local file or URL into a dataset, showing progress.
pub async fn import_source(
    store: &SqliteStore,
    dataset: &Dataset,
    source: &str,
) -> Result<ImportSummary> {
    let (bytes, filename) = load_source(source).await?;
    let records = records_from_bytes(&bytes, &filename)?;

    let progress = Progress::start("importing");
    let mut summary = ImportSummary::default();
    for chunk in records.chunks(IMPORT_CHUNK) {
        match store.insert_datapoints(dataset.id, chunk) {
            Ok(batch) => summary.merge(batch),
            Err(e) => {
                progress.stop().await;
                return Err(e);
            }
        }
        progress.set(summary.inserted + summary.skipped);
    }
    progress.stop().await;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn jsonl_parses_one_record_per_line() {
        let bytes = b"{\"data\": 1}\n{\"data\": 2}\n";
        let records = read_jsonl(bytes).unwrap();
        assert_eq!(records, vec![json!({"data": 1}), json!({"data": 2})]);
    }

    #[test]
    fn jsonl_rejects_malformed_lines() {
        assert!(read_jsonl(b"{\"data\": 1}\nnot json\n").is_err());
    }

    #[test]
    fn json_requires_top_level_array() {
        let records = read_json(b"[{\"a\": 1}, 2]").unwrap();
        assert_eq!(records.len(), 2);

        assert!(read_json(b"{\"a\": 1}").is_err());
        assert!(read_json(b"not json").is_err());
    }

    #[test]
    fn csv_maps_headers_to_string_values() {
        let bytes = b"question,answer\n2+2?,4\nname?,strata\n";
        let records = read_csv(bytes).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], json!({"question": "2+2?", "answer": "4"}));
    }

    #[test]
    fn csv_ragged_rows_are_skipped() {
        // The csv crate flags ragged rows as errors; they are skipped.
        let bytes = b"a,b\n1,2\nonly_one\n3,4\n";
        let records = read_csv(bytes).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1], json!({"a": "3", "b": "4"}));
    }

    #[test]
    fn extension_dispatch() {
        assert!(records_from_bytes(b"[]", "x.json").is_ok());
        assert!(records_from_bytes(b"", "x.jsonl").is_ok());
        assert!(records_from_bytes(b"a\n1\n", "x.CSV").is_ok());
        assert!(records_from_bytes(b"[]", "x.parquet").is_err());
        assert!(records_from_bytes(b"[]", "noextension").is_err());
    }
}
