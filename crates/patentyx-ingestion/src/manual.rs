//! Caller-supplied records and raw snapshots.

use std::path::Path;

use patentyx_common::{PatentyxError, Result};
use serde_json::Value;
use tracing::info;

use crate::models::RawRecord;

fn malformed(location: String, reason: impl std::fmt::Display) -> PatentyxError {
    PatentyxError::MalformedManualRecord {
        location,
        reason: reason.to_string(),
    }
}

/// Load supplemental raw records.
///
/// Accepts a JSON array, a single JSON object, or JSON Lines. A missing file
/// or any record that does not deserialise is an error; an empty file yields
/// no records.
pub fn load_manual_records(path: &Path) -> Result<Vec<RawRecord>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| malformed(path.display().to_string(), e))?;
    let records = parse_manual_records(&content, &path.display().to_string())?;
    info!(n = records.len(), path = %path.display(), "Loaded manual records");
    Ok(records)
}

/// Parse the body of a manual record file; `origin` labels error locations.
pub fn parse_manual_records(content: &str, origin: &str) -> Result<Vec<RawRecord>> {
    let content = content.trim();
    if content.is_empty() {
        return Ok(Vec::new());
    }

    if let Ok(payload) = serde_json::from_str::<Value>(content) {
        let items = match payload {
            Value::Array(items) => items,
            other => vec![other],
        };
        return items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                serde_json::from_value(item).map_err(|e| malformed(format!("{origin}[{i}]"), e))
            })
            .collect();
    }

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line.trim()).map_err(|e| malformed(format!("{origin}:{}", n + 1), e))
        })
        .collect()
}

/// Write records as pretty-printed JSON, creating parent directories.
pub fn persist_raw_snapshot(path: &Path, records: &[RawRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(records)?;
    std::fs::write(path, json)?;
    info!(path = %path.display(), n = records.len(), "Persisted raw snapshot");
    Ok(())
}
