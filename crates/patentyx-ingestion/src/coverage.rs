//! Coverage of a canonical document list by what has been ingested.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageReport {
    /// Distinct canonical doc numbers.
    pub canonical: usize,
    /// Canonical doc numbers found in storage.
    pub present: usize,
    /// Canonical doc numbers absent from storage, sorted.
    pub missing: Vec<String>,
    pub coverage_ratio: f64,
}

impl CoverageReport {
    /// `present / canonical`, defined as 1.0 for an empty canonical list.
    pub fn coverage_ratio(&self) -> f64 {
        self.coverage_ratio
    }
}

fn normalised<'a>(docs: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
    docs.into_iter()
        .map(|d| d.trim().to_uppercase())
        .filter(|d| !d.is_empty())
        .collect()
}

/// Compare doc numbers case- and whitespace-insensitively.
pub fn summarise_coverage<'a, C, P>(canonical: C, present: P) -> CoverageReport
where
    C: IntoIterator<Item = &'a str>,
    P: IntoIterator<Item = &'a str>,
{
    let canonical = normalised(canonical);
    let present = normalised(present);

    let found = canonical.intersection(&present).count();
    let missing: Vec<String> = canonical.difference(&present).cloned().collect();
    let coverage_ratio = if canonical.is_empty() {
        1.0
    } else {
        found as f64 / canonical.len() as f64
    };

    CoverageReport {
        canonical: canonical.len(),
        present: found,
        missing,
        coverage_ratio,
    }
}

/// Read a doc-number list from any of the accepted layouts: a JSON array of
/// strings, a JSON array of objects with `doc_number`/`publication_number`,
/// a JSON object (its values), JSON lines, or newline-delimited text.
pub fn load_doc_numbers(content: &str) -> Vec<String> {
    let content = content.trim();
    if content.is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<Value>(content) {
        Ok(Value::Array(items)) => items.iter().filter_map(list_entry).collect(),
        Ok(Value::Object(map)) => map.values().filter_map(scalar).collect(),
        _ => content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .filter_map(line_entry)
            .collect(),
    }
}

fn line_entry(line: &str) -> Option<String> {
    match serde_json::from_str::<Value>(line) {
        Ok(value @ (Value::Object(_) | Value::String(_))) => list_entry(&value),
        _ => Some(line.to_string()),
    }
}

fn list_entry(item: &Value) -> Option<String> {
    match item {
        Value::Object(obj) => ["doc_number", "publication_number"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(scalar)),
        other => scalar(other),
    }
}

fn scalar(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coverage_ratio_and_missing() {
        let report = summarise_coverage(["US1", "WO2"], ["us1"]);
        assert_eq!(report.canonical, 2);
        assert_eq!(report.present, 1);
        assert_eq!(report.missing, vec!["WO2"]);
        assert!((report.coverage_ratio() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_normalises_and_ignores_blanks() {
        let report = summarise_coverage([" ep1 ", "EP1", "", "us2"], ["EP1 ", "JP9"]);
        assert_eq!(report.canonical, 2);
        assert_eq!(report.present, 1);
        assert_eq!(report.missing, vec!["US2"]);
    }

    #[test]
    fn test_empty_canonical_is_full_coverage() {
        let report = summarise_coverage(std::iter::empty(), ["US1"]);
        assert_eq!(report.canonical, 0);
        assert_eq!(report.coverage_ratio(), 1.0);
    }

    #[test]
    fn test_load_all_layouts() {
        assert_eq!(load_doc_numbers(r#"["US1", " WO2 ", ""]"#), vec!["US1", "WO2"]);
        assert_eq!(
            load_doc_numbers(r#"[{"doc_number": "US1"}, {"publication_number": "EP3"}, {}]"#),
            vec!["US1", "EP3"]
        );
        let mut from_map = load_doc_numbers(r#"{"a": "US1", "b": "JP4"}"#);
        from_map.sort();
        assert_eq!(from_map, vec!["JP4", "US1"]);
        assert_eq!(load_doc_numbers("US1\n\n  WO2  \n"), vec!["US1", "WO2"]);
        assert_eq!(
            load_doc_numbers("{\"doc_number\": \"US1\"}\n{\"publication_number\": \"WO2\"}\n12345\n"),
            vec!["US1", "WO2", "12345"]
        );
        assert!(load_doc_numbers("   ").is_empty());
    }
}
