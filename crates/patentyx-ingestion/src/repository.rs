//! Persistence boundary for normalised records.
//!
//! The pipeline writes through [`PatentSink`]; storage engines live outside
//! this crate. [`MemoryRepository`] is the reference sink used by the CLI
//! and tests. It implements the upsert rules every sink is expected to
//! follow:
//! - scalar fields take the incoming value when present, else keep the stored one
//! - list fields are unioned and sorted
//! - dates keep the stored value when one exists
//! - `source` accumulates one ingestion event per upsert
//! - snippets are de-duplicated per document by [`snippet_hash`]

use std::collections::{BTreeMap, BTreeSet, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use patentyx_common::Result;
use serde::Serialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::models::{is_present, PatentRecord, SnippetPayload, SnippetSection};

/// Result of a document upsert.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DocumentUpsert {
    pub was_new: bool,
}

#[async_trait]
pub trait PatentSink: Send + Sync {
    async fn upsert_document(&self, record: &PatentRecord) -> Result<DocumentUpsert>;

    /// Store snippets for an already-upserted document; returns how many were new.
    async fn insert_snippets(&self, doc_number: &str, snippets: &[SnippetPayload]) -> Result<usize>;
}

/// SHA-256 hex of `"<section>:<trimmed text>"`.
pub fn snippet_hash(section: SnippetSection, text: &str) -> String {
    let digest = Sha256::digest(format!("{}:{}", section.as_str(), text.trim()).as_bytes());
    format!("{:x}", digest)
}

/// Upsert one record and its snippets.
///
/// Returns `Ok(None)` for a record without a doc number (skipped with a
/// warning), else the number of new snippets.
pub async fn persist_record(sink: &dyn PatentSink, record: &PatentRecord) -> Result<Option<usize>> {
    if record.doc_number.trim().is_empty() {
        warn!(provider = %record.provider, title = ?record.title, "Skipping record without document number");
        return Ok(None);
    }
    sink.upsert_document(record).await?;
    let snippets = sink.insert_snippets(&record.doc_number, &record.snippets).await?;
    Ok(Some(snippets))
}

/// Persist every record, stopping at the first sink error.
///
/// Returns `(documents, snippets)` written.
pub async fn ingest_records(sink: &dyn PatentSink, records: &[PatentRecord]) -> Result<(usize, usize)> {
    let mut documents = 0;
    let mut snippets = 0;
    for record in records {
        if let Some(n) = persist_record(sink, record).await? {
            documents += 1;
            snippets += n;
        }
    }
    Ok((documents, snippets))
}

// ── In-memory sink ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct StoredSnippet {
    pub hash: String,
    #[serde(flatten)]
    pub payload: SnippetPayload,
}

/// A stored document: the merged record (without snippets) plus its snippets.
#[derive(Debug, Clone, Serialize)]
pub struct StoredDocument {
    #[serde(flatten)]
    pub record: PatentRecord,
    #[serde(rename = "stored_snippets")]
    pub snippets: Vec<StoredSnippet>,
}

#[derive(Default)]
pub struct MemoryRepository {
    documents: RwLock<BTreeMap<String, StoredDocument>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, doc_number: &str) -> Option<StoredDocument> {
        self.documents.read().await.get(doc_number).cloned()
    }

    /// All documents ordered by doc number.
    pub async fn documents(&self) -> Vec<StoredDocument> {
        self.documents.read().await.values().cloned().collect()
    }

    pub async fn doc_numbers(&self) -> Vec<String> {
        self.documents.read().await.keys().cloned().collect()
    }
}

fn prefer_new(stored: &mut Option<String>, incoming: &Option<String>) {
    if is_present(incoming) {
        stored.clone_from(incoming);
    }
}

fn union_sorted(stored: &mut Vec<String>, incoming: &[String]) {
    if incoming.is_empty() {
        return;
    }
    let merged: BTreeSet<String> = stored.drain(..).chain(incoming.iter().cloned()).collect();
    *stored = merged.into_iter().collect();
}

fn ingestion_event(record: &PatentRecord) -> Value {
    json!({
        "timestamp": Utc::now().to_rfc3339(),
        "provider": record.provider,
        "source": record.source,
    })
}

fn merge_into(stored: &mut PatentRecord, incoming: &PatentRecord) {
    prefer_new(&mut stored.title, &incoming.title);
    prefer_new(&mut stored.abstract_text, &incoming.abstract_text);
    prefer_new(&mut stored.claims, &incoming.claims);
    prefer_new(&mut stored.description, &incoming.description);
    prefer_new(&mut stored.kind_code, &incoming.kind_code);
    prefer_new(&mut stored.family_id, &incoming.family_id);
    if !incoming.jurisdiction.is_empty() {
        stored.jurisdiction.clone_from(&incoming.jurisdiction);
    }

    union_sorted(&mut stored.assignees, &incoming.assignees);
    union_sorted(&mut stored.inventors, &incoming.inventors);
    union_sorted(&mut stored.cpc_codes, &incoming.cpc_codes);
    union_sorted(&mut stored.ipc_codes, &incoming.ipc_codes);
    union_sorted(&mut stored.priority_numbers, &incoming.priority_numbers);

    stored.filing_date = stored.filing_date.or(incoming.filing_date);
    stored.publication_date = stored.publication_date.or(incoming.publication_date);
    stored.grant_date = stored.grant_date.or(incoming.grant_date);
    stored.earliest_priority_date = stored.earliest_priority_date.or(incoming.earliest_priority_date);
    stored.estimated_expiration = stored.estimated_expiration.or(incoming.estimated_expiration);
}

fn record_source(stored: &mut PatentRecord, incoming: &PatentRecord) {
    let events = stored
        .source
        .entry("ingestion_events")
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Value::Array(list) = events {
        list.push(ingestion_event(incoming));
    }

    union_sorted(&mut stored.component_tags, &incoming.component_tags);
    stored
        .source
        .insert("component_tags".to_string(), json!(stored.component_tags));
}

#[async_trait]
impl PatentSink for MemoryRepository {
    async fn upsert_document(&self, record: &PatentRecord) -> Result<DocumentUpsert> {
        let mut documents = self.documents.write().await;

        let was_new = match documents.get_mut(&record.doc_number) {
            Some(existing) => {
                merge_into(&mut existing.record, record);
                record_source(&mut existing.record, record);
                false
            }
            None => {
                let mut stored = record.clone();
                stored.snippets.clear();
                stored.source = Default::default();
                stored.component_tags.clear();
                record_source(&mut stored, record);
                documents.insert(
                    record.doc_number.clone(),
                    StoredDocument { record: stored, snippets: Vec::new() },
                );
                true
            }
        };

        debug!(doc_number = %record.doc_number, was_new, "Upserted document");
        Ok(DocumentUpsert { was_new })
    }

    async fn insert_snippets(&self, doc_number: &str, snippets: &[SnippetPayload]) -> Result<usize> {
        let mut documents = self.documents.write().await;
        let Some(document) = documents.get_mut(doc_number) else {
            warn!(doc_number, "Snippets for unknown document dropped");
            return Ok(0);
        };

        let mut seen: HashSet<String> = document.snippets.iter().map(|s| s.hash.clone()).collect();
        let mut created = 0;
        for payload in snippets {
            if payload.text.trim().is_empty() {
                continue;
            }
            let hash = snippet_hash(payload.section, &payload.text);
            if !seen.insert(hash.clone()) {
                continue;
            }
            document.snippets.push(StoredSnippet { hash, payload: payload.clone() });
            created += 1;
        }
        Ok(created)
    }
}
