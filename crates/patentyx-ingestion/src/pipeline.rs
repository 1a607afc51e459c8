//! End-to-end ingestion pipeline.
//!
//! Orchestrates one ingestion job:
//!   1. Query every provider concurrently
//!   2. Append caller-supplied manual records
//!   3. Merge duplicates and propagate family facts
//!   4. Optionally snapshot the merged raw records
//!   5. Fill missing claims/description from the full-text fetchers
//!   6. Normalise (dates, tags, expiration estimate, snippets)
//!   7. Upsert documents and snippets into the sink (skipped on dry run)
//!
//! Progress events go out on an optional broadcast channel. Provider and
//! persistence failures are logged, recorded in the result and skipped;
//! only a malformed manual record file aborts the job.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use patentyx_common::{QueryConfig, Result};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::aggregate::collect_with_errors;
use crate::enrich::enrich_with_full_text;
use crate::fulltext::FullTextFetcher;
use crate::manual::{load_manual_records, persist_raw_snapshot};
use crate::merge::merge_by_family;
use crate::models::PatentRecord;
use crate::normalise::{normalise_to_patent_record, ComponentPatterns};
use crate::repository::{persist_record, PatentSink};
use crate::sources::PatentProvider;

/// File name used when a snapshot directory is given.
pub const SNAPSHOT_FILE: &str = "payload_snapshot.json";

// ── Job config ────────────────────────────────────────────────────────────────

/// Parameters for a single ingestion run.
#[derive(Debug, Clone, Default)]
pub struct IngestionJob {
    pub query: QueryConfig,
    /// JSON / JSONL file of extra raw records merged with provider output.
    pub manual_path: Option<PathBuf>,
    /// Directory for the merged raw snapshot; `None` disables it.
    pub snapshot_dir: Option<PathBuf>,
    /// Normalise but do not write to the sink.
    pub dry_run: bool,
}

/// The collaborators a job runs against.
pub struct PipelineDeps {
    pub providers: Vec<Arc<dyn PatentProvider>>,
    pub fetchers: Vec<Arc<dyn FullTextFetcher>>,
    pub patterns: ComponentPatterns,
}

// ── Progress events ───────────────────────────────────────────────────────────

/// Progress event emitted during a pipeline run (cloneable for broadcast).
#[derive(Debug, Clone, Serialize)]
pub struct IngestionProgress {
    pub job_id: Uuid,
    pub stage: String,
    pub message: String,
    pub records_found: usize,
    pub documents_inserted: usize,
    pub snippets_inserted: usize,
}

// ── Result summary ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct IngestionResult {
    pub job_id: Uuid,
    pub records_found: usize,
    pub manual_records: usize,
    pub records_merged: usize,
    pub records_with_full_text: usize,
    pub documents_inserted: usize,
    pub snippets_inserted: usize,
    pub snapshot_path: Option<PathBuf>,
    pub errors: Vec<String>,
    pub duration_ms: u64,
    /// Normalised output, in merge order.
    #[serde(skip)]
    pub records: Vec<PatentRecord>,
}

impl IngestionResult {
    fn new(job_id: Uuid) -> Self {
        Self {
            job_id,
            records_found: 0,
            manual_records: 0,
            records_merged: 0,
            records_with_full_text: 0,
            documents_inserted: 0,
            snippets_inserted: 0,
            snapshot_path: None,
            errors: Vec::new(),
            duration_ms: 0,
            records: Vec::new(),
        }
    }
}

// ── Pipeline orchestrator ─────────────────────────────────────────────────────

/// Runs the end-to-end ingestion pipeline for one job.
#[instrument(skip_all)]
pub async fn run_ingestion(
    job: IngestionJob,
    deps: &PipelineDeps,
    sink: &dyn PatentSink,
    progress_tx: Option<broadcast::Sender<IngestionProgress>>,
) -> Result<IngestionResult> {
    let job_id = Uuid::new_v4();
    let t0 = Instant::now();
    let mut result = IngestionResult::new(job_id);
    info!(job_id = %job_id, providers = deps.providers.len(), "Starting ingestion pipeline");

    let emit = |stage: &str, message: String, result: &IngestionResult| {
        if let Some(ref tx) = progress_tx {
            let _ = tx.send(IngestionProgress {
                job_id,
                stage: stage.to_string(),
                message,
                records_found: result.records_found,
                documents_inserted: result.documents_inserted,
                snippets_inserted: result.snippets_inserted,
            });
        }
    };

    // ── 1. Providers ──────────────────────────────────────────────────────────
    emit("search", format!("Querying {} providers", deps.providers.len()), &result);
    let (mut collected, errors) = collect_with_errors(&deps.providers, &job.query).await;
    result.records_found = collected.len();
    result.errors.extend(errors);

    // ── 2. Manual records ─────────────────────────────────────────────────────
    if let Some(path) = job.manual_path.as_deref() {
        let manual = load_manual_records(path)?;
        result.manual_records = manual.len();
        collected.extend(manual);
    }

    // ── 3. Merge ──────────────────────────────────────────────────────────────
    emit("merge", format!("{} records found, merging…", collected.len()), &result);
    let merged = merge_by_family(collected);
    result.records_merged = merged.len();
    info!(records = merged.len(), "Merged by family");

    // ── 4. Snapshot ───────────────────────────────────────────────────────────
    if let Some(dir) = job.snapshot_dir.as_deref() {
        let path = dir.join(SNAPSHOT_FILE);
        match persist_raw_snapshot(&path, &merged) {
            Ok(()) => result.snapshot_path = Some(path),
            Err(e) => {
                let msg = format!("Snapshot {} failed: {e}", path.display());
                warn!("{}", &msg);
                result.errors.push(msg);
            }
        }
    }

    // ── 5. Full text ──────────────────────────────────────────────────────────
    let enriched = if deps.fetchers.is_empty() {
        merged
    } else {
        emit("enrich", format!("Fetching full text for {} records", merged.len()), &result);
        enrich_with_full_text(merged, &deps.fetchers).await
    };
    result.records_with_full_text = enriched.iter().filter(|r| r.has_full_text()).count();

    // ── 6. Normalise ──────────────────────────────────────────────────────────
    let records: Vec<PatentRecord> = enriched
        .into_iter()
        .map(|raw| normalise_to_patent_record(raw, &deps.patterns, None))
        .collect();
    info!(records = records.len(), "Prepared normalised records");

    // ── 7. Persist ────────────────────────────────────────────────────────────
    if job.dry_run {
        info!("Dry run enabled: skipping sink writes");
    } else {
        emit("persist", format!("Writing {} records", records.len()), &result);
        for record in &records {
            match persist_record(sink, record).await {
                Ok(Some(n)) => {
                    result.documents_inserted += 1;
                    result.snippets_inserted += n;
                }
                Ok(None) => {}
                Err(e) => {
                    let msg = format!("Persist {} failed: {e}", record.doc_number);
                    warn!("{}", &msg);
                    result.errors.push(msg);
                }
            }
        }
    }

    result.records = records;
    result.duration_ms = t0.elapsed().as_millis() as u64;

    info!(
        job_id             = %job_id,
        records_found      = result.records_found,
        records_merged     = result.records_merged,
        documents_inserted = result.documents_inserted,
        snippets_inserted  = result.snippets_inserted,
        duration_ms        = result.duration_ms,
        errors             = result.errors.len(),
        "Ingestion pipeline complete"
    );

    emit(
        "complete",
        format!(
            "Done: {} documents, {} snippets, {} errors",
            result.documents_inserted,
            result.snippets_inserted,
            result.errors.len()
        ),
        &result,
    );

    Ok(result)
}
