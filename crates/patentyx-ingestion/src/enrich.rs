//! Fill missing claims/description from the full-text fallbacks.

use std::sync::Arc;

use tracing::debug;

use crate::fulltext::FullTextFetcher;
use crate::models::{is_present, RawRecord};

/// Try each fetcher in order for records lacking claims or description.
///
/// Only missing fields are filled; existing text is never replaced. The
/// fetcher chain stops as soon as both fields are present.
pub async fn enrich_with_full_text(
    records: Vec<RawRecord>,
    fetchers: &[Arc<dyn FullTextFetcher>],
) -> Vec<RawRecord> {
    let mut enriched = Vec::with_capacity(records.len());

    for mut record in records {
        if record.has_full_text() {
            enriched.push(record);
            continue;
        }

        for fetcher in fetchers {
            let text = fetcher.fetch(&record.doc_number, &record.jurisdiction).await;
            if !is_present(&record.claims) && is_present(&text.claims) {
                record.claims = text.claims;
            }
            if !is_present(&record.description) && is_present(&text.description) {
                record.description = text.description;
            }
            if record.has_full_text() {
                debug!(doc_number = %record.doc_number, fetcher = fetcher.name(), "Full text complete");
                break;
            }
        }
        enriched.push(record);
    }

    enriched
}
