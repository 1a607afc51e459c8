//! Fan-out over every configured provider.

use std::sync::Arc;

use futures::future::join_all;
use patentyx_common::QueryConfig;
use tracing::{info, warn};

use crate::models::RawRecord;
use crate::sources::PatentProvider;

/// Run every provider concurrently and concatenate their records in
/// provider order. A failing provider is logged and contributes nothing.
pub async fn collect_provider_records(
    providers: &[Arc<dyn PatentProvider>],
    query: &QueryConfig,
) -> Vec<RawRecord> {
    collect_with_errors(providers, query).await.0
}

/// Like [`collect_provider_records`], also returning one message per failed provider.
pub async fn collect_with_errors(
    providers: &[Arc<dyn PatentProvider>],
    query: &QueryConfig,
) -> (Vec<RawRecord>, Vec<String>) {
    let results = join_all(providers.iter().map(|p| p.fetch(query))).await;

    let mut records = Vec::new();
    let mut errors = Vec::new();
    for (provider, result) in providers.iter().zip(results) {
        match result {
            Ok(batch) => {
                info!(provider = provider.name(), n = batch.len(), "Records retrieved");
                records.extend(batch);
            }
            Err(e) => {
                let msg = format!("Provider {} error: {e}", provider.name());
                warn!("{}", &msg);
                errors.push(msg);
            }
        }
    }
    (records, errors)
}
