//! Patent provider clients.

pub mod epo;
pub mod patentsview;
pub mod shape;
pub mod wipo;

use std::future::Future;

use async_trait::async_trait;
use patentyx_common::{PatentyxError, QueryConfig, Result};
use tracing::{debug, warn};

use crate::models::RawRecord;

pub use epo::EpoOpsProvider;
pub use patentsview::PatentsViewProvider;
pub use wipo::WipoPatentscopeProvider;

/// Common interface for all upstream patent sources.
#[async_trait]
pub trait PatentProvider: Send + Sync {
    /// Stable provider name, recorded on every record it produces.
    fn name(&self) -> &'static str;

    /// Run the shared query against this upstream, following pagination.
    async fn fetch(&self, query: &QueryConfig) -> Result<Vec<RawRecord>>;
}

/// Result of requesting one page from an upstream.
#[derive(Debug)]
pub enum PageOutcome {
    Page {
        records: Vec<RawRecord>,
        /// Total hit count, when the upstream reports one.
        total: Option<usize>,
    },
    /// Credentials refused (401/403): stop this provider, keep what we have.
    Rejected(u16),
}

/// Drive a provider's page loop.
///
/// `fetch_page` receives a 0-based page index. The loop stops on a short
/// page, once a reported total is reached, after `max_pages`, or when the
/// upstream rejects the credentials. Any error aborts the whole fetch.
pub async fn paginate<F, Fut>(
    provider: &str,
    query: &QueryConfig,
    mut fetch_page: F,
) -> Result<Vec<RawRecord>>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<PageOutcome>>,
{
    let per_page = query.per_page();
    let mut collected = Vec::new();

    for page in 0..query.max_pages() {
        match fetch_page(page).await? {
            PageOutcome::Rejected(status) => {
                warn!(
                    provider,
                    status,
                    kept = collected.len(),
                    "Credentials rejected; skipping remaining pages"
                );
                break;
            }
            PageOutcome::Page { records, total } => {
                let n = records.len();
                collected.extend(records);
                debug!(provider, page, n, ?total, "Fetched page");

                if n == 0 || n < per_page {
                    break;
                }
                if total.is_some_and(|t| collected.len() >= t) {
                    break;
                }
            }
        }
    }

    Ok(collected)
}

/// Status that counts as a credential rejection, when soft auth applies.
fn auth_rejection(status: reqwest::StatusCode, soft_auth: bool) -> Option<u16> {
    let code = status.as_u16();
    (soft_auth && (code == 401 || code == 403)).then_some(code)
}

/// Turn an HTTP response into one page of records.
///
/// 401/403 become [`PageOutcome::Rejected`] carrying the actual status when
/// `soft_auth` is set; any other non-2xx status or undecodable body is a
/// provider fetch error.
pub(crate) async fn read_page(
    provider: &str,
    resp: reqwest::Response,
    soft_auth: bool,
    parse: impl FnOnce(&serde_json::Value) -> PageOutcome,
) -> Result<PageOutcome> {
    let status = resp.status();
    if let Some(code) = auth_rejection(status, soft_auth) {
        return Ok(PageOutcome::Rejected(code));
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(PatentyxError::provider(
            provider,
            format!("HTTP {}: {}", status, truncate(&body, 200)),
        ));
    }
    let body = resp
        .text()
        .await
        .map_err(|e| PatentyxError::provider(provider, e))?;
    let data: serde_json::Value = serde_json::from_str(&body)
        .map_err(|e| PatentyxError::provider(provider, format!("malformed payload: {e}")))?;
    Ok(parse(&data))
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// Strip one pair of surrounding double quotes from a search phrase.
pub(crate) fn unquote(phrase: &str) -> &str {
    let p = phrase.strip_prefix('"').unwrap_or(phrase);
    p.strip_suffix('"').unwrap_or(p)
}
