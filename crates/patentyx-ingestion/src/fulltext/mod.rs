//! Secondary sources for claims and description text.

pub mod google_patents;
pub mod local;

use async_trait::async_trait;

use crate::models::is_present;

pub use google_patents::{extract_sections, GooglePatentsFetcher};
pub use local::LocalFullTextFetcher;

/// Claims and description recovered for one document. Either may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FullText {
    pub claims: Option<String>,
    pub description: Option<String>,
}

impl FullText {
    pub fn new(claims: Option<String>, description: Option<String>) -> Self {
        Self {
            claims: claims.filter(|c| !c.is_empty()),
            description: description.filter(|d| !d.is_empty()),
        }
    }

    pub fn is_empty(&self) -> bool {
        !is_present(&self.claims) && !is_present(&self.description)
    }
}

/// A full-text fallback.
///
/// Implementations never fail: any error is logged inside the fetcher and
/// reported as an empty [`FullText`].
#[async_trait]
pub trait FullTextFetcher: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, doc_number: &str, jurisdiction: &str) -> FullText;
}
