//! Full text from a directory of pre-downloaded documents.
//!
//! Layout: `<root>/<doc_number>.json` with `claims`/`claims_text` and
//! `description`/`description_text` keys, or `<root>/<doc_number>.txt`
//! holding the description alone.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use patentyx_common::{PatentyxError, Result};
use serde_json::Value;
use tracing::{debug, warn};

use super::{FullText, FullTextFetcher};

pub struct LocalFullTextFetcher {
    root: PathBuf,
}

impl LocalFullTextFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn load(&self, doc_number: &str) -> Result<FullText> {
        let json_path = self.root.join(format!("{doc_number}.json"));
        if tokio::fs::try_exists(&json_path).await? {
            let content = tokio::fs::read_to_string(&json_path).await?;
            let data: Value = serde_json::from_str(&content)
                .map_err(|e| PatentyxError::full_text(doc_number, format!("{}: {e}", json_path.display())))?;
            return Ok(FullText::new(
                string_field(&data, &["claims", "claims_text"]),
                string_field(&data, &["description", "description_text"]),
            ));
        }

        let txt_path = self.root.join(format!("{doc_number}.txt"));
        if tokio::fs::try_exists(&txt_path).await? {
            let content = tokio::fs::read_to_string(&txt_path).await?;
            return Ok(FullText::new(None, Some(content)));
        }

        Ok(FullText::default())
    }
}

fn string_field(data: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| data[*k].as_str().filter(|s| !s.is_empty()))
        .map(String::from)
}

/// Doc numbers become file names; refuse anything that could leave `root`.
fn is_safe_name(doc_number: &str) -> bool {
    !doc_number.is_empty()
        && !doc_number.contains(['/', '\\'])
        && doc_number != ".."
        && doc_number != "."
}

#[async_trait]
impl FullTextFetcher for LocalFullTextFetcher {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn fetch(&self, doc_number: &str, _jurisdiction: &str) -> FullText {
        if !is_safe_name(doc_number) {
            debug!(doc_number, "Skipping local lookup for unsafe doc number");
            return FullText::default();
        }
        match self.load(doc_number).await {
            Ok(text) => text,
            Err(e) => {
                warn!(doc_number, error = %e, "Local full-text read failed");
                FullText::default()
            }
        }
    }
}
