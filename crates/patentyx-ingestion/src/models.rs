//! Data models for the patent ingestion pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque provenance map carried through the pipeline.
pub type SourceMap = Map<String, Value>;

/// A provider response item before family merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRecord {
    pub doc_number: String,
    pub jurisdiction: String,
    pub kind_code: Option<String>,
    pub family_id: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "abstract", alias = "abstract_text")]
    pub abstract_text: Option<String>,
    pub claims: Option<String>,
    pub description: Option<String>,
    /// Raw provider-native date strings; parsed during normalisation.
    pub filing_date: Option<String>,
    pub publication_date: Option<String>,
    pub grant_date: Option<String>,
    pub assignees: Vec<String>,
    pub inventors: Vec<String>,
    pub cpc_codes: Vec<String>,
    pub ipc_codes: Vec<String>,
    pub priority_numbers: Vec<String>,
    pub source: SourceMap,
    pub provider: String,
}

impl RawRecord {
    /// Key used to collapse duplicates: doc number, then family, then provider.
    pub fn identity_key(&self) -> String {
        if !self.doc_number.is_empty() {
            self.doc_number.clone()
        } else if let Some(family) = self.family_id.as_deref().filter(|f| !f.is_empty()) {
            family.to_string()
        } else {
            format!("unknown-{}", self.provider)
        }
    }

    /// Key used to share bibliographic facts across family members.
    pub fn family_key(&self) -> String {
        self.family_id
            .as_deref()
            .filter(|f| !f.is_empty())
            .unwrap_or(&self.doc_number)
            .to_string()
    }

    pub fn has_full_text(&self) -> bool {
        is_present(&self.claims) && is_present(&self.description)
    }
}

/// `Some` and non-empty.
pub fn is_present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

/// Document section a snippet was cut from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnippetSection {
    Abstract,
    Claims,
    Description,
    Front,
    Summary,
}

impl SnippetSection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnippetSection::Abstract    => "abstract",
            SnippetSection::Claims      => "claims",
            SnippetSection::Description => "description",
            SnippetSection::Front       => "front",
            SnippetSection::Summary     => "summary",
        }
    }
}

/// An offset-tracked excerpt of one section.
///
/// `start_char..end_char` is a half-open range of character offsets into the
/// original, untruncated section text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnippetPayload {
    pub section: SnippetSection,
    pub start_char: usize,
    pub end_char: usize,
    pub text: String,
}

/// Normalised pipeline output handed to the persistence sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatentRecord {
    pub doc_number: String,
    pub jurisdiction: String,
    pub kind_code: Option<String>,
    pub family_id: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub claims: Option<String>,
    pub description: Option<String>,
    pub filing_date: Option<NaiveDate>,
    pub publication_date: Option<NaiveDate>,
    pub grant_date: Option<NaiveDate>,
    pub earliest_priority_date: Option<NaiveDate>,
    /// Heuristic only (anchor + 20×365 days); not a legal term computation.
    pub estimated_expiration: Option<NaiveDate>,
    pub assignees: Vec<String>,
    pub inventors: Vec<String>,
    pub cpc_codes: Vec<String>,
    pub ipc_codes: Vec<String>,
    pub priority_numbers: Vec<String>,
    pub component_tags: Vec<String>,
    pub source: SourceMap,
    pub provider: String,
    pub snippets: Vec<SnippetPayload>,
}
