//! Raw record → normalised patent record.
//!
//! - `dates`: lenient date parsing, priority resolution, expiration estimate
//! - `tags`:  regex-based technical component tagging

pub mod dates;
pub mod tags;

pub use dates::{estimate_expiration, parse_date, resolve_priority};
pub use tags::ComponentPatterns;

use serde_json::json;

use crate::chunker::{chunk_text, ChunkerConfig};
use crate::models::{PatentRecord, RawRecord, SnippetSection};

/// Normalise one enriched record.
///
/// `synopsis` is extra free text used for tagging, and chunked into
/// `summary` snippets when the record has no abstract, claims or description.
pub fn normalise_to_patent_record(
    raw: RawRecord,
    patterns: &ComponentPatterns,
    synopsis: Option<&str>,
) -> PatentRecord {
    let blob = [
        raw.title.as_deref(),
        raw.abstract_text.as_deref(),
        raw.claims.as_deref(),
        raw.description.as_deref(),
        synopsis,
    ]
    .into_iter()
    .flatten()
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join("\n");
    let component_tags = patterns.detect(&blob);

    let filing_date = dates::parse_optional(raw.filing_date.as_deref());
    let publication_date = dates::parse_optional(raw.publication_date.as_deref());
    let grant_date = dates::parse_optional(raw.grant_date.as_deref());
    let earliest_priority_date = resolve_priority(&raw.priority_numbers, filing_date);
    let estimated_expiration = estimate_expiration(filing_date, earliest_priority_date);

    let mut snippets = Vec::new();
    for (text, section) in [
        (&raw.abstract_text, SnippetSection::Abstract),
        (&raw.claims, SnippetSection::Claims),
        (&raw.description, SnippetSection::Description),
    ] {
        if let Some(text) = text.as_deref() {
            snippets.extend(chunk_text(text, section, ChunkerConfig::for_section(section)));
        }
    }
    if snippets.is_empty() {
        if let Some(text) = synopsis {
            snippets = chunk_text(text, SnippetSection::Summary, ChunkerConfig::ABSTRACT);
        }
    }

    let mut source = raw.source;
    source
        .entry("provider")
        .or_insert_with(|| json!(raw.provider.clone()));

    PatentRecord {
        doc_number: raw.doc_number,
        jurisdiction: raw.jurisdiction,
        kind_code: raw.kind_code,
        family_id: raw.family_id,
        title: raw.title,
        abstract_text: raw.abstract_text,
        claims: raw.claims,
        description: raw.description,
        filing_date,
        publication_date,
        grant_date,
        earliest_priority_date,
        estimated_expiration,
        assignees: raw.assignees,
        inventors: raw.inventors,
        cpc_codes: raw.cpc_codes,
        ipc_codes: raw.ipc_codes,
        priority_numbers: raw.priority_numbers.into_iter().filter(|p| !p.is_empty()).collect(),
        component_tags,
        source,
        provider: raw.provider,
        snippets,
    }
}
