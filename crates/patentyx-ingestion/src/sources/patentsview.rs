//! USPTO PatentsView client.
//!
//! Endpoint: https://patentsview.org/api/patents/query (POST, JSON body)
//! Query language: `_or` / `_and` / `_not` combinators over field clauses.
//! Pages are 1-based (`o.page`).

use async_trait::async_trait;
use patentyx_common::sandbox::SandboxClient as Client;
use patentyx_common::{PatentyxError, QueryConfig, Result};
use serde_json::{json, Map, Value};
use tracing::{info, instrument};

use super::shape::{coerce_list, coerce_strings, jurisdiction, text_of};
use super::{paginate, read_page, unquote, PageOutcome, PatentProvider};
use crate::models::RawRecord;

pub const NAME: &str = "patentsview";
const PATENTSVIEW_URL: &str = "https://patentsview.org/api/patents/query";

const FIELDS: &[&str] = &[
    "patent_number",
    "patent_title",
    "patent_abstract",
    "patent_date",
    "patent_application_date",
    "patent_issue_date",
    "patent_kind",
    "patent_type",
    "patent_country",
    "patent_num_claims",
    "patent_family_id",
    "cpcs.cpc_subgroup_id",
    "cpcs.cpc_section_id",
    "ipcs.ipc_subclass",
    "assignees.assignee_organization",
    "assignees.assignee_individual_name",
    "inventors.inventor_full_name",
];

pub struct PatentsViewProvider {
    client: Client,
    endpoint: String,
}

impl PatentsViewProvider {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: Client::new()?,
            endpoint: PATENTSVIEW_URL.to_string(),
        })
    }

    /// Point at a different PatentsView-compatible endpoint (mirror, test server).
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    async fn fetch_page(&self, body: &Value) -> Result<PageOutcome> {
        let resp = self
            .client
            .post(&self.endpoint)?
            .json(body)
            .send()
            .await
            .map_err(|e| PatentyxError::provider(NAME, e))?;

        read_page(NAME, resp, false, parse_page).await
    }
}

#[async_trait]
impl PatentProvider for PatentsViewProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    #[instrument(skip(self, query))]
    async fn fetch(&self, query: &QueryConfig) -> Result<Vec<RawRecord>> {
        let q = build_patentsview_query(query);
        let per_page = query.per_page();

        let records = paginate(NAME, query, |page| {
            let body = json!({
                "q": q,
                "f": FIELDS,
                "o": { "page": page + 1, "per_page": per_page },
            });
            async move { self.fetch_page(&body).await }
        })
        .await?;

        info!(n = records.len(), "PatentsView fetch complete");
        Ok(records)
    }
}

// ── Query builder ─────────────────────────────────────────────────────────────

fn clause(op: &str, field: &str, value: &str) -> Value {
    let mut inner = Map::new();
    inner.insert(field.to_string(), Value::String(value.to_string()));
    let mut outer = Map::new();
    outer.insert(op.to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn text_phrase(field: &str, value: &str) -> Value {
    clause("_text_phrase", field, value)
}

fn begins(field: &str, prefix: &str) -> Value {
    clause("_begins", field, prefix)
}

/// Build the PatentsView JSON query expression.
pub fn build_patentsview_query(query: &QueryConfig) -> Value {
    let text_clauses: Vec<Value> = query
        .phrases()
        .iter()
        .flat_map(|phrase| {
            let cleaned = unquote(phrase);
            [
                text_phrase("patent_title", cleaned),
                text_phrase("patent_abstract", cleaned),
            ]
        })
        .collect();

    let cpc: Vec<Value> = query.cpc_prefixes().iter().map(|p| begins("cpc_subgroup_id", p)).collect();
    let ipc: Vec<Value> = query.ipc_prefixes().iter().map(|p| begins("ipc_subclass", p)).collect();
    let applicants: Vec<Value> = query
        .applicants()
        .iter()
        .map(|a| text_phrase("assignee_organization", a))
        .collect();

    let mut expr = if text_clauses.is_empty() {
        json!({ "_text_all": { "patent_title": "mRNA" } })
    } else {
        json!({ "_or": text_clauses })
    };

    let augments: Vec<Value> = [cpc, ipc, applicants]
        .into_iter()
        .filter(|clauses| !clauses.is_empty())
        .map(|clauses| json!({ "_or": clauses }))
        .collect();
    if !augments.is_empty() {
        let mut all = vec![expr];
        all.extend(augments);
        expr = json!({ "_and": all });
    }

    if !query.exclude_applicants().is_empty() {
        let excluded: Vec<Value> = query
            .exclude_applicants()
            .iter()
            .map(|a| text_phrase("assignee_organization", a))
            .collect();
        expr = json!({ "_and": [expr, { "_not": { "_or": excluded } }] });
    }

    expr
}

// ── Response parsing ──────────────────────────────────────────────────────────

fn parse_page(data: &Value) -> PageOutcome {
    let records = coerce_list(&data["patents"])
        .into_iter()
        .map(parse_patentsview_item)
        .collect();
    let total = data["total_patent_count"].as_u64().map(|t| t as usize);
    PageOutcome::Page { records, total }
}

/// Convert one PatentsView `patents[]` item into a raw record.
pub fn parse_patentsview_item(item: &Value) -> RawRecord {
    let assignees = coerce_list(&item["assignees"])
        .into_iter()
        .filter_map(|a| {
            text_of(&a["assignee_organization"], &[])
                .or_else(|| text_of(&a["assignee_individual_name"], &[]))
        })
        .collect();

    let mut cpc_codes = coerce_strings(&item["cpcs"], &["cpc_subgroup_id"]);
    cpc_codes.sort();
    cpc_codes.dedup();
    let mut ipc_codes = coerce_strings(&item["ipcs"], &["ipc_subclass"]);
    ipc_codes.sort();
    ipc_codes.dedup();

    let mut source = Map::new();
    source.insert("provider".to_string(), json!(NAME));

    RawRecord {
        doc_number: text_of(&item["patent_number"], &[]).unwrap_or_default(),
        jurisdiction: jurisdiction(text_of(&item["patent_country"], &[]), "US"),
        kind_code: text_of(&item["patent_kind"], &[]),
        family_id: text_of(&item["patent_family_id"], &[]),
        title: text_of(&item["patent_title"], &[]),
        abstract_text: text_of(&item["patent_abstract"], &[]),
        claims: None,
        description: None,
        filing_date: text_of(&item["patent_application_date"], &[]),
        publication_date: text_of(&item["patent_date"], &[]),
        grant_date: text_of(&item["patent_issue_date"], &[]),
        assignees,
        inventors: coerce_strings(&item["inventors"], &["inventor_full_name"]),
        cpc_codes,
        ipc_codes,
        priority_numbers: vec![],
        source,
        provider: NAME.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patentyx_common::{QueryDefaults, QueryOverride};

    fn cfg(overrides: QueryOverride) -> QueryConfig {
        QueryConfig::from_override(&QueryDefaults::default(), overrides)
    }

    #[test]
    fn test_query_targets_title_and_abstract() {
        let q = build_patentsview_query(&cfg(QueryOverride {
            keywords: Some(vec!["\"mRNA display\"".into()]),
            synonyms: Some(vec![]),
            cpc_prefixes: Some(vec![]),
            ipc_prefixes: Some(vec![]),
            applicants: Some(vec![]),
            ..Default::default()
        }));
        assert_eq!(
            q,
            json!({ "_or": [
                { "_text_phrase": { "patent_title": "mRNA display" } },
                { "_text_phrase": { "patent_abstract": "mRNA display" } },
            ]})
        );
    }

    #[test]
    fn test_query_appends_exclusions_last() {
        let q = build_patentsview_query(&cfg(QueryOverride {
            exclude_applicants: Some(vec!["Acme".into()]),
            ..Default::default()
        }));
        let and = q["_and"].as_array().unwrap();
        assert_eq!(and.len(), 2);
        assert_eq!(
            and[1],
            json!({ "_not": { "_or": [{ "_text_phrase": { "assignee_organization": "Acme" } }] } })
        );
        // positive side: text OR, cpc OR, ipc OR, applicants OR
        assert_eq!(and[0]["_and"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_empty_phrases_fall_back_to_title_match() {
        let q = build_patentsview_query(&cfg(QueryOverride {
            keywords: Some(vec![]),
            synonyms: Some(vec![]),
            cpc_prefixes: Some(vec![]),
            ipc_prefixes: Some(vec![]),
            applicants: Some(vec![]),
            ..Default::default()
        }));
        assert_eq!(q, json!({ "_text_all": { "patent_title": "mRNA" } }));
    }

    #[test]
    fn test_parse_item() {
        let item = json!({
            "patent_number": " 10123456 ",
            "patent_title": "Peptide display",
            "patent_abstract": "Cyclization of peptides",
            "patent_application_date": "2016-05-01",
            "patent_date": "2018-11-13",
            "patent_kind": "B2",
            "patent_country": null,
            "patent_family_id": 987654,
            "assignees": [
                { "assignee_organization": "Ra Pharmaceuticals" },
                { "assignee_organization": null, "assignee_individual_name": "Jane Roe" }
            ],
            "inventors": [{ "inventor_full_name": "A. Doe" }, { "inventor_full_name": null }],
            "cpcs": [{ "cpc_subgroup_id": "C07K7/64" }, { "cpc_subgroup_id": "C07K7/64" }, { "cpc_subgroup_id": "C12N15/10" }],
            "ipcs": { "ipc_subclass": "C12N" }
        });
        let r = parse_patentsview_item(&item);
        assert_eq!(r.doc_number, "10123456");
        assert_eq!(r.jurisdiction, "US");
        assert_eq!(r.family_id.as_deref(), Some("987654"));
        assert_eq!(r.assignees, vec!["Ra Pharmaceuticals", "Jane Roe"]);
        assert_eq!(r.inventors, vec!["A. Doe"]);
        assert_eq!(r.cpc_codes, vec!["C07K7/64", "C12N15/10"]);
        assert_eq!(r.ipc_codes, vec!["C12N"]);
        assert_eq!(r.filing_date.as_deref(), Some("2016-05-01"));
        assert_eq!(r.provider, "patentsview");
    }

    #[test]
    fn test_parse_page_reads_total() {
        let data = json!({ "patents": [{ "patent_number": "1" }], "total_patent_count": 1 });
        match parse_page(&data) {
            PageOutcome::Page { records, total } => {
                assert_eq!(records.len(), 1);
                assert_eq!(total, Some(1));
            }
            PageOutcome::Rejected(_) => panic!("unexpected rejection"),
        }
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_patentsview_live() {
        let provider = PatentsViewProvider::new().unwrap();
        let query = cfg(QueryOverride { per_page: Some(5), max_pages: Some(1), ..Default::default() });
        let records = provider.fetch(&query).await.expect("PatentsView fetch failed");
        println!("Found {} patents", records.len());
    }
}
