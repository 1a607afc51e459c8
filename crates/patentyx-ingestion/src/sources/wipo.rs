//! WIPO PATENTSCOPE client.
//!
//! Endpoint: https://patentscope.wipo.int/search/en/api/v3/search
//! Auth: bearer token (`WIPO_PATENTSCOPE_TOKEN`). Pages are 0-based with an
//! explicit `start` offset.

use async_trait::async_trait;
use patentyx_common::sandbox::SandboxClient as Client;
use patentyx_common::{PatentyxError, QueryConfig, Result};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Map, Value};
use tracing::{info, instrument};

use super::shape::{coerce_list, coerce_strings, first_text, jurisdiction};
use super::{paginate, read_page, unquote, PageOutcome, PatentProvider};
use crate::models::RawRecord;

pub const NAME: &str = "wipo_patentscope";
const WIPO_SEARCH_URL: &str = "https://patentscope.wipo.int/search/en/api/v3/search";
pub const TOKEN_ENV: &str = "WIPO_PATENTSCOPE_TOKEN";

const NAME_KEYS: &[&str] = &["name", "fullName", "$", "value"];

pub struct WipoPatentscopeProvider {
    client: Client,
    endpoint: String,
    token: Option<SecretString>,
}

impl WipoPatentscopeProvider {
    pub fn new(token: Option<SecretString>) -> Result<Self> {
        Ok(Self {
            client: Client::new()?,
            endpoint: WIPO_SEARCH_URL.to_string(),
            token,
        })
    }

    /// Read the bearer token from `WIPO_PATENTSCOPE_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var(TOKEN_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .map(SecretString::from);
        Self::new(token)
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    async fn fetch_page(
        &self,
        token: &SecretString,
        terms: &str,
        page: usize,
        per_page: usize,
    ) -> Result<PageOutcome> {
        let params = [
            ("q", terms.to_string()),
            ("rows", per_page.to_string()),
            ("start", (page * per_page).to_string()),
        ];
        let resp = self
            .client
            .get(&self.endpoint)?
            .query(&params)
            .header("Accept", "application/json")
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .map_err(|e| PatentyxError::provider(NAME, e))?;

        read_page(NAME, resp, true, parse_page).await
    }
}

#[async_trait]
impl PatentProvider for WipoPatentscopeProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    #[instrument(skip(self, query))]
    async fn fetch(&self, query: &QueryConfig) -> Result<Vec<RawRecord>> {
        let Some(token) = self.token.as_ref() else {
            info!("Skipping WIPO PATENTSCOPE fetch: missing API token");
            return Ok(vec![]);
        };

        let terms = build_wipo_query(query);
        let per_page = query.per_page();
        let records = paginate(NAME, query, |page| {
            let terms = terms.as_str();
            async move { self.fetch_page(token, terms, page, per_page).await }
        })
        .await?;

        info!(n = records.len(), "WIPO PATENTSCOPE fetch complete");
        Ok(records)
    }
}

// ── Query builder ─────────────────────────────────────────────────────────────

/// Build the PATENTSCOPE field-query string.
pub fn build_wipo_query(query: &QueryConfig) -> String {
    let mut include: Vec<String> = Vec::new();
    for phrase in query.phrases() {
        let cleaned = unquote(&phrase);
        include.push(format!("TTL:\"{cleaned}\""));
        include.push(format!("AB:\"{cleaned}\""));
    }
    include.extend(query.cpc_prefixes().iter().map(|p| format!("CPC:{p}*")));
    include.extend(query.ipc_prefixes().iter().map(|p| format!("IPC:{p}*")));
    include.extend(query.applicants().iter().map(|a| format!("PA:\"{a}\"")));

    let positive = include.join(" OR ");
    let excluded: Vec<String> = query
        .exclude_applicants()
        .iter()
        .map(|a| format!("NOT PA:\"{a}\""))
        .collect();

    if excluded.is_empty() {
        positive
    } else {
        format!("({}) {}", positive, excluded.join(" "))
    }
}

// ── Response parsing ──────────────────────────────────────────────────────────

fn parse_page(data: &Value) -> PageOutcome {
    let docs = if data["patents"].is_null() { &data["results"] } else { &data["patents"] };
    let records = coerce_list(docs).into_iter().map(parse_wipo_item).collect();
    let total = ["total", "totalResults", "numFound"]
        .iter()
        .find_map(|k| data[*k].as_u64())
        .map(|t| t as usize);
    PageOutcome::Page { records, total }
}

/// Convert one PATENTSCOPE result into a raw record.
pub fn parse_wipo_item(item: &Value) -> RawRecord {
    let mut source = Map::new();
    source.insert("provider".to_string(), json!(NAME));

    RawRecord {
        doc_number: first_text(item, &["publicationNumber", "DocNumber"]).unwrap_or_default(),
        jurisdiction: jurisdiction(first_text(item, &["publicationCountry", "countryCode"]), "WO"),
        kind_code: first_text(item, &["kindCode"]),
        family_id: first_text(item, &["familyId", "familyID"]),
        title: first_text(item, &["title", "inventionTitle"]),
        abstract_text: first_text(item, &["abstract"]),
        // Full text only counts when delivered as a plain string.
        claims: item["claims"].as_str().filter(|s| !s.is_empty()).map(String::from),
        description: item["description"].as_str().filter(|s| !s.is_empty()).map(String::from),
        filing_date: first_text(item, &["filingDate"]),
        publication_date: first_text(item, &["publicationDate"]),
        grant_date: first_text(item, &["grantDate"]),
        assignees: coerce_strings(&item["applicants"], NAME_KEYS),
        inventors: coerce_strings(&item["inventors"], NAME_KEYS),
        cpc_codes: coerce_strings(&item["cpc"], &["symbol", "code", "$"]),
        ipc_codes: coerce_strings(&item["ipc"], &["symbol", "code", "$"]),
        priority_numbers: coerce_strings(&item["priorityNumbers"], &["number", "docNumber", "$"]),
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
    fn test_query_string() {
        let q = build_wipo_query(&cfg(QueryOverride {
            keywords: Some(vec!["\"mRNA display\"".into()]),
            synonyms: Some(vec![]),
            cpc_prefixes: Some(vec!["C07K".into()]),
            ipc_prefixes: Some(vec![]),
            applicants: Some(vec!["Moderna".into()]),
            exclude_applicants: Some(vec!["Acme".into(), "Globex".into()]),
            ..Default::default()
        }));
        assert_eq!(
            q,
            "(TTL:\"mRNA display\" OR AB:\"mRNA display\" OR CPC:C07K* OR PA:\"Moderna\") \
             NOT PA:\"Acme\" NOT PA:\"Globex\""
        );
    }

    #[test]
    fn test_parse_item_accepts_scalar_or_list() {
        let item = json!({
            "publicationNumber": "WO2020123456",
            "familyID": 4455,
            "countryCode": "wo",
            "inventionTitle": "Display library",
            "applicants": "PeptiDream",
            "inventors": [{ "name": "B. Smith" }, null],
            "cpc": ["C12P21/02", ""],
            "priorityNumbers": "2018JP456",
            "claims": { "unexpected": "shape" },
            "description": "Detailed ribosome display workflow",
            "filingDate": "2019-06-01"
        });
        let r = parse_wipo_item(&item);
        assert_eq!(r.doc_number, "WO2020123456");
        assert_eq!(r.family_id.as_deref(), Some("4455"));
        assert_eq!(r.jurisdiction, "WO");
        assert_eq!(r.title.as_deref(), Some("Display library"));
        assert_eq!(r.assignees, vec!["PeptiDream"]);
        assert_eq!(r.inventors, vec!["B. Smith"]);
        assert_eq!(r.cpc_codes, vec!["C12P21/02"]);
        assert_eq!(r.priority_numbers, vec!["2018JP456"]);
        assert!(r.claims.is_none());
        assert!(r.description.is_some());
        assert!(r.ipc_codes.is_empty());
    }

    #[test]
    fn test_parse_page_falls_back_to_results_key() {
        let data = json!({ "results": [{ "publicationNumber": "WO1" }, { "publicationNumber": "WO2" }] });
        match parse_page(&data) {
            PageOutcome::Page { records, total } => {
                assert_eq!(records.len(), 2);
                assert_eq!(total, None);
            }
            PageOutcome::Rejected(_) => panic!("unexpected rejection"),
        }
    }

    #[tokio::test]
    async fn test_missing_token_contributes_nothing() {
        let provider = WipoPatentscopeProvider::new(None).unwrap();
        let records = provider.fetch(&QueryConfig::default()).await.unwrap();
        assert!(records.is_empty());
    }
}
