//! EPO Open Patent Services (OPS) client.
//!
//! Endpoint: https://ops.epo.org/3.2/rest-services/published-data/search
//! Auth: HTTP basic with the consumer key/secret pair (`EPO_OPS_KEY`,
//! `EPO_OPS_SECRET`). Pages are requested with an inclusive, 0-based
//! `Range=a-b` parameter.
//!
//! OPS JSON is a mechanical XML translation: text lives under `$`,
//! attributes under `@name`, and any element may be a single object or an
//! array of objects.

use async_trait::async_trait;
use patentyx_common::sandbox::SandboxClient as Client;
use patentyx_common::{PatentyxError, QueryConfig, Result};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Map, Value};
use tracing::{info, instrument};

use super::shape::{coerce_list, coerce_strings, jurisdiction, prefer_english, squash_whitespace, text_of};
use super::{paginate, read_page, unquote, PageOutcome, PatentProvider};
use crate::models::RawRecord;
use patentyx_common::query_config::dedupe;

pub const NAME: &str = "epo_ops";
const EPO_SEARCH_URL: &str = "https://ops.epo.org/3.2/rest-services/published-data/search";
pub const KEY_ENV: &str = "EPO_OPS_KEY";
pub const SECRET_ENV: &str = "EPO_OPS_SECRET";

const PARTY_KEYS: &[&str] = &["name", "applicant", "inventor", "applicant-name", "inventor-name", "$"];

static NULL: Value = Value::Null;

/// Consumer key/secret pair issued by the OPS developer portal.
pub struct EpoCredentials {
    pub key: SecretString,
    pub secret: SecretString,
}

pub struct EpoOpsProvider {
    client: Client,
    endpoint: String,
    credentials: Option<EpoCredentials>,
}

impl EpoOpsProvider {
    pub fn new(credentials: Option<EpoCredentials>) -> Result<Self> {
        Ok(Self {
            client: Client::new()?,
            endpoint: EPO_SEARCH_URL.to_string(),
            credentials,
        })
    }

    /// Both `EPO_OPS_KEY` and `EPO_OPS_SECRET` must be set.
    pub fn from_env() -> Result<Self> {
        let read = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        let credentials = match (read(KEY_ENV), read(SECRET_ENV)) {
            (Some(key), Some(secret)) => Some(EpoCredentials {
                key: SecretString::from(key),
                secret: SecretString::from(secret),
            }),
            _ => None,
        };
        Self::new(credentials)
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    async fn fetch_page(
        &self,
        creds: &EpoCredentials,
        terms: &str,
        page: usize,
        per_page: usize,
    ) -> Result<PageOutcome> {
        let resp = self
            .client
            .get(&self.endpoint)?
            .query(&[("q", terms.to_string()), ("Range", range_param(page, per_page))])
            .header("Accept", "application/json")
            .basic_auth(creds.key.expose_secret(), Some(creds.secret.expose_secret()))
            .send()
            .await
            .map_err(|e| PatentyxError::provider(NAME, e))?;

        read_page(NAME, resp, true, parse_page).await
    }
}

#[async_trait]
impl PatentProvider for EpoOpsProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    #[instrument(skip(self, query))]
    async fn fetch(&self, query: &QueryConfig) -> Result<Vec<RawRecord>> {
        let Some(creds) = self.credentials.as_ref() else {
            info!("Skipping EPO OPS fetch: missing consumer key/secret");
            return Ok(vec![]);
        };

        let terms = build_epo_query(query);
        let per_page = query.per_page();
        let records = paginate(NAME, query, |page| {
            let terms = terms.as_str();
            async move { self.fetch_page(creds, terms, page, per_page).await }
        })
        .await?;

        info!(n = records.len(), "EPO OPS fetch complete");
        Ok(records)
    }
}

/// Inclusive item range for a 0-based page.
fn range_param(page: usize, per_page: usize) -> String {
    let start = page * per_page;
    format!("{}-{}", start, start + per_page.max(1) - 1)
}

// ── Query builder ─────────────────────────────────────────────────────────────

/// Build the CQL query string.
pub fn build_epo_query(query: &QueryConfig) -> String {
    let mut include: Vec<String> = Vec::new();
    for phrase in query.phrases() {
        let cleaned = unquote(&phrase);
        include.push(format!("ti=\"{cleaned}\""));
        include.push(format!("ab=\"{cleaned}\""));
    }
    include.extend(query.cpc_prefixes().iter().map(|p| format!("cpc={p}*")));
    include.extend(query.ipc_prefixes().iter().map(|p| format!("ipc={p}*")));
    include.extend(query.applicants().iter().map(|a| format!("ap=\"{a}\"")));

    let positive = if include.is_empty() {
        "ti=mRNA".to_string()
    } else {
        include.join(" OR ")
    };
    let excluded: Vec<String> = query
        .exclude_applicants()
        .iter()
        .map(|a| format!("NOT ap=\"{a}\""))
        .collect();

    if excluded.is_empty() {
        positive
    } else {
        format!("({}) {}", positive, excluded.join(" "))
    }
}

// ── Response parsing ──────────────────────────────────────────────────────────

fn parse_page(data: &Value) -> PageOutcome {
    let records = extract_epo_documents(data)
        .into_iter()
        .map(parse_epo_item)
        .collect();
    let total = data["ops:world-patent-data"]["ops:biblio-search"]["@total-result-count"]
        .as_str()
        .and_then(|t| t.parse().ok());
    PageOutcome::Page { records, total }
}

/// Locate the per-document nodes in a search response.
///
/// Accepts both the `ops:search-response/ops:result` layout and the
/// biblio-search layout (`ops:search-result/exchange-documents`).
pub fn extract_epo_documents(data: &Value) -> Vec<&Value> {
    let world = &data["ops:world-patent-data"];
    let legacy = &world["ops:search-response"]["ops:result"];
    if !legacy.is_null() {
        return coerce_list(legacy);
    }
    coerce_list(&world["ops:biblio-search"]["ops:search-result"]["exchange-documents"])
}

/// Convert one OPS document node into a raw record.
pub fn parse_epo_item(item: &Value) -> RawRecord {
    let doc = ["document", "exchange-document"]
        .iter()
        .map(|k| &item[*k])
        .find(|v| v.is_object())
        .unwrap_or(item);
    let bib = &doc["bibliographic-data"];

    let pub_ids = coerce_list(&bib["publication-reference"]["document-id"]);
    let pub_id = pub_ids
        .iter()
        .find(|d| d["@document-id-type"].as_str() == Some("docdb"))
        .or_else(|| pub_ids.first())
        .copied()
        .unwrap_or(&NULL);

    let doc_number = text_of(&pub_id["doc-number"], &["$"]).unwrap_or_default();
    let country = text_of(&pub_id["country"], &["$"]).or_else(|| text_of(&doc["@country"], &[]));

    let titles = coerce_list(&bib["invention-title"]);
    let title = prefer_english(&titles).and_then(|t| text_of(t, &["$"]));

    let mut abstracts = coerce_list(&doc["abstract"]);
    if abstracts.is_empty() {
        abstracts = coerce_list(&bib["abstract"]);
    }
    let abstract_text = prefer_english(&abstracts).and_then(|a| {
        let paragraphs = coerce_strings(&a["p"], &["$"]);
        if paragraphs.is_empty() {
            text_of(a, &["$"])
        } else {
            Some(paragraphs.join("\n"))
        }
    });

    let mut source = Map::new();
    source.insert("provider".to_string(), json!(NAME));

    RawRecord {
        doc_number,
        jurisdiction: jurisdiction(country, "EP"),
        kind_code: text_of(&pub_id["kind"], &["$"]).or_else(|| text_of(&doc["@kind"], &[])),
        family_id: text_of(&doc["@family-id"], &[]).or_else(|| text_of(&item["@family-id"], &[])),
        title,
        abstract_text,
        claims: None,
        description: None,
        filing_date: reference_date(&bib["application-reference"])
            .or_else(|| reference_date(&doc["application-reference"])),
        publication_date: text_of(&pub_id["date"], &["$"]),
        grant_date: reference_date(&bib["grant-reference"]),
        assignees: parties(bib, "applicants", "applicant"),
        inventors: parties(bib, "inventors", "inventor"),
        cpc_codes: cpc_codes(bib),
        ipc_codes: ipc_codes(bib),
        priority_numbers: coerce_list(&bib["priority-claims"]["priority-claim"])
            .into_iter()
            .filter_map(|p| {
                text_of(&p["doc-number"], &["$"])
                    .or_else(|| text_of(&p["document-id"], &["doc-number", "$"]))
            })
            .collect(),
        source,
        provider: NAME.to_string(),
    }
}

fn reference_date(reference: &Value) -> Option<String> {
    coerce_list(&reference["document-id"])
        .into_iter()
        .find_map(|d| text_of(&d["date"], &["$"]))
}

fn parties(bib: &Value, group: &str, member: &str) -> Vec<String> {
    let nested = coerce_strings(&bib["parties"][group][member], PARTY_KEYS);
    let names = if nested.is_empty() {
        // Older payloads flatten parties directly under the bibliographic node,
        // sometimes wrapped as `{"applicant": [...]}`.
        let flat = &bib[if group == "applicants" { "assignees" } else { group }];
        let members = if flat[member].is_null() { flat } else { &flat[member] };
        coerce_strings(members, PARTY_KEYS)
    } else {
        nested
    };
    dedupe(names)
}

fn cpc_codes(bib: &Value) -> Vec<String> {
    let mut codes: Vec<String> = coerce_strings(&bib["classifications-cpc"]["classification"], &["text", "symbol", "$"])
        .iter()
        .map(|c| squash_whitespace(c))
        .collect();

    for pc in coerce_list(&bib["patent-classifications"]["patent-classification"]) {
        let part = |k: &str| text_of(&pc[k], &["$"]).unwrap_or_default();
        let head = format!("{}{}{}", part("section"), part("class"), part("subclass"));
        if head.is_empty() {
            continue;
        }
        let group = format!("{}/{}", part("main-group"), part("subgroup"));
        codes.push(if group == "/" { head } else { format!("{head} {group}") });
    }
    dedupe(codes)
}

fn ipc_codes(bib: &Value) -> Vec<String> {
    let mut codes = coerce_strings(&bib["classifications-ipc"]["classification"], &["text", "symbol", "$"]);
    codes.extend(coerce_strings(&bib["classifications-ipcr"]["classification-ipcr"], &["text", "$"]));
    dedupe(codes.iter().map(|c| squash_whitespace(c)))
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
        let q = build_epo_query(&cfg(QueryOverride {
            keywords: Some(vec!["flexizyme".into()]),
            synonyms: Some(vec![]),
            cpc_prefixes: Some(vec![]),
            ipc_prefixes: Some(vec!["C12N".into()]),
            applicants: Some(vec![]),
            exclude_applicants: Some(vec!["Acme".into()]),
            ..Default::default()
        }));
        assert_eq!(q, "(ti=\"flexizyme\" OR ab=\"flexizyme\" OR ipc=C12N*) NOT ap=\"Acme\"");
    }

    #[test]
    fn test_query_fallback() {
        let q = build_epo_query(&cfg(QueryOverride {
            keywords: Some(vec![]),
            synonyms: Some(vec![]),
            cpc_prefixes: Some(vec![]),
            ipc_prefixes: Some(vec![]),
            applicants: Some(vec![]),
            ..Default::default()
        }));
        assert_eq!(q, "ti=mRNA");
    }

    #[test]
    fn test_range_param() {
        assert_eq!(range_param(0, 25), "0-24");
        assert_eq!(range_param(2, 25), "50-74");
    }

    #[test]
    fn test_parse_legacy_search_response() {
        let data = json!({
            "ops:world-patent-data": { "ops:search-response": { "ops:result": {
                "@family-id": "FAM-1",
                "document": { "bibliographic-data": {
                    "publication-reference": { "document-id": {
                        "doc-number": { "$": "EP3000000" }, "kind": { "$": "A1" }, "date": { "$": "20200115" }
                    }},
                    "invention-title": { "$": "Cyclic peptide library" },
                    "assignees": [{ "name": "Moderna" }],
                    "inventors": { "name": "C. Lee" },
                    "classifications-cpc": { "classification": [{ "text": "C07K  7/64" }, { "symbol": "C12N15/10" }] },
                    "priority-claims": { "priority-claim": [{ "doc-number": "US62000000" }] },
                    "application-reference": { "document-id": { "date": "20180301" } }
                }, "abstract": { "p": "Abstract text" } }
            }}}
        });
        let docs = extract_epo_documents(&data);
        assert_eq!(docs.len(), 1);

        let r = parse_epo_item(docs[0]);
        assert_eq!(r.doc_number, "EP3000000");
        assert_eq!(r.jurisdiction, "EP");
        assert_eq!(r.kind_code.as_deref(), Some("A1"));
        assert_eq!(r.family_id.as_deref(), Some("FAM-1"));
        assert_eq!(r.title.as_deref(), Some("Cyclic peptide library"));
        assert_eq!(r.abstract_text.as_deref(), Some("Abstract text"));
        assert_eq!(r.assignees, vec!["Moderna"]);
        assert_eq!(r.inventors, vec!["C. Lee"]);
        assert_eq!(r.cpc_codes, vec!["C07K 7/64", "C12N15/10"]);
        assert_eq!(r.priority_numbers, vec!["US62000000"]);
        assert_eq!(r.filing_date.as_deref(), Some("20180301"));
        assert_eq!(r.publication_date.as_deref(), Some("20200115"));
    }

    #[test]
    fn test_parse_biblio_search_exchange_document() {
        let data = json!({
            "ops:world-patent-data": { "ops:biblio-search": {
                "@total-result-count": "1",
                "ops:search-result": { "exchange-documents": [{ "exchange-document": {
                    "@country": "WO", "@family-id": "556677", "@kind": "A1",
                    "bibliographic-data": {
                        "publication-reference": { "document-id": [
                            { "@document-id-type": "epodoc", "doc-number": { "$": "WO2021000001" } },
                            { "@document-id-type": "docdb", "country": { "$": "WO" },
                              "doc-number": { "$": "2021000001" }, "kind": { "$": "A1" } }
                        ]},
                        "invention-title": [
                            { "@lang": "fr", "$": "Bibliothèque" },
                            { "@lang": "en", "$": "Library" }
                        ],
                        "parties": {
                            "applicants": { "applicant": [
                                { "applicant-name": { "name": { "$": "PEPTIDREAM INC" } } },
                                { "applicant-name": { "name": { "$": "PEPTIDREAM INC" } } }
                            ]},
                            "inventors": { "inventor": { "inventor-name": { "name": { "$": "SUGA HIROAKI" } } } }
                        },
                        "patent-classifications": { "patent-classification": {
                            "section": { "$": "C" }, "class": { "$": "07" }, "subclass": { "$": "K" },
                            "main-group": { "$": "1" }, "subgroup": { "$": "04" }
                        }}
                    },
                    "abstract": [
                        { "@lang": "en", "p": [{ "$": "First." }, { "$": "Second." }] }
                    ]
                }}]}
            }}
        });
        let total = match parse_page(&data) {
            PageOutcome::Page { total, .. } => total,
            PageOutcome::Rejected(_) => None,
        };
        assert_eq!(total, Some(1));

        let r = parse_epo_item(extract_epo_documents(&data)[0]);
        assert_eq!(r.doc_number, "2021000001");
        assert_eq!(r.jurisdiction, "WO");
        assert_eq!(r.family_id.as_deref(), Some("556677"));
        assert_eq!(r.title.as_deref(), Some("Library"));
        assert_eq!(r.abstract_text.as_deref(), Some("First.\nSecond."));
        assert_eq!(r.assignees, vec!["PEPTIDREAM INC"]);
        assert_eq!(r.inventors, vec!["SUGA HIROAKI"]);
        assert_eq!(r.cpc_codes, vec!["C07K 1/04"]);
    }

    #[test]
    fn test_abstract_under_bibliographic_data() {
        let item = json!({ "document": { "bibliographic-data": {
            "publication-reference": { "document-id": { "doc-number": "EP1" } },
            "abstract": { "p": "Bib abstract" }
        }}});
        let r = parse_epo_item(&item);
        assert_eq!(r.doc_number, "EP1");
        assert_eq!(r.abstract_text.as_deref(), Some("Bib abstract"));
    }

    #[test]
    fn test_flat_parties_wrapped_by_member_key() {
        let item = json!({ "document": { "bibliographic-data": {
            "publication-reference": { "document-id": { "doc-number": "EP2" } },
            "assignees": { "applicant": [{ "name": "Moderna" }, { "name": "PeptiDream" }] },
            "inventors": [{ "inventor": { "name": "C. Lee" } }, { "inventor": "H. Suga" }]
        }}});
        let r = parse_epo_item(&item);
        assert_eq!(r.assignees, vec!["Moderna", "PeptiDream"]);
        assert_eq!(r.inventors, vec!["C. Lee", "H. Suga"]);
    }

    #[tokio::test]
    async fn test_missing_credentials_contribute_nothing() {
        let provider = EpoOpsProvider::new(None).unwrap();
        assert!(provider.fetch(&QueryConfig::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    #[ignore] // Requires network access and EPO_OPS_KEY / EPO_OPS_SECRET
    async fn test_epo_live() {
        let provider = EpoOpsProvider::from_env().unwrap();
        let query = cfg(QueryOverride { per_page: Some(5), max_pages: Some(1), ..Default::default() });
        let records = provider.fetch(&query).await.expect("EPO OPS fetch failed");
        println!("Found {} documents", records.len());
    }
}
