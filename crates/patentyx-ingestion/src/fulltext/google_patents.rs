//! Google Patents page scraper.
//!
//! Fetches `https://patents.google.com/patent/{doc}/en` and pulls the text
//! of the claims and description sections out of the HTML. The page is not
//! well-formed XML, so the reader runs with end-name checks disabled and
//! stops quietly at the first unrecoverable token.

use async_trait::async_trait;
use patentyx_common::sandbox::SandboxClient as Client;
use patentyx_common::{PatentyxError, Result};
use quick_xml::escape::resolve_html5_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, instrument, warn};

use super::{FullText, FullTextFetcher};

const GOOGLE_PATENTS_URL: &str = "https://patents.google.com/patent/{doc}/en";

pub struct GooglePatentsFetcher {
    client: Client,
    url_template: String,
}

impl GooglePatentsFetcher {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: Client::new()?,
            url_template: GOOGLE_PATENTS_URL.to_string(),
        })
    }

    /// `{doc}` in the template is replaced by the document number.
    pub fn with_url_template(mut self, template: &str) -> Self {
        self.url_template = template.to_string();
        self
    }

    fn url_for(&self, doc_number: &str) -> String {
        self.url_template.replace("{doc}", doc_number)
    }

    async fn scrape(&self, doc_number: &str) -> Result<FullText> {
        let url = self.url_for(doc_number);
        let resp = self
            .client
            .get(&url)?
            .send()
            .await
            .map_err(|e| PatentyxError::full_text(doc_number, e))?;

        let status = resp.status();
        if status.as_u16() >= 400 {
            return Err(PatentyxError::full_text(doc_number, format!("HTTP {status}")));
        }
        let html = resp
            .text()
            .await
            .map_err(|e| PatentyxError::full_text(doc_number, e))?;
        Ok(extract_sections(&html))
    }
}

#[async_trait]
impl FullTextFetcher for GooglePatentsFetcher {
    fn name(&self) -> &'static str {
        "google_patents"
    }

    #[instrument(skip(self))]
    async fn fetch(&self, doc_number: &str, _jurisdiction: &str) -> FullText {
        match self.scrape(doc_number).await {
            Ok(text) => {
                debug!(
                    claims = text.claims.is_some(),
                    description = text.description.is_some(),
                    "Google Patents scrape complete"
                );
                text
            }
            Err(e) => {
                warn!("Google Patents scrape failed for {}: {}", doc_number, e);
                FullText::default()
            }
        }
    }
}

// ── HTML section extraction ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
enum Capture {
    None,
    Claims,
    Description,
}

fn capture_for(tag: &BytesStart) -> Option<Capture> {
    for attr in tag.html_attributes().with_checks(false).flatten() {
        let key = attr.key.as_ref();
        if key != b"itemprop" && key != b"data-section" {
            continue;
        }
        match &*attr.value {
            b"claims" => return Some(Capture::Claims),
            b"description" => return Some(Capture::Description),
            _ => {}
        }
    }
    None
}

/// Extract claims and description text from a Google Patents page.
///
/// An element whose `itemprop` or `data-section` attribute is `claims` or
/// `description` starts capturing; the next closing `section` or `div`
/// stops it. Captured text nodes are trimmed and newline-joined.
pub fn extract_sections(html: &str) -> FullText {
    let mut reader = Reader::from_str(html);
    {
        let config = reader.config_mut();
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
    }

    let mut capture = Capture::None;
    let mut claims: Vec<String> = Vec::new();
    let mut description: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                if let Some(c) = capture_for(e) {
                    capture = c;
                }
            }
            Ok(Event::End(ref e)) => {
                let name = e.name();
                if matches!(name.as_ref(), b"section" | b"div") {
                    capture = Capture::None;
                }
            }
            Ok(Event::Text(ref e)) => {
                if capture == Capture::None {
                    continue;
                }
                let raw = match e.unescape_with(resolve_html5_entity) {
                    Ok(text) => text.into_owned(),
                    // Unknown entity or stray `&`: keep the node as written.
                    Err(_) => String::from_utf8_lossy(e).into_owned(),
                };
                let text = raw.trim();
                if text.is_empty() {
                    continue;
                }
                match capture {
                    Capture::Claims => claims.push(text.to_string()),
                    Capture::Description => description.push(text.to_string()),
                    Capture::None => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!(position = reader.buffer_position(), "HTML parse stopped early: {}", e);
                break;
            }
            _ => {}
        }
    }

    let join = |parts: Vec<String>| (!parts.is_empty()).then(|| parts.join("\n"));
    FullText::new(join(claims), join(description))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_both_sections() {
        let html = r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><title>US1 - Google Patents</title></head>
<body>
  <section itemprop="abstract"><p>Not captured</p></section>
  <section itemprop="claims">
    <p>1. A method of mRNA display.</p>
    <p>2. The method of claim 1 with flexizyme.</p>
  </section>
  <section data-section="description">
    <p>Background &amp; summary.</p><br>
    <p>Detailed&nbsp;description.</p>
  </section>
  <p>Footer text</p>
</body></html>"#;
        let text = extract_sections(html);
        assert_eq!(
            text.claims.as_deref(),
            Some("1. A method of mRNA display.\n2. The method of claim 1 with flexizyme.")
        );
        assert_eq!(
            text.description.as_deref(),
            Some("Background & summary.\nDetailed\u{a0}description.")
        );
    }

    #[test]
    fn test_decodes_mixed_html_entities() {
        let html = r#"<section itemprop="claims"><p>A&nbsp;B &amp; C &lt;D&gt; &eacute;&#233;&#x2013;</p></section>"#;
        let text = extract_sections(html);
        assert_eq!(text.claims.as_deref(), Some("A\u{a0}B & C <D> \u{e9}\u{e9}\u{2013}"));
    }

    #[test]
    fn test_closing_div_stops_capture() {
        let html = r#"<div itemprop="claims"><span>Claim text</span></div><span>Outside</span>"#;
        let text = extract_sections(html);
        assert_eq!(text.claims.as_deref(), Some("Claim text"));
        assert!(text.description.is_none());
    }

    #[test]
    fn test_page_without_sections() {
        assert!(extract_sections("<html><body><p>Nothing here</p></body></html>").is_empty());
        assert!(extract_sections("").is_empty());
    }

    #[test]
    fn test_url_template() {
        let fetcher = GooglePatentsFetcher::new()
            .unwrap()
            .with_url_template("http://localhost:8080/patent/{doc}");
        assert_eq!(fetcher.url_for("US10123456B2"), "http://localhost:8080/patent/US10123456B2");
    }

    #[tokio::test]
    async fn test_blocked_host_yields_empty_result() {
        let fetcher = GooglePatentsFetcher::new()
            .unwrap()
            .with_url_template("https://example.invalid/{doc}");
        assert!(fetcher.fetch("US1", "US").await.is_empty());
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_google_patents_live() {
        let fetcher = GooglePatentsFetcher::new().unwrap();
        let text = fetcher.fetch("US10676775B2", "US").await;
        println!("claims: {:?}", text.claims.as_ref().map(|c| c.len()));
    }
}
