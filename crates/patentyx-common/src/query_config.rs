//! Query configuration shared by every patent provider.
//!
//! A run's [`QueryConfig`] is built once by overlaying a partial user
//! document ([`QueryOverride`]) onto an explicit set of [`QueryDefaults`].
//! Present override fields replace the default wholesale; lists are only
//! de-duplicated within themselves, keeping first-seen order.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PatentyxError, Result};

// ── Defaults ──────────────────────────────────────────────────────────────────

/// Built-in search defaults (mRNA-display patent landscape).
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDefaults {
    pub keywords: Vec<String>,
    pub synonyms: Vec<String>,
    pub cpc_prefixes: Vec<String>,
    pub ipc_prefixes: Vec<String>,
    pub applicants: Vec<String>,
    pub exclude_applicants: Vec<String>,
    pub per_page: usize,
    pub max_pages: usize,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            keywords: strings(&[
                "\"mRNA display\"",
                "\"messenger RNA display\"",
                "\"displayed mRNA-peptide fusion\"",
            ]),
            synonyms: strings(&[
                "\"ribosome display\"",
                "\"flexizyme\"",
                "\"mRNA-peptide fusion\"",
                "\"RaPID platform\"",
            ]),
            cpc_prefixes: strings(&["C07K", "C12N", "C12P", "G01N"]),
            ipc_prefixes: strings(&["C12N", "G01N"]),
            applicants: strings(&[
                "Moderna",
                "Ra Pharmaceuticals",
                "PeptiDream",
                "Hoffmann-La Roche",
                "Chugai Pharmaceutical",
            ]),
            exclude_applicants: vec![],
            per_page: 100,
            max_pages: 10,
        }
    }
}

// ── Override document ─────────────────────────────────────────────────────────

/// A partial configuration document. Absent keys fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOverride {
    pub keywords: Option<Vec<String>>,
    pub synonyms: Option<Vec<String>>,
    #[serde(alias = "cpcPrefixes")]
    pub cpc_prefixes: Option<Vec<String>>,
    #[serde(alias = "ipcPrefixes")]
    pub ipc_prefixes: Option<Vec<String>>,
    pub applicants: Option<Vec<String>>,
    #[serde(alias = "excludeApplicants")]
    pub exclude_applicants: Option<Vec<String>>,
    #[serde(alias = "perPage")]
    pub per_page: Option<usize>,
    #[serde(alias = "maxPages")]
    pub max_pages: Option<usize>,
}

/// Document formats accepted for an override file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
    Toml,
}

impl ConfigFormat {
    /// Picks the format from the file extension; anything unknown is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => ConfigFormat::Yaml,
            Some("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

impl QueryOverride {
    /// Parse an override document in the given format.
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        let parsed = match format {
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        };
        parsed.map_err(|e| PatentyxError::Config(format!("invalid query override ({format:?}): {e}")))
    }

    /// Read and parse an override file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PatentyxError::Config(format!("cannot read query override {}: {e}", path.display()))
        })?;
        Self::parse(&content, ConfigFormat::from_path(path))
    }

    /// Layer `other` on top of `self`; fields present in `other` win.
    pub fn merge(self, other: QueryOverride) -> QueryOverride {
        QueryOverride {
            keywords: other.keywords.or(self.keywords),
            synonyms: other.synonyms.or(self.synonyms),
            cpc_prefixes: other.cpc_prefixes.or(self.cpc_prefixes),
            ipc_prefixes: other.ipc_prefixes.or(self.ipc_prefixes),
            applicants: other.applicants.or(self.applicants),
            exclude_applicants: other.exclude_applicants.or(self.exclude_applicants),
            per_page: other.per_page.or(self.per_page),
            max_pages: other.max_pages.or(self.max_pages),
        }
    }
}

// ── Effective configuration ───────────────────────────────────────────────────

/// Search configuration shared by all providers. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryConfig {
    keywords: Vec<String>,
    synonyms: Vec<String>,
    cpc_prefixes: Vec<String>,
    ipc_prefixes: Vec<String>,
    applicants: Vec<String>,
    exclude_applicants: Vec<String>,
    per_page: usize,
    max_pages: usize,
}

/// Order-preserving de-duplication.
pub fn dedupe<I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

fn pick(value: Option<Vec<String>>, default: &[String]) -> Vec<String> {
    dedupe(value.unwrap_or_else(|| default.to_vec()))
}

impl QueryConfig {
    /// Overlay `overrides` onto `defaults`.
    pub fn from_override(defaults: &QueryDefaults, overrides: QueryOverride) -> Self {
        Self {
            keywords: pick(overrides.keywords, &defaults.keywords),
            synonyms: pick(overrides.synonyms, &defaults.synonyms),
            cpc_prefixes: pick(overrides.cpc_prefixes, &defaults.cpc_prefixes),
            ipc_prefixes: pick(overrides.ipc_prefixes, &defaults.ipc_prefixes),
            applicants: pick(overrides.applicants, &defaults.applicants),
            exclude_applicants: pick(overrides.exclude_applicants, &defaults.exclude_applicants),
            per_page: overrides.per_page.unwrap_or(defaults.per_page),
            max_pages: overrides.max_pages.unwrap_or(defaults.max_pages),
        }
    }

    /// Load from an optional override file; `None` yields the defaults.
    pub fn load(defaults: &QueryDefaults, path: Option<&Path>) -> Result<Self> {
        let overrides = match path {
            Some(p) => QueryOverride::from_path(p)?,
            None => QueryOverride::default(),
        };
        Ok(Self::from_override(defaults, overrides))
    }

    /// Keywords followed by synonyms, de-duplicated in first-seen order.
    pub fn phrases(&self) -> Vec<String> {
        dedupe(self.keywords.iter().chain(self.synonyms.iter()).cloned())
    }

    pub fn keywords(&self) -> &[String] { &self.keywords }
    pub fn synonyms(&self) -> &[String] { &self.synonyms }
    pub fn cpc_prefixes(&self) -> &[String] { &self.cpc_prefixes }
    pub fn ipc_prefixes(&self) -> &[String] { &self.ipc_prefixes }
    pub fn applicants(&self) -> &[String] { &self.applicants }
    pub fn exclude_applicants(&self) -> &[String] { &self.exclude_applicants }
    pub fn per_page(&self) -> usize { self.per_page }
    pub fn max_pages(&self) -> usize { self.max_pages }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self::from_override(&QueryDefaults::default(), QueryOverride::default())
    }
}
