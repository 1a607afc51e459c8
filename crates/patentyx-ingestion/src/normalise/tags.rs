//! Technical component tagging.

use regex::{Regex, RegexBuilder};
use serde_json::Value;
use tracing::warn;

/// Env var holding a JSON object of extra or replacement patterns.
pub const PATTERNS_ENV: &str = "PATENTYX_COMPONENT_PATTERNS";

const DEFAULT_PATTERNS: &[(&str, &str)] = &[
    ("n_methylation", r"\bn-?methyl"),
    ("non_canonical_amino_acid", r"\bnon[-\s]?canonical amino"),
    ("cyclization", r"\bcycli[sz]ation"),
    ("flexizyme", r"\bflexizyme"),
    ("rapid_platform", r"\brapid platform"),
];

/// Ordered tag → case-insensitive pattern table.
#[derive(Debug, Clone)]
pub struct ComponentPatterns {
    patterns: Vec<(String, Regex)>,
}

impl Default for ComponentPatterns {
    fn default() -> Self {
        let mut table = Self { patterns: Vec::new() };
        for (tag, pattern) in DEFAULT_PATTERNS {
            table.insert(tag, pattern);
        }
        table
    }
}

impl ComponentPatterns {
    pub fn empty() -> Self {
        Self { patterns: Vec::new() }
    }

    /// Add or replace one pattern. A replaced tag keeps its position.
    /// Returns `false` (and logs) when the regex does not compile.
    pub fn insert(&mut self, tag: &str, pattern: &str) -> bool {
        let regex = match RegexBuilder::new(pattern).case_insensitive(true).build() {
            Ok(r) => r,
            Err(e) => {
                warn!(tag, "Ignoring invalid component pattern: {}", e);
                return false;
            }
        };
        match self.patterns.iter_mut().find(|(t, _)| t == tag) {
            Some(slot) => slot.1 = regex,
            None => self.patterns.push((tag.to_string(), regex)),
        }
        true
    }

    /// Layer a JSON object of `tag → pattern` on top of this table.
    /// Malformed JSON and non-string values are logged and skipped.
    pub fn with_overrides_json(mut self, json: &str) -> Self {
        let parsed: Value = match serde_json::from_str(json) {
            Ok(v) => v,
            Err(e) => {
                warn!("{} is not valid JSON; ignoring: {}", PATTERNS_ENV, e);
                return self;
            }
        };
        let Some(map) = parsed.as_object() else {
            warn!("{} must be a JSON object; ignoring", PATTERNS_ENV);
            return self;
        };
        for (tag, pattern) in map {
            match pattern.as_str() {
                Some(p) => {
                    self.insert(tag, p);
                }
                None => warn!(tag = %tag, "Component pattern must be a string; skipping"),
            }
        }
        self
    }

    /// Defaults plus whatever `PATENTYX_COMPONENT_PATTERNS` adds.
    pub fn from_env() -> Self {
        match std::env::var(PATTERNS_ENV) {
            Ok(json) if !json.trim().is_empty() => Self::default().with_overrides_json(&json),
            _ => Self::default(),
        }
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|(t, _)| t.as_str())
    }

    /// Tags whose pattern matches `text`, in table order.
    pub fn detect(&self, text: &str) -> Vec<String> {
        self.patterns
            .iter()
            .filter(|(_, re)| re.is_match(text))
            .map(|(tag, _)| tag.clone())
            .collect()
    }
}
