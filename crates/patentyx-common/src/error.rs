use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatentyxError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Provider {provider} fetch failed: {reason}")]
    ProviderFetch { provider: String, reason: String },

    #[error("Full-text fetch failed for {doc_number}: {reason}")]
    FullTextFetch { doc_number: String, reason: String },

    #[error("Malformed manual record ({location}): {reason}")]
    MalformedManualRecord { location: String, reason: String },

    #[error("Security error: {0}")]
    Security(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PatentyxError {
    pub fn provider(provider: &str, reason: impl std::fmt::Display) -> Self {
        PatentyxError::ProviderFetch {
            provider: provider.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn full_text(doc_number: &str, reason: impl std::fmt::Display) -> Self {
        PatentyxError::FullTextFetch {
            doc_number: doc_number.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PatentyxError>;
