use thiserror::Error;

/// Why a tokenizer could not be resolved.
///
/// Cloneable so one failed load can be handed to every caller that was
/// waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    #[error("unknown tokenizer package: {0}")]
    UnknownPackage(String),

    #[error("Invalid repo name: {0:?}")]
    InvalidRepo(String),

    #[error("invalid tokenizer definition: {0}")]
    InvalidDefine(String),

    #[error("{}", fetch_message(.url, .status, .body))]
    Fetch { url: String, status: String, body: String },

    #[error("parse data {url} error: {message}")]
    Parse { url: String, message: String },

    #[error("read {url} failed: {message}")]
    Io { url: String, message: String },

    #[error("failed to build tokenizer: {0}")]
    Build(String),
}

fn fetch_message(url: &str, status: &str, body: &str) -> String {
    format!("fetch {} failed: {} \n{}", url, status, body).trim().to_string()
}

impl HubError {
    /// Errors caused by the request itself rather than by the source.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::UnknownPackage(_) | Self::InvalidRepo(_) | Self::InvalidDefine(_))
    }
}
