use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::hub::HubError;

const HF_BASE: &str = "https://huggingface.co";

static REPO_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_.-]+/[a-zA-Z0-9_.-]+$").expect("valid repo regex"));

/// Where a tokenizer comes from.
///
/// Two definitions name the same tokenizer when they are equal: packages by
/// name, URL pairs by the exact pair of URLs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TokenizerDefine {
    Package { name: String },
    Url { json_url: String, config_url: String },
}

impl TokenizerDefine {
    pub fn package(name: impl Into<String>) -> Self {
        Self::Package { name: name.into() }
    }

    pub fn url(json_url: impl Into<String>, config_url: impl Into<String>) -> Self {
        Self::Url {
            json_url: json_url.into(),
            config_url: config_url.into(),
        }
    }

    /// Builds a URL pair pointing at the `main` revision of a hub repository,
    /// e.g. `meta-llama/Llama-3.2-1B`.
    pub fn from_repo(repo: &str) -> Result<Self, HubError> {
        let repo = repo.trim();
        if !REPO_NAME.is_match(repo) || repo.split('/').any(|part| part == "." || part == "..") {
            return Err(HubError::InvalidRepo(repo.to_string()));
        }

        Ok(Self::url(
            format!("{}/{}/resolve/main/tokenizer.json?download=true", HF_BASE, repo),
            format!("{}/{}/resolve/main/tokenizer_config.json?download=true", HF_BASE, repo),
        ))
    }

    pub fn validate(&self) -> Result<(), HubError> {
        match self {
            Self::Package { name } if name.trim().is_empty() => {
                Err(HubError::InvalidDefine("package name is empty".to_string()))
            }
            Self::Url { json_url, config_url } if json_url.trim().is_empty() || config_url.trim().is_empty() => {
                Err(HubError::InvalidDefine("both json_url and config_url are required".to_string()))
            }
            _ => Ok(()),
        }
    }

    /// Like [`validate`](Self::validate), and URL pairs must point at
    /// `http`/`https`. Used for definitions that come from API clients, which
    /// must not reach the server's filesystem.
    pub fn validate_remote(&self) -> Result<(), HubError> {
        self.validate()?;
        if let Self::Url { json_url, config_url } = self {
            for source in [json_url, config_url] {
                let remote = url::Url::parse(source)
                    .map(|u| matches!(u.scheme(), "http" | "https"))
                    .unwrap_or(false);
                if !remote {
                    return Err(HubError::InvalidDefine(format!(
                        "only http(s) sources are accepted, got {:?}",
                        source
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn is_package(&self) -> bool {
        matches!(self, Self::Package { .. })
    }

    /// Short label for display: the package name, or the file stem of the
    /// JSON URL.
    pub fn display_name(&self) -> String {
        match self {
            Self::Package { name } => name.clone(),
            Self::Url { json_url, .. } => {
                let path = json_url.split(['?', '#']).next().unwrap_or(json_url);
                let file = path.rsplit('/').next().unwrap_or(path);
                match file.rfind('.') {
                    Some(dot) if dot > 0 => file[..dot].to_string(),
                    _ => file.to_string(),
                }
            }
        }
    }

    /// Key under which loads and failures are tracked.
    pub fn key(&self) -> String {
        match self {
            Self::Package { name } => format!("package:{}", name),
            Self::Url { json_url, config_url } => format!("url:{} {}", json_url, config_url),
        }
    }
}

impl fmt::Display for TokenizerDefine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Package { name } => write!(f, "package {}", name),
            Self::Url { json_url, .. } => write!(f, "url {}", json_url),
        }
    }
}
