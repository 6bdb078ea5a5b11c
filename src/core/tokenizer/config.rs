use serde::{Deserialize, Serialize};

/// The parts of `tokenizer_config.json` the playground reads. Everything
/// else in the file is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenizerConfig {
    #[serde(default)]
    pub chat_template: Option<ChatTemplate>,
    #[serde(default)]
    pub bos_token: Option<SpecialToken>,
    #[serde(default)]
    pub eos_token: Option<SpecialToken>,
    #[serde(default)]
    pub pad_token: Option<SpecialToken>,
    #[serde(default)]
    pub unk_token: Option<SpecialToken>,
    #[serde(default)]
    pub tokenizer_class: Option<String>,
    #[serde(default)]
    pub model_max_length: Option<f64>,
}

impl TokenizerConfig {
    pub fn from_value(value: serde_json::Value) -> serde_json::Result<Self> {
        // Some repositories ship an empty file or a bare `null`.
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value)
    }

    pub fn pad_token(&self) -> Option<&str> {
        self.pad_token.as_ref().map(SpecialToken::content)
    }

    /// Falls back to the pad token when the config names no bos token.
    pub fn bos_token(&self) -> Option<&str> {
        self.bos_token.as_ref().map(SpecialToken::content).or_else(|| self.pad_token())
    }

    /// Falls back to the pad token when the config names no eos token.
    pub fn eos_token(&self) -> Option<&str> {
        self.eos_token.as_ref().map(SpecialToken::content).or_else(|| self.pad_token())
    }
}

/// A special token is either a bare string or an added-token object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpecialToken {
    Text(String),
    Added { content: String },
}

impl SpecialToken {
    pub fn content(&self) -> &str {
        match self {
            Self::Text(s) => s,
            Self::Added { content } => content,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatTemplate {
    Single(String),
    Named(Vec<NamedTemplate>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedTemplate {
    pub name: String,
    pub template: String,
}

impl ChatTemplate {
    /// The template shown by default: the one named `default`, else the
    /// first named one.
    pub fn default_template(&self) -> Option<&str> {
        match self {
            Self::Single(t) => Some(t),
            Self::Named(list) => list
                .iter()
                .find(|t| t.name == "default")
                .or_else(|| list.first())
                .map(|t| t.template.as_str()),
        }
    }
}
