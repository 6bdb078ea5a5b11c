pub mod config;
pub mod info;
pub mod span;

pub use config::{ChatTemplate, NamedTemplate, SpecialToken, TokenizerConfig};
pub use info::TokenizerInfo;
pub use span::{reconstruct_spans, utf16_len, TokenSpan, TokenStats};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokenizers::models::ModelWrapper;

use crate::core::TokenizerDefine;
use crate::hub::HubError;

/// A tokenizer built by the external `tokenizers` library together with the
/// config it was shipped with.
pub struct LoadedTokenizer {
    define: TokenizerDefine,
    inner: tokenizers::Tokenizer,
    config: TokenizerConfig,
    loaded_at: DateTime<Utc>,
}

impl LoadedTokenizer {
    pub fn new(define: TokenizerDefine, inner: tokenizers::Tokenizer, config: TokenizerConfig) -> Self {
        Self {
            define,
            inner,
            config,
            loaded_at: Utc::now(),
        }
    }

    /// Builds an instance from the two fetched documents.
    pub fn from_json(
        define: TokenizerDefine,
        tokenizer_json: &serde_json::Value,
        config_json: serde_json::Value,
    ) -> Result<Self, HubError> {
        let bytes = serde_json::to_vec(tokenizer_json).map_err(|e| HubError::Build(e.to_string()))?;
        let inner = tokenizers::Tokenizer::from_bytes(bytes).map_err(|e| HubError::Build(e.to_string()))?;

        let config = TokenizerConfig::from_value(config_json).map_err(|e| HubError::Parse {
            url: config_source(&define),
            message: e.to_string(),
        })?;

        Ok(Self::new(define, inner, config))
    }

    pub fn define(&self) -> &TokenizerDefine {
        &self.define
    }

    pub fn config(&self) -> &TokenizerConfig {
        &self.config
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn inner(&self) -> &tokenizers::Tokenizer {
        &self.inner
    }

    pub fn encode(&self, text: &str) -> crate::core::Result<Vec<u32>> {
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| anyhow::anyhow!("encode failed: {}", e))?;
        Ok(encoding.get_ids().to_vec())
    }

    /// Decodes a single id, keeping special tokens.
    pub fn decode_single(&self, id: u32) -> crate::core::Result<String> {
        self.inner
            .decode(&[id], false)
            .map_err(|e| anyhow::anyhow!("decode of id {} failed: {}", id, e))
    }

    /// Splits `text` into token spans. Special tokens are not added; offsets
    /// come from [`reconstruct_spans`].
    pub fn tokenize(&self, text: &str) -> crate::core::Result<Vec<TokenSpan>> {
        let ids = self.encode(text)?;
        let decoded = ids
            .into_iter()
            .map(|id| self.decode_single(id).map(|token| (id, token)))
            .collect::<crate::core::Result<Vec<_>>>()?;

        Ok(reconstruct_spans(decoded))
    }

    pub fn describe(&self) -> TokenizerInfo {
        TokenizerInfo {
            name: self.define.display_name(),
            model_type: self.model_type().to_string(),
            vocab_size: self.inner.get_vocab_size(false),
            added_tokens: self.inner.get_added_tokens_decoder().len(),
            chat_template: self.config.chat_template.clone(),
            pad_token: self.config.pad_token().map(str::to_string),
            bos_token: self.config.bos_token().map(str::to_string),
            eos_token: self.config.eos_token().map(str::to_string),
        }
    }

    pub fn model_type(&self) -> &'static str {
        match self.inner.get_model() {
            ModelWrapper::BPE(_) => "BPE",
            ModelWrapper::WordPiece(_) => "WordPiece",
            ModelWrapper::WordLevel(_) => "WordLevel",
            ModelWrapper::Unigram(_) => "Unigram",
        }
    }
}

impl std::fmt::Debug for LoadedTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedTokenizer")
            .field("define", &self.define)
            .field("model_type", &self.model_type())
            .field("loaded_at", &self.loaded_at)
            .finish()
    }
}

/// Tokenization of one text by one tokenizer.
#[derive(Debug, Clone, Serialize)]
pub struct TokenizeOutput {
    pub name: String,
    pub tokens: Vec<TokenSpan>,
    pub stats: TokenStats,
}

impl TokenizeOutput {
    pub fn run(tokenizer: &LoadedTokenizer, text: &str) -> crate::core::Result<Self> {
        let tokens = tokenizer.tokenize(text)?;
        let stats = TokenStats::new(text, &tokens);
        Ok(Self {
            name: tokenizer.define().display_name(),
            tokens,
            stats,
        })
    }
}

fn config_source(define: &TokenizerDefine) -> String {
    match define {
        TokenizerDefine::Package { name } => format!("{}/tokenizer_config.json", name),
        TokenizerDefine::Url { config_url, .. } => config_url.clone(),
    }
}
