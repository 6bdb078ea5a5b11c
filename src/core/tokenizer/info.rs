use serde::{Deserialize, Serialize};

use super::config::ChatTemplate;

/// Display metadata for a loaded tokenizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenizerInfo {
    pub name: String,
    pub model_type: String,
    pub vocab_size: usize,
    pub added_tokens: usize,
    pub chat_template: Option<ChatTemplate>,
    pub pad_token: Option<String>,
    pub bos_token: Option<String>,
    pub eos_token: Option<String>,
}

impl TokenizerInfo {
    pub fn default_chat_template(&self) -> Option<&str> {
        self.chat_template.as_ref().and_then(ChatTemplate::default_template)
    }

    /// Key/value rows in display order.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        let or_dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
        vec![
            ("name", self.name.clone()),
            ("model_type", self.model_type.clone()),
            ("vocab_size", self.vocab_size.to_string()),
            ("added_tokens", self.added_tokens.to_string()),
            ("pad_token", or_dash(&self.pad_token)),
            ("bos_token", or_dash(&self.bos_token)),
            ("eos_token", or_dash(&self.eos_token)),
            (
                "chat_template",
                self.default_chat_template()
                    .map(str::to_string)
                    .unwrap_or_else(|| "No chat template provided.".to_string()),
            ),
        ]
    }
}
