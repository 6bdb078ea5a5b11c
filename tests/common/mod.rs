#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokscope::hub::{HubError, PackageCatalog, TokenizersHub};
use tokscope::JsonFetcher;

pub const PACKAGE_BASE: &str = "mem://packages";

/// Serves JSON documents from memory and counts every fetch.
#[derive(Default)]
pub struct MemoryFetcher {
    docs: Mutex<HashMap<String, Value>>,
    fetches: AtomicUsize,
    delay: Option<Duration>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn insert(&self, url: &str, doc: Value) {
        self.docs.lock().insert(url.to_string(), doc);
    }

    /// Registers a tokenizer pair under `json_url` / `config_url`.
    pub fn insert_pair(&self, json_url: &str, config_url: &str) {
        self.insert(json_url, word_level_json());
        self.insert(config_url, config_json());
    }

    pub fn insert_package(&self, name: &str) {
        self.insert_pair(
            &format!("{}/{}/tokenizer.json", PACKAGE_BASE, name),
            &format!("{}/{}/tokenizer_config.json", PACKAGE_BASE, name),
        );
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JsonFetcher for MemoryFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value, HubError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let doc = self.docs.lock().get(url).cloned();
        doc.ok_or_else(|| HubError::Fetch {
            url: url.to_string(),
            status: "404 Not Found".to_string(),
            body: String::new(),
        })
    }
}

pub fn hub_with(fetcher: Arc<MemoryFetcher>, packages: &[&str]) -> TokenizersHub {
    let catalog = PackageCatalog::with_names(PACKAGE_BASE, packages.iter().copied());
    TokenizersHub::new(catalog, fetcher)
}

pub fn word_level_json() -> Value {
    let added = |id: u32, content: &str| {
        json!({
            "id": id,
            "content": content,
            "single_word": false,
            "lstrip": false,
            "rstrip": false,
            "normalized": false,
            "special": true
        })
    };
    json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [added(0, "[UNK]"), added(1, "<s>"), added(2, "</s>")],
        "normalizer": null,
        "pre_tokenizer": {"type": "Whitespace"},
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": {
                "[UNK]": 0, "<s>": 1, "</s>": 2,
                "Potato": 3, "potato": 4, "tomato": 5, ".": 6
            },
            "unk_token": "[UNK]"
        }
    })
}

pub fn config_json() -> Value {
    json!({
        "bos_token": "<s>",
        "eos_token": {"content": "</s>", "special": true},
        "chat_template": "{% for m in messages %}{{ m.content }}{% endfor %}"
    })
}
