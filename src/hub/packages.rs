use serde::Serialize;

use crate::core::TokenizerDefine;

pub const PACKAGE_NAMES: &[&str] = &[
    "gemma2",
    "qwen2_5",
    "aya_expanse",
    "llama3_2",
    "mistral_nemo",
    "gemini",
    "llama3_1",
    "llama2",
    "llama3",
    "gpt4o",
    "gpt4",
    "gpt35turbo",
    "gpt35turbo16k",
    "gpt3",
    "gemma",
    "claude",
    "claude1",
    "gpt2",
    "baichuan2",
    "chatglm3",
    "command_r_plus",
    "internlm2",
    "qwen1_5",
    "yi",
    "text_davinci002",
    "text_davinci003",
    "text_embedding_ada002",
    "deepseek_v3",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Package {
    pub name: String,
    pub json_url: String,
    pub config_url: String,
}

/// The bundled tokenizer packages, sorted by name. Each package is a
/// `tokenizer.json` / `tokenizer_config.json` pair under `{base}/{name}/`.
#[derive(Debug, Clone)]
pub struct PackageCatalog {
    base: String,
    packages: Vec<Package>,
}

impl PackageCatalog {
    pub fn new(base: impl Into<String>) -> Self {
        Self::with_names(base, PACKAGE_NAMES.iter().copied())
    }

    pub fn with_names<'a>(base: impl Into<String>, names: impl IntoIterator<Item = &'a str>) -> Self {
        let base = base.into().trim_end_matches('/').to_string();
        let mut packages: Vec<Package> = names
            .into_iter()
            .map(|name| Package {
                name: name.to_string(),
                json_url: format!("{}/{}/tokenizer.json", base, name),
                config_url: format!("{}/{}/tokenizer_config.json", base, name),
            })
            .collect();
        packages.sort_by(|a, b| a.name.cmp(&b.name));
        packages.dedup_by(|a, b| a.name == b.name);

        Self { base, packages }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    pub fn find(&self, name: &str) -> Option<&Package> {
        self.packages
            .binary_search_by(|p| p.name.as_str().cmp(name))
            .ok()
            .map(|i| &self.packages[i])
    }

    pub fn defines(&self) -> impl Iterator<Item = TokenizerDefine> + '_ {
        self.packages.iter().map(|p| TokenizerDefine::package(p.name.clone()))
    }
}
