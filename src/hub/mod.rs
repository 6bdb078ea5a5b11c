//! The tokenizer hub: a process-wide cache of loaded tokenizers.
//!
//! Definitions resolve to shared [`LoadedTokenizer`] instances. Concurrent
//! requests for the same definition share one load; successes and failures
//! are counted and published on the hub's [`EventBus`].

pub mod error;
pub mod packages;

pub use error::HubError;
pub use packages::{Package, PackageCatalog, PACKAGE_NAMES};

use futures::future::{BoxFuture, FutureExt, Shared};
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::app::events::{Event, EventBus, LoggingHandler};
use crate::core::{LoadedTokenizer, TokenSpan, TokenizeOutput, TokenizerDefine, TokenizerInfo};
use crate::envconfig::Config;
use crate::infra::fetch::{JsonFetcher, SourceFetcher};

pub type LoadResult = Result<Arc<LoadedTokenizer>, HubError>;

type SharedLoad = Shared<BoxFuture<'static, LoadResult>>;

/// Upper bound on remembered failures; API clients can name any URL.
pub const MAX_RECORDED_ERRORS: usize = 256;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubStatus {
    /// Package tokenizers in the cache.
    pub loaded: usize,
    /// URL tokenizers in the cache.
    pub downloaded: usize,
    /// Definitions whose last load failed.
    pub errors: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RegistryStatus {
    pub loaded_pkg: Vec<String>,
    pub loaded_url: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompareOutput {
    pub left: TokenizeOutput,
    pub right: TokenizeOutput,
}

struct HubInner {
    catalog: PackageCatalog,
    fetcher: Arc<dyn JsonFetcher>,
    registry: RwLock<HashMap<TokenizerDefine, Arc<LoadedTokenizer>>>,
    errors: RwLock<HashMap<TokenizerDefine, HubError>>,
    inflight: Mutex<HashMap<TokenizerDefine, SharedLoad>>,
    events: EventBus,
}

#[derive(Clone)]
pub struct TokenizersHub {
    inner: Arc<HubInner>,
}

impl TokenizersHub {
    pub fn new(catalog: PackageCatalog, fetcher: Arc<dyn JsonFetcher>) -> Self {
        Self {
            inner: Arc::new(HubInner {
                catalog,
                fetcher,
                registry: RwLock::new(HashMap::new()),
                errors: RwLock::new(HashMap::new()),
                inflight: Mutex::new(HashMap::new()),
                events: EventBus::new(),
            }),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let fetcher = Arc::new(SourceFetcher::new(config.fetch_timeout));
        let hub = Self::new(PackageCatalog::new(config.packages_base.clone()), fetcher);
        hub.events().subscribe(LoggingHandler);
        hub
    }

    pub fn packages(&self) -> &PackageCatalog {
        &self.inner.catalog
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    /// Returns the cached instance for `define`, loading it on first use.
    ///
    /// Callers that arrive while a load for the same definition is running
    /// wait on that load and receive its result, success or failure.
    ///
    /// Malformed definitions and unknown package names fail before any load
    /// starts and are not recorded in [`errors`](Self::errors).
    pub async fn resolve(&self, define: &TokenizerDefine) -> LoadResult {
        define.validate()?;
        if let TokenizerDefine::Package { name } = define {
            if self.inner.catalog.find(name).is_none() {
                return Err(HubError::UnknownPackage(name.clone()));
            }
        }

        let load = {
            let mut inflight = self.inner.inflight.lock();
            if let Some(tokenizer) = self.inner.registry.read().get(define) {
                return Ok(Arc::clone(tokenizer));
            }
            match inflight.get(define) {
                Some(load) => load.clone(),
                None => {
                    let load = self.start_load(define.clone());
                    inflight.insert(define.clone(), load.clone());
                    load
                }
            }
        };

        load.await
    }

    /// Cached instance, without loading.
    pub fn get(&self, define: &TokenizerDefine) -> Option<Arc<LoadedTokenizer>> {
        self.inner.registry.read().get(define).cloned()
    }

    fn start_load(&self, define: TokenizerDefine) -> SharedLoad {
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(HubInner::load(Arc::clone(&inner), define.clone()));

        async move {
            match task.await {
                Ok(result) => result,
                Err(e) => {
                    let err = HubError::Build(format!("load task failed: {}", e));
                    inner.inflight.lock().remove(&define);
                    inner.record_failure(&define, &err);
                    Err(err)
                }
            }
        }
        .boxed()
        .shared()
    }

    pub fn tokenize(&self, text: &str, tokenizer: &LoadedTokenizer) -> crate::core::Result<Vec<TokenSpan>> {
        tokenizer.tokenize(text)
    }

    pub fn describe(&self, tokenizer: &LoadedTokenizer) -> TokenizerInfo {
        tokenizer.describe()
    }

    /// [`TokenizeOutput::run`] on the blocking pool; long texts decode one
    /// id at a time.
    pub async fn run(&self, tokenizer: Arc<LoadedTokenizer>, text: &str) -> crate::core::Result<TokenizeOutput> {
        let text = text.to_string();
        tokio::task::spawn_blocking(move || TokenizeOutput::run(&tokenizer, &text)).await?
    }

    /// Tokenizes the same text with two tokenizers.
    pub async fn compare(
        &self,
        text: &str,
        left: &TokenizerDefine,
        right: &TokenizerDefine,
    ) -> crate::core::Result<CompareOutput> {
        let (left, right) = futures::try_join!(self.resolve(left), self.resolve(right))?;
        let (left, right) = futures::try_join!(self.run(left, text), self.run(right, text))?;
        Ok(CompareOutput { left, right })
    }

    pub fn status(&self) -> HubStatus {
        self.inner.status()
    }

    pub fn registry_status(&self) -> RegistryStatus {
        let registry = self.inner.registry.read();
        let mut status = RegistryStatus::default();
        for define in registry.keys() {
            match define {
                TokenizerDefine::Package { name } => status.loaded_pkg.push(name.clone()),
                TokenizerDefine::Url { json_url, .. } => status.loaded_url.push(json_url.clone()),
            }
        }
        status.loaded_pkg.sort();
        status.loaded_url.sort();
        status
    }

    /// Last failure per definition key.
    pub fn errors(&self) -> BTreeMap<String, String> {
        self.inner
            .errors
            .read()
            .iter()
            .map(|(define, err)| (define.key(), err.to_string()))
            .collect()
    }

    pub fn last_error(&self, define: &TokenizerDefine) -> Option<HubError> {
        self.inner.errors.read().get(define).cloned()
    }
}

impl HubInner {
    async fn load(inner: Arc<HubInner>, define: TokenizerDefine) -> LoadResult {
        inner.events.publish(Event::TokenizerLoading { key: define.key() });

        let result = inner.fetch_and_build(&define).await.map(Arc::new);
        match &result {
            Ok(tokenizer) => {
                inner.registry.write().insert(define.clone(), Arc::clone(tokenizer));
                inner.errors.write().remove(&define);
                inner.inflight.lock().remove(&define);
                inner.events.publish(Event::TokenizerLoaded {
                    key: define.key(),
                    status: inner.status(),
                });
            }
            Err(e) => {
                inner.inflight.lock().remove(&define);
                inner.record_failure(&define, e);
            }
        }

        result
    }

    async fn fetch_and_build(&self, define: &TokenizerDefine) -> Result<LoadedTokenizer, HubError> {
        let (json_url, config_url) = match define {
            TokenizerDefine::Package { name } => {
                let package = self
                    .catalog
                    .find(name)
                    .ok_or_else(|| HubError::UnknownPackage(name.clone()))?;
                (package.json_url.clone(), package.config_url.clone())
            }
            TokenizerDefine::Url { json_url, config_url } => (json_url.clone(), config_url.clone()),
        };

        let (tokenizer_json, config_json) = futures::try_join!(
            self.fetcher.fetch_json(&json_url),
            self.fetcher.fetch_json(&config_url),
        )?;

        let define = define.clone();
        tokio::task::spawn_blocking(move || LoadedTokenizer::from_json(define, &tokenizer_json, config_json))
            .await
            .map_err(|e| HubError::Build(e.to_string()))?
    }

    fn record_failure(&self, define: &TokenizerDefine, err: &HubError) {
        {
            let mut errors = self.errors.write();
            if errors.len() >= MAX_RECORDED_ERRORS && !errors.contains_key(define) {
                // Full: forget an arbitrary older failure.
                if let Some(evicted) = errors.keys().next().cloned() {
                    errors.remove(&evicted);
                }
            }
            errors.insert(define.clone(), err.clone());
        }
        self.events.publish(Event::TokenizerFailed {
            key: define.key(),
            error: err.to_string(),
            status: self.status(),
        });
    }

    fn status(&self) -> HubStatus {
        let registry = self.registry.read();
        let loaded = registry.keys().filter(|d| d.is_package()).count();
        HubStatus {
            loaded,
            downloaded: registry.len() - loaded,
            errors: self.errors.read().len(),
        }
    }
}

pub static HUB: Lazy<TokenizersHub> = Lazy::new(|| TokenizersHub::from_config(&Config::from_env()));

/// The process-wide hub, configured from the environment on first use.
pub fn instance() -> &'static TokenizersHub {
    &HUB
}

pub async fn resolve(define: &TokenizerDefine) -> LoadResult {
    HUB.resolve(define).await
}

pub fn status() -> HubStatus {
    HUB.status()
}
