pub mod app;
pub mod core;
pub mod envconfig;
pub mod hub;
pub mod infra;
pub mod middleware;

pub use core::{
    LoadedTokenizer, Result, TokenSpan, TokenStats, TokenizeOutput, TokenizerDefine, TokenizerInfo,
};

pub use hub::{HubError, HubStatus, PackageCatalog, TokenizersHub};

pub use infra::{JsonFetcher, SourceFetcher};

pub use app::{Event, EventBus, EventHandler, Server};
