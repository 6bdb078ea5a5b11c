pub mod fetch;

pub use fetch::{JsonFetcher, SourceFetcher};
