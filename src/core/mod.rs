pub mod define;
pub mod tokenizer;

pub use define::TokenizerDefine;
pub use tokenizer::{
    utf16_len, LoadedTokenizer, TokenSpan, TokenStats, TokenizeOutput, TokenizerConfig, TokenizerInfo,
};

pub type Result<T> = anyhow::Result<T>;
