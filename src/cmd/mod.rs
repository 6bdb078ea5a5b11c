use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;

use crate::format::{escape_token, human_number, stats_line};
use crate::progress::Progress;
use tokscope::envconfig::{Config, Host};
use tokscope::hub::{self, TokenizersHub};
use tokscope::{LoadedTokenizer, Server, TokenizeOutput, TokenizerDefine};

pub async fn serve(host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = Config::from_env();
    if let Some(host) = host {
        let port = config.host.port;
        config.host = Host::parse(&host);
        if !host.contains(':') {
            config.host.port = port;
        }
    }
    if let Some(port) = port {
        config.host.port = port;
    }

    tracing::info!("serving packages from {}", config.packages_base);
    Server::from_config(hub::instance().clone(), &config).run().await
}

pub async fn packages() -> Result<()> {
    let hub = hub::instance();
    println!("{:<24} SOURCE", "NAME");
    println!("{}", "-".repeat(80));
    for package in hub.packages().packages() {
        println!("{:<24} {}", package.name, package.json_url);
    }
    Ok(())
}

pub async fn tokenize(define: &TokenizerDefine, text: Option<String>, json: bool) -> Result<()> {
    let text = read_text(text).await?;
    let tokenizer = load(hub::instance(), define).await?;
    let output = TokenizeOutput::run(&tokenizer, &text)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_tokens(&output);
    Ok(())
}

pub async fn info(define: &TokenizerDefine, json: bool) -> Result<()> {
    let hub = hub::instance();
    let tokenizer = load(hub, define).await?;
    let info = hub.describe(&tokenizer);

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("Tokenizer info: {}", info.name);
    for (key, value) in info.rows() {
        let value = match key {
            "vocab_size" => format!("{} ({})", human_number(info.vocab_size as u64), value),
            _ => value,
        };
        if value.contains('\n') {
            println!("{:<14}\n{}", key, value);
        } else {
            println!("{:<14} {}", key, value);
        }
    }
    Ok(())
}

pub async fn compare(left: &TokenizerDefine, right: &TokenizerDefine, text: Option<String>, json: bool) -> Result<()> {
    let text = read_text(text).await?;

    let hub = hub::instance();
    let mut progress = Progress::new();
    progress.spinner(&format!("Loading {} and {}", left.display_name(), right.display_name()));
    let result = hub.compare(&text, left, right).await;
    progress.stop_and_clear();
    let output = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for side in [&output.left, &output.right] {
        println!("== {}", side.name);
        print_tokens(side);
        println!();
    }
    Ok(())
}

/// One side of `compare`. With a config source, `value` is the
/// tokenizer.json URL or path; otherwise see [`parse_define`].
pub fn side_define(value: &str, config: Option<String>) -> Result<TokenizerDefine> {
    match config {
        Some(config) => Ok(TokenizerDefine::url(value, config)),
        None => parse_define(value),
    }
}

/// `owner/name` is a hub repository, anything else a package name.
fn parse_define(value: &str) -> Result<TokenizerDefine> {
    if value.contains('/') {
        Ok(TokenizerDefine::from_repo(value)?)
    } else {
        Ok(TokenizerDefine::package(value))
    }
}

async fn load(hub: &TokenizersHub, define: &TokenizerDefine) -> Result<std::sync::Arc<LoadedTokenizer>> {
    let mut progress = Progress::new();
    progress.spinner(&format!("Loading tokenizer {}", define.display_name()));
    let result = hub.resolve(define).await;
    progress.stop_and_clear();

    result.with_context(|| format!("could not load {}", define))
}

async fn read_text(text: Option<String>) -> Result<String> {
    match text {
        Some(text) => Ok(text),
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("reading text from stdin")?;
            Ok(buf)
        }
    }
}

fn print_tokens(output: &TokenizeOutput) {
    println!("{:>8} {:>13}  TOKEN", "ID", "SPAN");
    for token in &output.tokens {
        println!(
            "{:>8} {:>13}  {}",
            token.id,
            format!("{}..{}", token.start, token.end),
            escape_token(&token.token)
        );
    }
    println!("{}", stats_line(&output.stats));
}
