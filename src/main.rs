mod cmd;
mod format;
mod progress;

use clap::{Args, Parser, Subcommand};
use std::process;
use tracing_subscriber::EnvFilter;

use tokscope::TokenizerDefine;

#[derive(Parser)]
#[command(name = "tokscope")]
#[command(version)]
#[command(about = "See how pre-trained tokenizers split text", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the JSON API
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// List bundled tokenizer packages
    #[command(alias = "ls")]
    Packages,
    /// Split text into tokens
    Tokenize {
        #[command(flatten)]
        source: Source,
        /// Text to tokenize; read from stdin when omitted
        text: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Show vocabulary size, special tokens and chat template
    Info {
        #[command(flatten)]
        source: Source,
        #[arg(long)]
        json: bool,
    },
    /// Tokenize the same text with two tokenizers
    Compare {
        /// Package name, owner/repo, or tokenizer.json URL when --left-config is set
        #[arg(long)]
        left: String,
        /// tokenizer_config.json for a URL or path given as --left
        #[arg(long)]
        left_config: Option<String>,
        /// Package name, owner/repo, or tokenizer.json URL when --right-config is set
        #[arg(long)]
        right: String,
        /// tokenizer_config.json for a URL or path given as --right
        #[arg(long)]
        right_config: Option<String>,
        text: Option<String>,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct Source {
    /// Bundled package name, e.g. gpt4o
    #[arg(short, long)]
    package: Option<String>,
    /// Hub repository, e.g. openai-community/gpt2
    #[arg(short, long)]
    repo: Option<String>,
    /// URL or path of tokenizer.json
    #[arg(long, requires = "config_url")]
    json_url: Option<String>,
    /// URL or path of tokenizer_config.json
    #[arg(long, requires = "json_url")]
    config_url: Option<String>,
}

impl Source {
    fn define(self) -> anyhow::Result<TokenizerDefine> {
        match (self.package, self.repo, self.json_url, self.config_url) {
            (Some(name), None, None, None) => Ok(TokenizerDefine::package(name)),
            (None, Some(repo), None, None) => Ok(TokenizerDefine::from_repo(&repo)?),
            (None, None, Some(json_url), Some(config_url)) => Ok(TokenizerDefine::url(json_url, config_url)),
            _ => anyhow::bail!("pick exactly one of --package, --repo, or --json-url with --config-url"),
        }
    }
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(if matches!(cli.command, Commands::Serve { .. }) { "info" } else { "warn" });

    let result = match cli.command {
        Commands::Serve { host, port } => cmd::serve(host, port).await,
        Commands::Packages => cmd::packages().await,
        Commands::Tokenize { source, text, json } => match source.define() {
            Ok(define) => cmd::tokenize(&define, text, json).await,
            Err(e) => Err(e),
        },
        Commands::Info { source, json } => match source.define() {
            Ok(define) => cmd::info(&define, json).await,
            Err(e) => Err(e),
        },
        Commands::Compare {
            left,
            left_config,
            right,
            right_config,
            text,
            json,
        } => match (cmd::side_define(&left, left_config), cmd::side_define(&right, right_config)) {
            (Ok(left), Ok(right)) => cmd::compare(&left, &right, text, json).await,
            (Err(e), _) | (_, Err(e)) => Err(e),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
