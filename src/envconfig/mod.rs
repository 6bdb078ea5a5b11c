use std::env;
use std::time::Duration;

const DEFAULT_PORT: u16 = 7878;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: Host,
    /// Directory or http base holding `{name}/tokenizer.json` for each package.
    pub packages_base: String,
    pub fetch_timeout: Duration,
    /// Extra `Host` header values the server accepts besides localhost.
    pub allowed_origins: Vec<String>,
    /// Longest text, in chars, the server tokenizes.
    pub max_text_len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: Host::from_env(),
            packages_base: env::var("TOKSCOPE_PACKAGES").unwrap_or_else(|_| default_packages_dir()),
            fetch_timeout: Duration::from_secs(
                env::var("TOKSCOPE_TIMEOUT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60),
            ),
            allowed_origins: env::var("TOKSCOPE_ORIGINS")
                .map(|v| parse_list(&v))
                .unwrap_or_default(),
            max_text_len: env::var("TOKSCOPE_MAX_TEXT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100_000),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl Host {
    pub fn from_env() -> Self {
        let value = env::var("TOKSCOPE_HOST").unwrap_or_else(|_| format!("127.0.0.1:{}", DEFAULT_PORT));
        Self::parse(&value)
    }

    /// Parses `host`, `host:port` or `:port`.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        let value = value
            .strip_prefix("http://")
            .or_else(|| value.strip_prefix("https://"))
            .unwrap_or(value);

        match value.rsplit_once(':') {
            Some((host, port)) if !host.ends_with(':') => {
                let host = if host.is_empty() { "127.0.0.1" } else { host };
                Self {
                    host: host.to_string(),
                    port: port.parse().unwrap_or(DEFAULT_PORT),
                }
            }
            _ => Self {
                host: value.to_string(),
                port: DEFAULT_PORT,
            },
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub fn default_packages_dir() -> String {
    let base = dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| std::path::PathBuf::from("."));
    base.join("tokscope").join("packages").to_string_lossy().to_string()
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
