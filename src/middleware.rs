use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// `Host` header values accepted besides the loopback names.
#[derive(Debug, Clone, Default)]
pub struct AllowedHosts {
    extra: Arc<Vec<String>>,
}

impl AllowedHosts {
    pub fn new(extra: Vec<String>) -> Self {
        Self { extra: Arc::new(extra) }
    }

    pub fn allows(&self, host: &str) -> bool {
        let name = strip_port(host);
        host.is_empty()
            || matches!(name, "localhost" | "127.0.0.1" | "0.0.0.0" | "[::1]")
            || self.extra.iter().any(|h| h == host || h == name)
    }
}

fn strip_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    }
}

pub async fn allowed_hosts_middleware(
    State(allowed): State<AllowedHosts>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let host = req.headers().get("host").and_then(|h| h.to_str().ok()).unwrap_or("");

    if allowed.allows(host) {
        Ok(next.run(req).await)
    } else {
        tracing::warn!(host = %host, "rejecting request for unknown host");
        Err(StatusCode::FORBIDDEN)
    }
}
