mod common;

use axum::{
    body::{to_bytes, Body, Bytes},
    http::{header, Method, Request, StatusCode},
    Router,
};
use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use common::{hub_with, MemoryFetcher};
use tokscope::app::server::{create_router, AppState};
use tokscope::middleware::AllowedHosts;

const HUB_JSON: &str = "https://hub.test/tokenizer.json";
const HUB_CONFIG: &str = "https://hub.test/tokenizer_config.json";

fn router(max_text_len: usize) -> Router {
    router_with(Arc::new(MemoryFetcher::new()), max_text_len)
}

fn router_with(fetcher: Arc<MemoryFetcher>, max_text_len: usize) -> Router {
    fetcher.insert_package("gpt2");
    fetcher.insert_pair(HUB_JSON, HUB_CONFIG);
    let state = AppState {
        hub: hub_with(fetcher, &["gpt2", "llama3"]),
        max_text_len,
    };
    create_router(state, AllowedHosts::new(vec!["tok.example.com".to_string()]))
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::HOST, "localhost:7878")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str, host: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::HOST, host)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_list_packages() {
    let (status, body) = send(router(100), get("/api/packages", "localhost")).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["gpt2", "llama3"]);
    assert_eq!(body[0]["json_url"], "mem://packages/gpt2/tokenizer.json");
}

#[tokio::test]
async fn test_tokenize_package() {
    let req = post(
        "/api/tokenize",
        json!({"tokenizer": {"type": "package", "name": "gpt2"}, "text": "Potato potato."}),
    );
    let (status, body) = send(router(100), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "gpt2");
    assert_eq!(body["tokens"].as_array().unwrap().len(), 3);
    assert_eq!(body["tokens"][1]["id"], 4);
    assert_eq!(body["tokens"][1]["start"], 6);
    assert_eq!(body["stats"]["tokens"], 3);
    assert_eq!(body["stats"]["chars"], 14);
}

#[tokio::test]
async fn test_tokenize_url() {
    let req = post(
        "/api/tokenize",
        json!({
            "tokenizer": {
                "type": "url",
                "json_url": "https://hub.test/tokenizer.json",
                "config_url": "https://hub.test/tokenizer_config.json"
            },
            "text": ""
        }),
    );
    let (status, body) = send(router(100), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tokens"], json!([]));
    assert_eq!(body["stats"]["compression_rate"], 0.0);
}

#[tokio::test]
async fn test_info() {
    let req = post("/api/info", json!({"tokenizer": {"type": "package", "name": "gpt2"}}));
    let (status, body) = send(router(100), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model_type"], "WordLevel");
    assert_eq!(body["vocab_size"], 7);
    assert_eq!(body["bos_token"], "<s>");
}

#[tokio::test]
async fn test_compare() {
    let req = post(
        "/api/compare",
        json!({
            "left": {"type": "package", "name": "gpt2"},
            "right": {"type": "url", "json_url": "https://hub.test/tokenizer.json", "config_url": "https://hub.test/tokenizer_config.json"},
            "text": "tomato"
        }),
    );
    let (status, body) = send(router(100), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["left"]["name"], "gpt2");
    assert_eq!(body["right"]["name"], "tokenizer");
    assert_eq!(body["left"]["tokens"], body["right"]["tokens"]);
}

#[tokio::test]
async fn test_unknown_package_is_bad_request() {
    let req = post("/api/tokenize", json!({"tokenizer": {"type": "package", "name": "gpt5"}, "text": "x"}));
    let (status, body) = send(router(100), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("gpt5"));
}

#[tokio::test]
async fn test_fetch_failure_is_bad_gateway() {
    let req = post("/api/info", json!({"tokenizer": {"type": "package", "name": "llama3"}}));
    let (status, body) = send(router(100), req).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().starts_with("fetch mem://packages/llama3/"));
}

#[tokio::test]
async fn test_failures_show_in_status() {
    let app = router(100);
    let req = post("/api/info", json!({"tokenizer": {"type": "package", "name": "llama3"}}));
    send(app.clone(), req).await;
    let req = post("/api/info", json!({"tokenizer": {"type": "package", "name": "gpt2"}}));
    send(app.clone(), req).await;

    let (status, body) = send(app, get("/api/status", "127.0.0.1:7878")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!({"loaded": 1, "downloaded": 0, "errors": 1}));
    assert_eq!(body["registry"]["loaded_pkg"], json!(["gpt2"]));
    assert!(body["errors"]["package:llama3"].is_string());
}

#[tokio::test]
async fn test_text_limit() {
    let req = post(
        "/api/tokenize",
        json!({"tokenizer": {"type": "package", "name": "gpt2"}, "text": "potato potato"}),
    );
    let (status, body) = send(router(8), req).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"], "text is 13 chars, limit is 8");
}

#[tokio::test]
async fn test_repo() {
    let (status, body) = send(router(100), post("/api/repo", json!({"repo": "openai-community/gpt2"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "url");
    assert_eq!(
        body["json_url"],
        "https://huggingface.co/openai-community/gpt2/resolve/main/tokenizer.json?download=true"
    );

    let (status, body) = send(router(100), post("/api/repo", json!({"repo": "not a repo"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid repo name"));
}

#[tokio::test]
async fn test_unknown_host_is_forbidden() {
    let (status, _) = send(router(100), get("/api/packages", "evil.example.org")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(router(100), get("/api/packages", "tok.example.com:443")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_local_sources_are_rejected() {
    let fetcher = Arc::new(MemoryFetcher::new());
    // Even a source the fetcher could serve is refused by scheme.
    fetcher.insert_pair("/srv/tokenizer.json", "/srv/tokenizer_config.json");
    let app = router_with(Arc::clone(&fetcher), 100);

    for (json_url, config_url) in [
        ("/srv/tokenizer.json", "/srv/tokenizer_config.json"),
        ("file:///etc/hostname", HUB_CONFIG),
        (HUB_JSON, "/etc/nope"),
    ] {
        let tokenizer = json!({"type": "url", "json_url": json_url, "config_url": config_url});
        let (status, body) = send(app.clone(), post("/api/info", json!({ "tokenizer": tokenizer.clone() }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", json_url);
        assert!(body["error"].as_str().unwrap().contains("only http(s) sources"));

        let req = post("/api/tokenize", json!({"tokenizer": tokenizer.clone(), "text": "potato"}));
        assert_eq!(send(app.clone(), req).await.0, StatusCode::BAD_REQUEST);

        let req = post(
            "/api/compare",
            json!({"left": {"type": "package", "name": "gpt2"}, "right": tokenizer, "text": "potato"}),
        );
        assert_eq!(send(app.clone(), req).await.0, StatusCode::BAD_REQUEST);
    }

    assert_eq!(fetcher.fetches(), 0);
    let (_, body) = send(app, get("/api/status", "localhost")).await;
    assert_eq!(body["status"]["errors"], 0);
}

#[tokio::test]
async fn test_events_stream_change_frames() {
    let app = router(100);

    let response = app.clone().oneshot(get("/api/events", "localhost")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");
    let mut frames = response.into_body().into_data_stream();

    let req = post(
        "/api/tokenize",
        json!({"tokenizer": {"type": "package", "name": "gpt2"}, "text": "potato"}),
    );
    assert_eq!(send(app, req).await.0, StatusCode::OK);

    let mut text = String::new();
    while !text.contains("tokenizer_loaded") {
        let frame: Bytes = tokio::time::timeout(Duration::from_secs(5), frames.next())
            .await
            .expect("event frame within timeout")
            .expect("stream still open")
            .unwrap();
        text.push_str(&String::from_utf8_lossy(&frame));
    }

    assert_eq!(text.matches("event: change").count(), 2);
    let loading = text.find("tokenizer_loading").unwrap();
    let loaded = text.find("tokenizer_loaded").unwrap();
    assert!(loading < loaded);
    assert!(text.contains("\"key\":\"package:gpt2\""));
}
