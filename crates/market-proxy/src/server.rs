//! HTTP server for the market proxy
//!
//! Provides /health and the cached `/MineOSAPI/2.04/{script}` passthrough.

use crate::error::ProxyError;
use crate::store::ScriptStore;
use crate::types::HealthResponse;
use crate::upstream::MarketClient;
use axum::{
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{header, HeaderMap, HeaderName, Method as HttpMethod, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use bi_response_cache::{Method, Params, ResponseCache};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};
use url::form_urlencoded;

const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Shared state for the HTTP server
pub struct ServerState {
    pub cache: ResponseCache<ScriptStore>,
    pub upstream: MarketClient,
    pub started_at: DateTime<Utc>,
}

impl ServerState {
    pub fn new(cache: ResponseCache<ScriptStore>, upstream: MarketClient) -> Self {
        Self {
            cache,
            upstream,
            started_at: Utc::now(),
        }
    }
}

pub type SharedState = Arc<ServerState>;

/// Create the HTTP router
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/MineOSAPI/2.04/{script}", get(handle_script).post(handle_script))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(state: SharedState, port: u16) -> std::io::Result<()> {
    let router = create_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await
}

/// Health check endpoint
async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let uptime_secs = (Utc::now() - state.started_at).num_seconds().max(0) as u64;

    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs,
        cache: state.cache.stats(),
    })
}

/// Serve a market script from cache, or forward it upstream
async fn handle_script(
    State(state): State<SharedState>,
    Path(script): Path<String>,
    method: HttpMethod,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ProxyError> {
    let params = collect_params(query.as_deref(), &headers, &body);
    let method = upstream_method(&method, &params);
    debug!(script = %script, %method, params = params.len(), "Market request");

    let response = state
        .cache
        .lookup_or_fetch(&state.upstream, &script, method, &params)
        .await?;

    let cache_header = if response.hit { "HIT" } else { "MISS" };
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (X_CACHE, cache_header),
        ],
        response.body,
    )
        .into_response())
}

/// Merge query parameters with an urlencoded form body; form values win.
///
/// Within one source the first occurrence of a key is kept.
fn collect_params(query: Option<&str>, headers: &HeaderMap, body: &[u8]) -> Params {
    let mut params = Params::new();

    if is_form(headers) {
        for (key, value) in form_urlencoded::parse(body).into_owned() {
            params.entry(key).or_insert(value);
        }
    }
    if let Some(query) = query {
        for (key, value) in form_urlencoded::parse(query.as_bytes()).into_owned() {
            params.entry(key).or_insert(value);
        }
    }

    params
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false)
}

/// Any parameters force a POST upstream, as the market API expects
fn upstream_method(method: &HttpMethod, params: &Params) -> Method {
    if !params.is_empty() || *method == HttpMethod::POST {
        Method::Post
    } else {
        Method::Get
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use bi_format::{BlobField, Field, IntegerField, LogWriter};
    use bi_response_cache::{CacheConfig, DirectoryStore};
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::tempdir;
    use tower::ServiceExt;
    use url::Url;

    fn create_test_state(data_dir: PathBuf) -> SharedState {
        let cache = ResponseCache::new(
            ScriptStore::new(DirectoryStore::new(data_dir)),
            CacheConfig {
                max_age: Duration::from_secs(3600),
                serialize_endpoints: true,
            },
        );
        // Nothing listens on the discard port, so any real fetch fails fast
        let upstream = MarketClient::new(
            Url::parse("http://127.0.0.1:9/MineOSAPI/2.04").unwrap(),
            "test-agent",
            Duration::from_secs(1),
        )
        .unwrap();
        Arc::new(ServerState::new(cache, upstream))
    }

    fn seed_log(path: PathBuf, signature: &str, content: &str) {
        let mut writer = LogWriter::new(std::fs::File::create(path).unwrap());
        writer
            .append_all(&[
                Field::from(IntegerField::new("timestamp", Utc::now().timestamp())),
                Field::from(BlobField::new(signature, content)),
            ])
            .unwrap();
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let dir = tempdir().unwrap();
        let router = create_router(create_test_state(dir.path().to_path_buf()));

        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(json["status"], "ok");
        assert!(json["uptime_secs"].as_u64().is_some());
        assert_eq!(json["cache"]["hits"], 0);
    }

    #[tokio::test]
    async fn test_cached_query_served_without_upstream() {
        let dir = tempdir().unwrap();
        seed_log(dir.path().join("Search.bi"), "category=1&search=paint", "{apps={}}");
        let state = create_test_state(dir.path().to_path_buf());
        let router = create_router(state.clone());

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/MineOSAPI/2.04/Search.php?search=paint&category=1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-cache"], "HIT");
        assert_eq!(body_bytes(response).await, b"{apps={}}");
        assert_eq!(state.cache.stats().hits, 1);
    }

    #[tokio::test]
    async fn test_form_body_overrides_query() {
        let dir = tempdir().unwrap();
        seed_log(dir.path().join("Search.bi"), "search=form", "from form");
        let router = create_router(create_test_state(dir.path().to_path_buf()));

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/MineOSAPI/2.04/Search.php?search=query")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("search=form"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, b"from form");
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_bad_gateway() {
        let dir = tempdir().unwrap();
        let router = create_router(create_test_state(dir.path().to_path_buf()));

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/MineOSAPI/2.04/Search.php?search=paint")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert!(json["error"].as_str().unwrap().contains("Upstream fetch failed"));

        // Nothing is cached on failure
        let log = std::fs::read(dir.path().join("Search.bi")).unwrap();
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_log_is_internal_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("Search.bi"), b"garbage").unwrap();
        let router = create_router(create_test_state(dir.path().to_path_buf()));

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/MineOSAPI/2.04/Search.php")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_invalid_script_is_bad_request() {
        let dir = tempdir().unwrap();
        let router = create_router(create_test_state(dir.path().to_path_buf()));

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/MineOSAPI/2.04/.php")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_collect_params_first_value_wins() {
        let headers = HeaderMap::new();
        let params = collect_params(Some("a=1&a=2&b=x+y"), &headers, b"");
        assert_eq!(params.get("a").map(String::as_str), Some("1"));
        assert_eq!(params.get("b").map(String::as_str), Some("x y"));
    }

    #[test]
    fn test_body_ignored_without_form_content_type() {
        let headers = HeaderMap::new();
        let params = collect_params(None, &headers, b"a=1");
        assert!(params.is_empty());
    }

    #[test]
    fn test_upstream_method() {
        let empty = Params::new();
        let mut filled = Params::new();
        filled.insert("a".to_string(), "1".to_string());

        assert_eq!(upstream_method(&HttpMethod::GET, &empty), Method::Get);
        assert_eq!(upstream_method(&HttpMethod::POST, &empty), Method::Post);
        assert_eq!(upstream_method(&HttpMethod::GET, &filled), Method::Post);
    }
}
