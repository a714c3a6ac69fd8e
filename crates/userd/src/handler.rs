//! HTTP handlers for the user lookup daemon

use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use usercache::{LookupError, User, UserCache};

/// Build the router around a shared cache handle
pub fn router(cache: UserCache) -> Router {
    Router::new()
        .route("/", get(handle_stats))
        .route("/user", get(handle_user_query))
        .route("/user/", get(handle_user_query))
        .route("/user/:id", get(handle_user_path))
        .with_state(cache)
}

/// Query pairs in request order; repeated keys are kept
type QueryPairs = Vec<(String, String)>;

/// First `id` value, or empty if absent
fn first_id(pairs: &[(String, String)]) -> &str {
    pairs
        .iter()
        .find(|(key, _)| key == "id")
        .map(|(_, value)| value.as_str())
        .unwrap_or_default()
}

/// Running counters, `nhit` being the number of store fetches
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct StatsResponse {
    pub nhit: u64,
    pub hits: u64,
    pub coalesced: u64,
    pub not_found: u64,
    pub invalid: u64,
    pub hit_ratio: f64,
    pub cached: usize,
    pub users: usize,
    pub policy: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
}

/// Lookup failure rendered as `{"error": <safe message>}`
pub struct ApiError(LookupError);

impl From<LookupError> for ApiError {
    fn from(err: LookupError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.0.server_error();

        if self.0.is_expected() {
            info!("getUser: {}", self.0);
        } else {
            error!("getUser: {:?}", self.0);
        }

        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

async fn handle_user_query(
    State(cache): State<UserCache>,
    query: Result<Query<QueryPairs>, QueryRejection>,
) -> Result<Json<User>, ApiError> {
    match query {
        Ok(Query(pairs)) => lookup(&cache, first_id(&pairs)).await,
        Err(rejection) => Err(rejected(&cache, rejection.body_text())),
    }
}

async fn handle_user_path(
    State(cache): State<UserCache>,
    raw: Result<Path<String>, PathRejection>,
) -> Result<Json<User>, ApiError> {
    match raw {
        Ok(Path(raw)) => lookup(&cache, &raw).await,
        Err(rejection) => Err(rejected(&cache, rejection.body_text())),
    }
}

/// Extraction failures are malformed ids as far as the client is concerned
fn rejected(cache: &UserCache, detail: String) -> ApiError {
    cache.stats().record_invalid();
    debug!("getUser: unreadable id parameter: {}", detail);
    ApiError::from(LookupError::InvalidId)
}

async fn lookup(cache: &UserCache, raw: &str) -> Result<Json<User>, ApiError> {
    let user = cache.get_by_id(raw).await?;
    debug!("getUser: served {:?}", user);
    Ok(Json(User::clone(&user)))
}

async fn handle_stats(State(cache): State<UserCache>) -> Json<StatsResponse> {
    let stats = cache.stats();
    Json(StatsResponse {
        nhit: stats.misses(),
        hits: stats.hits(),
        coalesced: stats.coalesced(),
        not_found: stats.not_found(),
        invalid: stats.invalid(),
        hit_ratio: stats.hit_ratio(),
        cached: cache.cache_len(),
        users: cache.len(),
        policy: cache.policy().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;
    use usercache::{CacheConfig, FetchPolicy, UserStore};

    fn app(policy: FetchPolicy) -> (Router, UserCache) {
        let store = Arc::new(UserStore::generate(100, Duration::from_millis(1)));
        let cache = UserCache::new(
            store,
            CacheConfig {
                policy,
                ..CacheConfig::default()
            },
        );
        (router(cache.clone()), cache)
    }

    async fn send(app: &Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_get_user_query() {
        let (app, cache) = app(FetchPolicy::Coalesced);

        let (status, body) = send(&app, "/user/?id=1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"id": 1, "name": "User1"}));
        assert_eq!(cache.misses(), 1);

        let (status, body) = send(&app, "/user/?id=1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"id": 1, "name": "User1"}));
        assert_eq!(cache.misses(), 1);
    }

    #[tokio::test]
    async fn test_get_user_path() {
        let (app, _cache) = app(FetchPolicy::Coalesced);

        let (status, body) = send(&app, "/user/100").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"id": 100, "name": "User100"}));
    }

    #[tokio::test]
    async fn test_not_found() {
        let (app, _cache) = app(FetchPolicy::Coalesced);

        for uri in ["/user/?id=0", "/user/?id=101", "/user/101", "/user/-1"] {
            let (status, body) = send(&app, uri).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(body, json!({"error": "user id not found"}));
        }
    }

    #[tokio::test]
    async fn test_invalid_id() {
        let (app, cache) = app(FetchPolicy::Coalesced);

        for uri in ["/user/?id=abc", "/user/?id=", "/user/", "/user", "/user/1.5"] {
            let (status, body) = send(&app, uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body, json!({"error": "invalid user id"}));
        }
        assert_eq!(cache.stats().invalid(), 5);
    }

    #[tokio::test]
    async fn test_repeated_id_takes_first() {
        let (app, _cache) = app(FetchPolicy::Coalesced);

        let (status, body) = send(&app, "/user/?id=1&id=2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"id": 1, "name": "User1"}));

        let (status, body) = send(&app, "/user/?other=x&id=abc&id=2").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "invalid user id"}));
    }

    #[tokio::test]
    async fn test_undecodable_path_is_invalid_id() {
        let (app, cache) = app(FetchPolicy::Coalesced);

        // %FF is not valid UTF-8 once percent-decoded
        let (status, body) = send(&app, "/user/%FF").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "invalid user id"}));
        assert_eq!(cache.stats().invalid(), 1);
    }

    #[test]
    fn test_first_id() {
        let pairs = vec![
            ("a".to_string(), "1".to_string()),
            ("id".to_string(), "7".to_string()),
            ("id".to_string(), "8".to_string()),
        ];
        assert_eq!(first_id(&pairs), "7");
        assert_eq!(first_id(&pairs[..1]), "");
    }

    #[test]
    fn test_internal_error_is_opaque() {
        let response =
            ApiError::from(LookupError::Internal("shard 3 poisoned".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_internal_error_body() {
        let response =
            ApiError::from(LookupError::Internal("shard 3 poisoned".into())).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body, json!({"error": "internal error"}));
    }

    #[tokio::test]
    async fn test_stats() {
        let (app, _cache) = app(FetchPolicy::Independent);

        send(&app, "/user/?id=3").await;
        send(&app, "/user/3").await;
        send(&app, "/user/?id=nope").await;
        send(&app, "/user/?id=500").await;

        let (status, body) = send(&app, "/").await;
        assert_eq!(status, StatusCode::OK);

        let stats: StatsResponse = serde_json::from_value(body).unwrap();
        assert_eq!(
            stats,
            StatsResponse {
                nhit: 1,
                hits: 1,
                coalesced: 0,
                not_found: 1,
                invalid: 1,
                hit_ratio: 0.5,
                cached: 1,
                users: 100,
                policy: "independent".to_string(),
            }
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_requests() {
        const REQUESTS: usize = 2000;
        let (app, cache) = app(FetchPolicy::Coalesced);

        let handles: Vec<_> = (0..REQUESTS)
            .map(|i| {
                let app = app.clone();
                let id = 1 + i % 100;
                tokio::spawn(async move {
                    let (status, body) = send(&app, &format!("/user/?id={}", id)).await;
                    assert_eq!(status, StatusCode::OK);
                    assert_eq!(body, json!({"id": id, "name": format!("User{}", id)}));
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(cache.misses(), 100);
        assert_eq!(cache.cache_len(), 100);
    }
}
