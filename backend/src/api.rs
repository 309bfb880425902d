//! REST API
//!
//! Exposes the quote query interface of every registered oracle, plus the
//! two ingestion paths: publishing pull-feed samples and refreshing
//! cache-backed adapters.

use crate::{
    adapter::UpdateOutcome,
    config::parse_feed_id,
    error::{OracleError, Result},
    registry::OracleRegistry,
    types::{AssetId, OracleDescription, RawPriceSample},
};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<OracleRegistry>,
    /// Source of "now" (unix seconds) for staleness checks
    pub clock: fn() -> i64,
}

impl AppState {
    pub fn new(registry: Arc<OracleRegistry>) -> Self {
        Self {
            registry,
            clock: wall_clock,
        }
    }

    fn now(&self) -> i64 {
        (self.clock)()
    }
}

pub fn wall_clock() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Quote endpoints
        .route("/api/v1/quote/:oracle", get(get_quote))
        .route("/api/v1/quotes/:oracle", get(get_quotes))
        .route("/api/v1/oracles", get(list_oracles))

        // Ingestion endpoints
        .route("/api/v1/feeds/:feed_id", post(publish_sample))
        .route("/api/v1/oracles/:oracle/update", post(update_price))

        .route("/api/v1/health", get(health_check))
        .with_state(state)
}

// ============================================================================
// QUOTE ENDPOINTS
// ============================================================================

/// GET /api/v1/quote/:oracle?in_amount=&base=&quote=
async fn get_quote(
    State(state): State<AppState>,
    Path(oracle): Path<String>,
    query: std::result::Result<Query<QuoteQuery>, QueryRejection>,
) -> Result<Json<QuoteResponse>> {
    let Query(params) = query?;
    let now = state.now();
    let out_amount = state
        .registry
        .quote(&oracle, params.in_amount, &params.base, &params.quote, now)?;

    info!(
        "{}: {} {} -> {} {}",
        oracle, params.in_amount, params.base, out_amount, params.quote
    );

    Ok(Json(QuoteResponse {
        success: true,
        oracle,
        base: params.base,
        quote: params.quote,
        in_amount: params.in_amount,
        out_amount,
        timestamp: now,
    }))
}

/// GET /api/v1/quotes/:oracle?in_amount=&base=&quote=
async fn get_quotes(
    State(state): State<AppState>,
    Path(oracle): Path<String>,
    query: std::result::Result<Query<QuoteQuery>, QueryRejection>,
) -> Result<Json<BidAskResponse>> {
    let Query(params) = query?;
    let now = state.now();
    let quotes = state
        .registry
        .quotes(&oracle, params.in_amount, &params.base, &params.quote, now)?;

    Ok(Json(BidAskResponse {
        success: true,
        oracle,
        base: params.base,
        quote: params.quote,
        in_amount: params.in_amount,
        bid: quotes.bid,
        ask: quotes.ask,
        timestamp: now,
    }))
}

/// GET /api/v1/oracles
async fn list_oracles(State(state): State<AppState>) -> Json<OraclesResponse> {
    let data = state.registry.describe();
    Json(OraclesResponse {
        success: true,
        count: data.len(),
        data,
    })
}

// ============================================================================
// INGESTION ENDPOINTS
// ============================================================================

/// POST /api/v1/feeds/:feed_id
///
/// Publish a decoded sample for a pull-updated feed
async fn publish_sample(
    State(state): State<AppState>,
    Path(feed_id): Path<String>,
    body: std::result::Result<Json<RawPriceSample>, JsonRejection>,
) -> Result<Json<PublishResponse>> {
    let key = parse_feed_id(&feed_id)?;
    let Json(sample) = body?;
    let accepted = state.registry.publish_sample(key, sample, state.now())?;
    if !accepted {
        warn!("Rejected out-of-order sample for feed {}", feed_id);
    }

    Ok(Json(PublishResponse {
        success: true,
        feed_id,
        accepted,
    }))
}

/// POST /api/v1/oracles/:oracle/update
///
/// Offer a signed sample to a cache-backed adapter
async fn update_price(
    State(state): State<AppState>,
    Path(oracle): Path<String>,
    body: std::result::Result<Json<RawPriceSample>, JsonRejection>,
) -> Result<Json<UpdateResponse>> {
    let Json(sample) = body?;
    let now = state.now();
    let outcome = state.registry.update_price(&oracle, sample, now)?;

    Ok(Json(UpdateResponse {
        success: true,
        oracle,
        outcome,
        timestamp: now,
    }))
}

/// GET /api/v1/health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        success: true,
        oracles: state.registry.len(),
        feeds: state.registry.feeds().len(),
        timestamp: state.now(),
    })
}

// ============================================================================
// REQUEST/RESPONSE TYPES
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    pub in_amount: u64,
    pub base: AssetId,
    pub quote: AssetId,
}

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub success: bool,
    pub oracle: String,
    pub base: AssetId,
    pub quote: AssetId,
    pub in_amount: u64,
    pub out_amount: u64,
    pub timestamp: i64,
}

#[derive(Debug, Serialize)]
pub struct BidAskResponse {
    pub success: bool,
    pub oracle: String,
    pub base: AssetId,
    pub quote: AssetId,
    pub in_amount: u64,
    pub bid: u64,
    pub ask: u64,
    pub timestamp: i64,
}

#[derive(Debug, Serialize)]
pub struct OraclesResponse {
    pub success: bool,
    pub data: Vec<OracleDescription>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct PublishResponse {
    pub success: bool,
    pub feed_id: String,
    pub accepted: bool,
}

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub success: bool,
    pub oracle: String,
    pub outcome: UpdateOutcome,
    pub timestamp: i64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub success: bool,
    pub oracles: usize,
    pub feeds: usize,
    pub timestamp: i64,
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

fn status_for(error: &OracleError) -> StatusCode {
    match error {
        OracleError::UnknownOracle(_) | OracleError::UnknownFeed(_) => StatusCode::NOT_FOUND,
        OracleError::UnsupportedPair { .. }
        | OracleError::UnsupportedOperation(_)
        | OracleError::ParseError(_) => StatusCode::BAD_REQUEST,
        OracleError::NoQuotes(_) => StatusCode::SERVICE_UNAVAILABLE,
        e if e.is_data_quality() => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<QueryRejection> for OracleError {
    fn from(rejection: QueryRejection) -> Self {
        OracleError::ParseError(rejection.body_text())
    }
}

impl From<JsonRejection> for OracleError {
    fn from(rejection: JsonRejection) -> Self {
        OracleError::ParseError(rejection.body_text())
    }
}

impl IntoResponse for OracleError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        let body = Json(serde_json::json!({
            "success": false,
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OracleSetConfig;
    use crate::feeds::InMemoryFeedStore;
    use axum::body::Body;
    use axum::http::Request;
    use solana_sdk::pubkey::Pubkey;
    use tower::ServiceExt;

    const NOW: i64 = 1_700_000_000;

    fn fixed_clock() -> i64 {
        NOW
    }

    fn app(pull_feed: &Pubkey, cached_feed: &Pubkey) -> Router {
        let json = format!(
            r#"{{
                "assets": [
                    {{ "id": "TKA", "decimals": 6 }},
                    {{ "id": "TKB", "decimals": 6 }}
                ],
                "oracles": [
                    {{ "type": "pull_feed", "name": "pull", "feed_id": "{}",
                       "base": "TKA", "quote": "TKB", "max_staleness": 60 }},
                    {{ "type": "cached_feed", "name": "cached", "feed_id": "{}",
                       "base": "TKA", "quote": "TKB", "feed_decimals": 2,
                       "max_price_staleness": 180, "max_cache_staleness": 300 }}
                ]
            }}"#,
            pull_feed, cached_feed
        );
        let config = OracleSetConfig::from_json(&json).unwrap();
        let registry =
            OracleRegistry::from_config(&config, Arc::new(InMemoryFeedStore::new())).unwrap();

        create_router(AppState {
            registry: Arc::new(registry),
            clock: fixed_clock,
        })
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_publish_then_quote() {
        let pull_feed = Pubkey::new_unique();
        let app = app(&pull_feed, &Pubkey::new_unique());

        let (status, body) = send(
            &app,
            post(
                &format!("/api/v1/feeds/{}", pull_feed),
                serde_json::json!({ "value": 100, "confidence": 4, "exponent": -2, "timestamp": NOW }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["accepted"], true);

        let (status, body) =
            send(&app, get("/api/v1/quote/pull?in_amount=1000000&base=TKA&quote=TKB")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["out_amount"], 1_000_000);

        let (status, body) =
            send(&app, get("/api/v1/quotes/pull?in_amount=1000000&base=TKA&quote=TKB")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["bid"], 960_000);
        assert_eq!(body["ask"], 1_040_000);
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let app = app(&Pubkey::new_unique(), &Pubkey::new_unique());

        let (status, body) =
            send(&app, get("/api/v1/quote/missing?in_amount=1&base=TKA&quote=TKB")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);

        let (status, _) =
            send(&app, get("/api/v1/quote/pull?in_amount=1&base=TKA&quote=TKC")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // No sample published yet
        let (status, _) =
            send(&app, get("/api/v1/quote/pull?in_amount=1&base=TKA&quote=TKB")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, _) =
            send(&app, get("/api/v1/quotes/cached?in_amount=1&base=TKA&quote=TKB")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            post(
                "/api/v1/feeds/not-a-key",
                serde_json::json!({ "value": 1, "exponent": 0, "timestamp": NOW }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            post(
                &format!("/api/v1/feeds/{}", Pubkey::new_unique()),
                serde_json::json!({ "value": 1, "exponent": 0, "timestamp": NOW }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_malformed_requests_use_error_body() {
        let pull_feed = Pubkey::new_unique();
        let app = app(&pull_feed, &Pubkey::new_unique());

        let (status, body) =
            send(&app, get("/api/v1/quote/pull?in_amount=lots&base=TKA&quote=TKB")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().starts_with("Parse error"));

        let (status, body) = send(&app, get("/api/v1/quotes/pull?base=TKA&quote=TKB")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, body) = send(
            &app,
            post(
                &format!("/api/v1/feeds/{}", pull_feed),
                serde_json::json!({ "value": "high" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, body) = send(
            &app,
            post("/api/v1/oracles/cached/update", serde_json::json!({ "exponent": -2 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_future_dated_publish_rejected() {
        let pull_feed = Pubkey::new_unique();
        let app = app(&pull_feed, &Pubkey::new_unique());

        let (status, body) = send(
            &app,
            post(
                &format!("/api/v1/feeds/{}", pull_feed),
                serde_json::json!({ "value": 100, "exponent": -2, "timestamp": NOW + 86_400 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_update_cached_oracle() {
        let app = app(&Pubkey::new_unique(), &Pubkey::new_unique());
        let sample = serde_json::json!({ "value": 250, "exponent": -2, "timestamp": NOW - 10 });

        let (status, body) = send(&app, post("/api/v1/oracles/cached/update", sample.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "refreshed");

        let (_, body) = send(&app, post("/api/v1/oracles/cached/update", sample)).await;
        assert_eq!(body["outcome"], "skipped");

        let (status, body) =
            send(&app, get("/api/v1/quote/cached?in_amount=1000&base=TKB&quote=TKA")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["out_amount"], 400);

        let (_, body) = send(&app, get("/api/v1/oracles")).await;
        assert_eq!(body["count"], 2);

        let (_, body) = send(&app, get("/api/v1/health")).await;
        assert_eq!(body["oracles"], 2);
        assert_eq!(body["timestamp"], NOW);
    }
}
