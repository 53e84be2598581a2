//! HTTP route handlers.
//!
//! Every read path follows the same shape: ask the cache for a fresh
//! record, fall back to recomputing from the dataset on a miss, and push
//! the recomputed payload back through the cache. Cache failures never
//! reach the client as errors; they only change `from_cache`.

use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::cache::{CacheError, CacheKey};
use crate::dataset::{self, PositionSnapshot, Train};

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/trains", get(list_trains))
        .route("/api/trains/:id", get(train_details))
        .route("/api/trains/:id/position", get(train_position))
        .route("/api/stations", get(list_stations))
        .route("/api/search", get(search_trains))
        .route("/api/status", get(system_status))
        .route("/api/cache/info", get(cache_info))
        .route("/api/cache/refresh", post(cache_refresh))
        .route("/api/cache/clear", post(cache_clear))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// List trains, with optional station/type/status filters.
///
/// The full unfiltered list is what gets cached; filters apply per
/// request after retrieval.
async fn list_trains(
    State(state): State<AppState>,
    Query(filter): Query<TrainFilterQuery>,
) -> Json<TrainsResponse> {
    let (trains, from_cache, last_updated) = cached_trains(&state).await;

    let trains = dataset::apply_filters(
        &trains,
        filter.station.as_deref(),
        filter.train_type.as_deref(),
        filter.status.as_deref(),
    );

    Json(TrainsResponse {
        success: true,
        count: trains.len(),
        trains,
        from_cache,
        last_updated,
    })
}

/// Detailed information about one train.
async fn train_details(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TrainDetailResponse>, AppError> {
    let (trains, _, _) = cached_trains(&state).await;
    let train = trains
        .into_iter()
        .find(|t| t.id == id)
        .ok_or_else(|| AppError::NotFound {
            message: "Train not found".to_string(),
        })?;

    Ok(Json(TrainDetailResponse {
        success: true,
        train,
    }))
}

/// Live position of one train.
///
/// Positions for all trains live in a single cache blob keyed by train id.
/// The handler reads the fresh blob (or starts empty), replaces this
/// train's snapshot with a newly simulated one, and writes the whole blob
/// back: whole-blob last-write-wins, so a concurrent update for another
/// train may be overwritten rather than merged.
async fn train_position(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PositionResponse>, AppError> {
    let (trains, _, _) = cached_trains(&state).await;
    let train = trains
        .iter()
        .find(|t| t.id == id)
        .ok_or_else(|| AppError::NotFound {
            message: "Train not found".to_string(),
        })?;

    let mut blob: BTreeMap<String, PositionSnapshot> =
        match state.cache.get_if_fresh(CacheKey::Positions).await {
            Some(record) => serde_json::from_value(record.data).unwrap_or_else(|e| {
                warn!(error = %e, "cached positions payload malformed, starting empty");
                BTreeMap::new()
            }),
            None => BTreeMap::new(),
        };

    let snapshot = PositionSnapshot::of(train, state.dataset.jittered_position(train), Utc::now());
    blob.insert(id.clone(), snapshot.clone());
    store_payload(&state, CacheKey::Positions, &blob).await;

    Ok(Json(PositionResponse {
        success: true,
        train_id: id,
        position: snapshot.position,
        current_station: snapshot.current_station,
        status: snapshot.status,
        delay_minutes: snapshot.delay_minutes,
        timestamp: snapshot.timestamp,
    }))
}

/// All known station names.
async fn list_stations(State(state): State<AppState>) -> Json<StationsResponse> {
    if let Some(record) = state.cache.get_if_fresh(CacheKey::Stations).await {
        match serde_json::from_value::<Vec<String>>(record.data) {
            Ok(stations) => {
                return Json(StationsResponse {
                    success: true,
                    stations,
                    from_cache: true,
                    last_updated: Some(record.last_updated),
                });
            }
            Err(e) => warn!(error = %e, "cached stations payload malformed, recomputing"),
        }
    }

    let stations = state.dataset.stations();
    store_payload(&state, CacheKey::Stations, &stations).await;

    Json(StationsResponse {
        success: true,
        stations,
        from_cache: false,
        last_updated: Some(Utc::now()),
    })
}

/// Search trains by id, name or station.
async fn search_trains(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    let q = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::BadRequest {
            message: "Search query is required".to_string(),
        })?;

    let (trains, from_cache, _) = cached_trains(&state).await;
    let results = dataset::search_in(&trains, q);

    Ok(Json(SearchResponse {
        success: true,
        count: results.len(),
        results,
        query: q.to_lowercase(),
        from_cache,
    }))
}

/// System status and statistics.
async fn system_status(State(state): State<AppState>) -> Json<StatusResponse> {
    if let Some(record) = state.cache.get_if_fresh(CacheKey::Status).await {
        match serde_json::from_value(record.data) {
            Ok(status) => {
                return Json(StatusResponse {
                    success: true,
                    status,
                    from_cache: true,
                });
            }
            Err(e) => warn!(error = %e, "cached status payload malformed, recomputing"),
        }
    }

    let status = state.dataset.status_summary(Utc::now());
    store_payload(&state, CacheKey::Status, &status).await;

    Json(StatusResponse {
        success: true,
        status,
        from_cache: false,
    })
}

/// Introspection across all cache keys.
async fn cache_info(State(state): State<AppState>) -> Json<CacheInfoResponse> {
    let cache_info = state
        .cache
        .info()
        .await
        .into_iter()
        .map(|(key, entry)| (key.as_str(), entry))
        .collect();

    Json(CacheInfoResponse {
        success: true,
        cache_info,
    })
}

/// Force a full regeneration of every cache key.
async fn cache_refresh(State(state): State<AppState>) -> Result<Json<MessageResponse>, AppError> {
    state.regenerate_all().await?;
    Ok(Json(MessageResponse {
        success: true,
        message: "cache refreshed".to_string(),
    }))
}

/// Clear one cache key, or all of them when `cache_type` is omitted.
async fn cache_clear(
    State(state): State<AppState>,
    Query(query): Query<ClearQuery>,
) -> Result<Json<MessageResponse>, AppError> {
    let key = query
        .cache_type
        .as_deref()
        .map(CacheKey::parse)
        .transpose()
        .map_err(|e| AppError::BadRequest {
            message: e.to_string(),
        })?;

    state.cache.clear(key).await?;

    let message = match key {
        Some(key) => format!("cleared cache: {key}"),
        None => "cleared all cache keys".to_string(),
    };
    Ok(Json(MessageResponse {
        success: true,
        message,
    }))
}

/// Full train list: served from cache when fresh, recomputed from the
/// dataset and written back otherwise.
async fn cached_trains(state: &AppState) -> (Vec<Train>, bool, Option<DateTime<Utc>>) {
    if let Some(record) = state.cache.get_if_fresh(CacheKey::Trains).await {
        match serde_json::from_value::<Vec<Train>>(record.data) {
            Ok(trains) => return (trains, true, Some(record.last_updated)),
            Err(e) => warn!(error = %e, "cached trains payload malformed, recomputing"),
        }
    }

    let trains = state.dataset.trains().to_vec();
    store_payload(state, CacheKey::Trains, &trains).await;
    (trains, false, Some(Utc::now()))
}

/// Push a freshly computed payload into the cache.
///
/// Failures are logged and swallowed: the response is served from the
/// computed value regardless.
async fn store_payload<T: Serialize>(state: &AppState, key: CacheKey, value: &T) {
    let payload = match serde_json::to_value(value) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(%key, error = %e, "failed to serialize payload for cache");
            return;
        }
    };
    if let Err(e) = state.cache.update(key, payload).await {
        warn!(%key, error = %e, "cache update failed");
    }
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    Internal { message: String },
}

impl From<CacheError> for AppError {
    fn from(e: CacheError) -> Self {
        AppError::Internal {
            message: e.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            AppError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        warn!(%status, %message, "request failed");

        let body = Json(ErrorResponse {
            success: false,
            error: message,
        });
        (status, body).into_response()
    }
}
