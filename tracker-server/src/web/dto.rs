//! Data transfer objects for web requests and responses.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::CacheEntryInfo;
use crate::dataset::{GeoPosition, StatusSummary, Train, TrainStatus};

/// Filters for the train list endpoint.
#[derive(Debug, Deserialize)]
pub struct TrainFilterQuery {
    /// Substring match against origin, destination or current station
    pub station: Option<String>,

    /// Substring match against the train category
    #[serde(rename = "type")]
    pub train_type: Option<String>,

    /// Exact match against the running state ("running", "delayed")
    pub status: Option<String>,
}

/// Query for the search endpoint.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// Query for the cache clear endpoint.
#[derive(Debug, Deserialize)]
pub struct ClearQuery {
    /// Key to clear; all keys when omitted
    pub cache_type: Option<String>,
}

/// Response for the train list endpoint.
#[derive(Debug, Serialize)]
pub struct TrainsResponse {
    pub success: bool,
    pub trains: Vec<Train>,
    pub count: usize,
    pub from_cache: bool,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Response for the train detail endpoint.
#[derive(Debug, Serialize)]
pub struct TrainDetailResponse {
    pub success: bool,
    pub train: Train,
}

/// Response for the station list endpoint.
#[derive(Debug, Serialize)]
pub struct StationsResponse {
    pub success: bool,
    pub stations: Vec<String>,
    pub from_cache: bool,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Response for the train position endpoint.
#[derive(Debug, Serialize)]
pub struct PositionResponse {
    pub success: bool,
    pub train_id: String,
    pub position: GeoPosition,
    pub current_station: String,
    pub status: TrainStatus,
    pub delay_minutes: u32,
    pub timestamp: DateTime<Utc>,
}

/// Response for the search endpoint.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub success: bool,
    pub results: Vec<Train>,
    pub count: usize,
    pub query: String,
    pub from_cache: bool,
}

/// Response for the system status endpoint.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub status: StatusSummary,
    pub from_cache: bool,
}

/// Response for the cache info endpoint.
#[derive(Debug, Serialize)]
pub struct CacheInfoResponse {
    pub success: bool,
    pub cache_info: BTreeMap<&'static str, CacheEntryInfo>,
}

/// Generic acknowledgement for cache-management endpoints.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}
