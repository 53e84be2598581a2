//! Domain types for the train dataset.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Running state of a train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainStatus {
    Running,
    Delayed,
}

impl TrainStatus {
    /// The wire name, as used in query parameters and JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            TrainStatus::Running => "running",
            TrainStatus::Delayed => "delayed",
        }
    }
}

/// Progress of a train along one stop of its route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopStatus {
    Departed,
    Current,
    Upcoming,
}

/// Geographic position (WGS 84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    pub lat: f64,
    pub lng: f64,
}

/// One scheduled stop on a train's route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteStop {
    /// Station name
    pub station: String,

    /// Scheduled time in HH:MM
    pub time: String,

    /// Whether the train has passed, is at, or has yet to reach the stop
    pub status: StopStatus,
}

/// A train with live metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Train {
    /// Train identifier, e.g. "IC001"
    pub id: String,

    /// Display name
    pub name: String,

    /// Category, e.g. "InterCity"
    #[serde(rename = "type")]
    pub train_type: String,

    /// Origin station
    pub from_station: String,

    /// Destination station
    pub to_station: String,

    /// Scheduled departure in HH:MM
    pub departure_time: String,

    /// Scheduled arrival in HH:MM
    pub arrival_time: String,

    /// Station the train is currently at or nearest to
    pub current_station: String,

    /// Current delay in minutes
    pub delay_minutes: u32,

    /// Running state
    pub status: TrainStatus,

    /// Last known position
    pub position: GeoPosition,

    /// Full calling pattern
    pub route: Vec<RouteStop>,
}

/// Aggregate counts for the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSummary {
    pub total_trains: usize,
    pub running_trains: usize,
    pub delayed_trains: usize,
    pub on_time_trains: usize,
    pub system_status: String,
    pub last_updated: DateTime<Utc>,
}

/// One train's live position as stored in the positions cache blob and
/// returned by the position endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub position: GeoPosition,
    pub current_station: String,
    pub status: TrainStatus,
    pub delay_minutes: u32,
    pub timestamp: DateTime<Utc>,
}

impl PositionSnapshot {
    /// Snapshot a train at `position` and `timestamp`.
    pub fn of(train: &Train, position: GeoPosition, timestamp: DateTime<Utc>) -> Self {
        Self {
            position,
            current_station: train.current_station.clone(),
            status: train.status,
            delay_minutes: train.delay_minutes,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn train_serializes_with_wire_field_names() {
        let train = Train {
            id: "IC001".into(),
            name: "Test".into(),
            train_type: "InterCity".into(),
            from_station: "A".into(),
            to_station: "B".into(),
            departure_time: "08:15".into(),
            arrival_time: "10:45".into(),
            current_station: "A".into(),
            delay_minutes: 5,
            status: TrainStatus::Running,
            position: GeoPosition { lat: 47.0, lng: 19.0 },
            route: vec![RouteStop {
                station: "A".into(),
                time: "08:15".into(),
                status: StopStatus::Current,
            }],
        };

        let value = serde_json::to_value(&train).unwrap();
        assert_eq!(value["type"], "InterCity");
        assert_eq!(value["status"], "running");
        assert_eq!(value["position"]["lat"], 47.0);
        assert_eq!(value["route"][0]["status"], "current");
    }

    #[test]
    fn status_round_trips() {
        for status in [TrainStatus::Running, TrainStatus::Delayed] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
            let back: TrainStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(back, status);
        }
    }
}
