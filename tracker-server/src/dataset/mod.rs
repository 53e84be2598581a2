//! Mock train dataset and its query predicates.
//!
//! Stands in for a live railway feed: a fixed set of Hungarian trains with
//! routes, delays and positions. Handlers recompute from here on a cache
//! miss; the auto-refresh loop regenerates every cache key from here on a
//! fixed period.

mod types;

pub use types::{
    GeoPosition, PositionSnapshot, RouteStop, StatusSummary, StopStatus, Train, TrainStatus,
};

use chrono::{DateTime, Utc};
use rand::Rng;

/// Maximum simulated position drift per request, in degrees.
const POSITION_JITTER_DEG: f64 = 0.01;

/// The in-memory train dataset.
#[derive(Debug, Clone)]
pub struct TrainDataset {
    trains: Vec<Train>,
}

impl TrainDataset {
    /// The seed dataset: three trains on Hungarian intercity routes.
    pub fn new() -> Self {
        Self {
            trains: seed_trains(),
        }
    }

    /// Build a dataset from explicit trains (tests).
    pub fn from_trains(trains: Vec<Train>) -> Self {
        Self { trains }
    }

    /// All trains.
    pub fn trains(&self) -> &[Train] {
        &self.trains
    }

    /// Look up one train by id.
    pub fn find(&self, id: &str) -> Option<&Train> {
        self.trains.iter().find(|t| t.id == id)
    }

    /// Apply the list-endpoint filters to this dataset's trains.
    pub fn filtered(
        &self,
        station: Option<&str>,
        train_type: Option<&str>,
        status: Option<&str>,
    ) -> Vec<Train> {
        apply_filters(&self.trains, station, train_type, status)
    }

    /// Case-insensitive substring search over ids, names and stations.
    pub fn search(&self, query: &str) -> Vec<Train> {
        search_in(&self.trains, query)
    }

    /// Every station name appearing anywhere in the dataset, sorted and
    /// deduplicated.
    pub fn stations(&self) -> Vec<String> {
        let mut stations: Vec<String> = self
            .trains
            .iter()
            .flat_map(|t| {
                [&t.from_station, &t.to_station, &t.current_station]
                    .into_iter()
                    .cloned()
                    .chain(t.route.iter().map(|s| s.station.clone()))
            })
            .collect();
        stations.sort();
        stations.dedup();
        stations
    }

    /// Aggregate counters for the status endpoint.
    pub fn status_summary(&self, now: DateTime<Utc>) -> StatusSummary {
        StatusSummary {
            total_trains: self.trains.len(),
            running_trains: self
                .trains
                .iter()
                .filter(|t| t.status == TrainStatus::Running)
                .count(),
            delayed_trains: self
                .trains
                .iter()
                .filter(|t| t.status == TrainStatus::Delayed)
                .count(),
            on_time_trains: self.trains.iter().filter(|t| t.delay_minutes == 0).count(),
            system_status: "operational".to_string(),
            last_updated: now,
        }
    }

    /// The train's position with a small random drift, simulating live
    /// movement between refreshes.
    pub fn jittered_position(&self, train: &Train) -> GeoPosition {
        let mut rng = rand::rng();
        GeoPosition {
            lat: train.position.lat + rng.random_range(-POSITION_JITTER_DEG..=POSITION_JITTER_DEG),
            lng: train.position.lng + rng.random_range(-POSITION_JITTER_DEG..=POSITION_JITTER_DEG),
        }
    }
}

impl Default for TrainDataset {
    fn default() -> Self {
        Self::new()
    }
}

/// List-endpoint filters: station is a substring match against origin,
/// destination or current station; type is a substring match; status is an
/// exact match.
pub fn apply_filters(
    trains: &[Train],
    station: Option<&str>,
    train_type: Option<&str>,
    status: Option<&str>,
) -> Vec<Train> {
    trains
        .iter()
        .filter(|t| {
            station.is_none_or(|s| {
                let s = s.to_lowercase();
                t.from_station.to_lowercase().contains(&s)
                    || t.to_station.to_lowercase().contains(&s)
                    || t.current_station.to_lowercase().contains(&s)
            })
        })
        .filter(|t| train_type.is_none_or(|ty| t.train_type.to_lowercase().contains(&ty.to_lowercase())))
        .filter(|t| status.is_none_or(|st| t.status.as_str() == st))
        .cloned()
        .collect()
}

/// Search across id, name, and origin/destination/current stations.
pub fn search_in(trains: &[Train], query: &str) -> Vec<Train> {
    let query = query.to_lowercase();
    trains
        .iter()
        .filter(|t| {
            t.name.to_lowercase().contains(&query)
                || t.id.to_lowercase().contains(&query)
                || t.from_station.to_lowercase().contains(&query)
                || t.to_station.to_lowercase().contains(&query)
                || t.current_station.to_lowercase().contains(&query)
        })
        .cloned()
        .collect()
}

fn stop(station: &str, time: &str, status: StopStatus) -> RouteStop {
    RouteStop {
        station: station.to_string(),
        time: time.to_string(),
        status,
    }
}

fn seed_trains() -> Vec<Train> {
    use StopStatus::{Current, Departed, Upcoming};

    vec![
        Train {
            id: "IC001".to_string(),
            name: "InterCity Budapest-Debrecen".to_string(),
            train_type: "InterCity".to_string(),
            from_station: "Budapest-Keleti".to_string(),
            to_station: "Debrecen".to_string(),
            departure_time: "08:15".to_string(),
            arrival_time: "10:45".to_string(),
            current_station: "Szolnok".to_string(),
            delay_minutes: 5,
            status: TrainStatus::Running,
            position: GeoPosition {
                lat: 47.1833,
                lng: 20.2,
            },
            route: vec![
                stop("Budapest-Keleti", "08:15", Departed),
                stop("Cegléd", "08:45", Departed),
                stop("Szolnok", "09:25", Current),
                stop("Püspökladány", "10:15", Upcoming),
                stop("Debrecen", "10:45", Upcoming),
            ],
        },
        Train {
            id: "S001".to_string(),
            name: "S-Bahn Budapest-Pécs".to_string(),
            train_type: "Sebesvonat".to_string(),
            from_station: "Budapest-Déli".to_string(),
            to_station: "Pécs".to_string(),
            departure_time: "09:30".to_string(),
            arrival_time: "12:15".to_string(),
            current_station: "Székesfehérvár".to_string(),
            delay_minutes: 0,
            status: TrainStatus::Running,
            position: GeoPosition {
                lat: 47.1885,
                lng: 18.4114,
            },
            route: vec![
                stop("Budapest-Déli", "09:30", Departed),
                stop("Székesfehérvár", "10:30", Current),
                stop("Siófok", "11:15", Upcoming),
                stop("Kaposvár", "11:45", Upcoming),
                stop("Pécs", "12:15", Upcoming),
            ],
        },
        Train {
            id: "R001".to_string(),
            name: "Regionális Szeged-Budapest".to_string(),
            train_type: "Regionális".to_string(),
            from_station: "Szeged".to_string(),
            to_station: "Budapest-Nyugati".to_string(),
            departure_time: "07:00".to_string(),
            arrival_time: "09:45".to_string(),
            current_station: "Kecskemét".to_string(),
            delay_minutes: 12,
            status: TrainStatus::Delayed,
            position: GeoPosition {
                lat: 46.9073,
                lng: 19.6908,
            },
            route: vec![
                stop("Szeged", "07:00", Departed),
                stop("Kiskunfélegyháza", "07:35", Departed),
                stop("Kecskemét", "08:15", Current),
                stop("Cegléd", "08:55", Upcoming),
                stop("Budapest-Nyugati", "09:45", Upcoming),
            ],
        },
    ]
}
