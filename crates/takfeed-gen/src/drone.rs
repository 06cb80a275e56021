//! Remote ID drone simulator
//!
//! Dead-reckons a single aircraft from its start position at constant course,
//! speed and altitude. Every tick recomputes the position from the total
//! elapsed time rather than accumulating per-tick steps, so late or missed
//! ticks never introduce drift.

use crate::clock::{Clock, SystemClock};
use crate::id::{IdSource, UuidIdSource};
use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use std::time::Duration;
use takfeed_core::config::DroneConfig;
use takfeed_cot::{
    Contact, Event, Point, Remarks, RemoteId, RemoteIdLocation, Track, DEFAULT_STALE_SECS,
};
use tokio::time::Instant;
use tracing::debug;

/// Meters per degree of latitude, and of longitude at the equator
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Digits written for simulated lat/lon
const COORD_PRECISION: usize = 7;

/// Convert east/west meters to degrees of longitude at a given latitude.
///
/// Returns `0.0` at the poles, where a degree of longitude has no width.
pub fn meters_to_deg_lon(meters: f64, lat_deg: f64) -> f64 {
    let meters_per_deg = METERS_PER_DEGREE * lat_deg.to_radians().cos();
    // cos(90°) comes out as ~6e-17 rather than 0
    if meters_per_deg.abs() < 1e-9 {
        return 0.0;
    }
    meters / meters_per_deg
}

/// Move `meters` along `course_deg` (0 = north, 90 = east) from a position
/// using a flat-earth approximation.
pub fn advance(lat: f64, lon: f64, course_deg: f64, meters: f64) -> (f64, f64) {
    let (sin, cos) = course_deg.to_radians().sin_cos();
    let north = meters * snap(cos);
    let east = meters * snap(sin);

    let new_lat = lat + north / METERS_PER_DEGREE;
    let new_lon = normalize_lon(lon + meters_to_deg_lon(east, lat));
    (new_lat, new_lon)
}

// Unit-vector components of cardinal courses are exact zeros
fn snap(component: f64) -> f64 {
    if component.abs() < 1e-12 {
        0.0
    } else {
        component
    }
}

fn normalize_lon(lon: f64) -> f64 {
    if (-180.0..=180.0).contains(&lon) {
        lon
    } else {
        (lon + 180.0).rem_euclid(360.0) - 180.0
    }
}

/// Kinematic state of the simulated aircraft
#[derive(Debug, Clone)]
pub struct TrackState {
    /// Serial used as the event uid, fixed for the simulator's lifetime
    pub entity_id: String,
    pub callsign: String,
    pub start_lat: f64,
    pub start_lon: f64,
    pub lat: f64,
    pub lon: f64,
    pub speed_mps: f64,
    pub course_deg: f64,
    pub altitude_m: f64,
    /// Monotonic instant the simulation started
    pub started: Instant,
}

/// Produces one drone event per tick
pub struct DroneSimulator {
    config: DroneConfig,
    state: TrackState,
    clock: Arc<dyn Clock>,
}

impl DroneSimulator {
    /// Create a simulator, drawing the aircraft serial from `ids`
    pub fn new(config: DroneConfig, ids: &dyn IdSource, clock: Arc<dyn Clock>) -> Self {
        let entity_id = uas_serial(&ids.next_id());

        let state = TrackState {
            entity_id,
            callsign: config.callsign.clone(),
            start_lat: config.start_lat,
            start_lon: config.start_lon,
            lat: config.start_lat,
            lon: config.start_lon,
            speed_mps: config.speed_mps,
            course_deg: config.course_deg,
            altitude_m: config.alt_hae_m,
            started: Instant::now(),
        };

        Self {
            config,
            state,
            clock,
        }
    }

    /// Simulator with a random serial and the system clock
    pub fn with_config(config: DroneConfig) -> Self {
        Self::new(config, &UuidIdSource, Arc::new(SystemClock))
    }

    pub fn uas_id(&self) -> &str {
        &self.state.entity_id
    }

    pub fn state(&self) -> &TrackState {
        &self.state
    }

    /// Position and event for the current monotonic time
    pub fn tick(&mut self) -> Event {
        let elapsed = self.state.started.elapsed();
        self.tick_after(elapsed)
    }

    /// Position and event `elapsed` after the start
    pub fn tick_after(&mut self, elapsed: Duration) -> Event {
        let meters = self.state.speed_mps * elapsed.as_secs_f64();
        let (lat, lon) = advance(
            self.state.start_lat,
            self.state.start_lon,
            self.state.course_deg,
            meters,
        );
        self.state.lat = lat;
        self.state.lon = lon;

        debug!(
            uid = %self.state.entity_id,
            elapsed_secs = elapsed.as_secs_f64(),
            lat,
            lon,
            "Drone position updated"
        );

        self.build_event()
    }

    fn build_event(&self) -> Event {
        let s = &self.state;
        let now = self.clock.now();

        let stale = ChronoDuration::from_std(self.config.stale_window())
            .unwrap_or_else(|_| ChronoDuration::seconds(DEFAULT_STALE_SECS));

        let remote_id = RemoteId {
            standard: self.config.standard.clone(),
            uas_id: s.entity_id.clone(),
            msg_type: self.config.msg_type.clone(),
            location: RemoteIdLocation {
                lat: s.lat,
                lon: s.lon,
                alt_hae_m: s.altitude_m,
                speed_mps: s.speed_mps,
                heading_deg: s.course_deg,
            },
            timestamp: now,
        };

        let summary = format!(
            "RemoteID sim: {} @ {:.6},{:.6} hdg={:.0} spd={:.1}m/s",
            s.entity_id, s.lat, s.lon, s.course_deg, s.speed_mps
        );

        Event::builder(s.entity_id.clone(), self.config.cot_type.clone())
            .point(
                Point::with_accuracy(s.lat, s.lon, s.altitude_m, self.config.ce, self.config.le)
                    .with_precision(COORD_PRECISION),
            )
            .stale_after(stale)
            .detail(Contact::new(s.callsign.clone()))
            .detail(Track {
                course: s.course_deg,
                speed: s.speed_mps,
            })
            .detail(remote_id)
            .detail(Remarks::new(summary))
            .build(now)
    }
}

/// `UAS-` followed by the first 12 characters of a token, uppercased
fn uas_serial(token: &str) -> String {
    let head: String = token.chars().take(12).collect();
    format!("UAS-{}", head.to_uppercase())
}
