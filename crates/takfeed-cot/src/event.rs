//! CoT Event structures and the builder used by producers

use crate::detail::{DetailElement, GROUP_TAG};
use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// CoT schema version written on every event
pub const COT_VERSION: &str = "2.0";

/// `how` code for machine-generated events
pub const HOW_MACHINE_GENERATED: &str = "m-g";

/// Stale offset used when a builder is not given one
pub const DEFAULT_STALE_SECS: i64 = 300;

/// Timestamp layout for `time`, `start` and `stale`
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// CoT Event represents one Cursor on Target message.
///
/// An `Event` is a plain value: producers build it once with [`EventBuilder`],
/// hand it to the serializer and never touch it again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// CoT version (always "2.0" for generated events)
    pub version: String,
    /// Track identity, stable across updates of the same entity
    pub uid: String,
    /// CoT type (e.g., "a-u-G" for atom-unknown-ground)
    #[serde(rename = "type")]
    pub event_type: String,
    /// How the event was generated (e.g., "m-g" for machine-generated)
    pub how: String,
    /// Event timestamp
    pub time: DateTime<Utc>,
    /// Event start time
    pub start: DateTime<Utc>,
    /// Event stale time (when the event becomes invalid)
    pub stale: DateTime<Utc>,
    /// Geographic location and accuracy
    pub point: Point,
    /// Detail blocks, serialized in this order
    pub detail: Vec<DetailElement>,
}

/// Geographic point with accuracy metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Latitude in decimal degrees (-90 to 90)
    pub lat: f64,
    /// Longitude in decimal degrees (-180 to 180)
    pub lon: f64,
    /// Height above ellipsoid in meters
    pub hae: f64,
    /// Circular error in meters (95% confidence)
    pub ce: f64,
    /// Linear error in meters (95% confidence)
    pub le: f64,
    /// Fixed number of decimal places for lat/lon, shortest form when `None`
    #[serde(default)]
    pub precision: Option<usize>,
}

impl Point {
    /// Error value receivers read as "position precision unknown"
    pub const UNKNOWN_ERROR: f64 = 9999999.0;

    /// Create a new Point with unknown accuracy
    pub fn new(lat: f64, lon: f64, hae: f64) -> Self {
        Self {
            lat,
            lon,
            hae,
            ce: Self::UNKNOWN_ERROR,
            le: Self::UNKNOWN_ERROR,
            precision: None,
        }
    }

    /// Create a new Point with specified accuracy
    pub fn with_accuracy(lat: f64, lon: f64, hae: f64, ce: f64, le: f64) -> Self {
        Self {
            lat,
            lon,
            hae,
            ce,
            le,
            precision: None,
        }
    }

    /// Render lat/lon with a fixed number of decimal places
    pub fn with_precision(mut self, digits: usize) -> Self {
        self.precision = Some(digits);
        self
    }
}

impl Event {
    /// Start building an event for the given track identity and CoT type
    pub fn builder(uid: impl Into<String>, event_type: impl Into<String>) -> EventBuilder {
        EventBuilder::new(uid, event_type)
    }

    /// Find the first detail block with the given tag
    pub fn find_detail(&self, name: &str) -> Option<&DetailElement> {
        self.detail.iter().find(|d| d.name == name)
    }

    /// Check whether a detail block with the given tag is attached
    pub fn has_detail(&self, name: &str) -> bool {
        self.find_detail(name).is_some()
    }

    /// Get the callsign from the contact detail, if present
    pub fn callsign(&self) -> Option<&str> {
        self.find_detail("contact")
            .and_then(|c| c.attribute("callsign"))
    }

    /// Get the group name from the `__group` detail, if present
    pub fn group_name(&self) -> Option<&str> {
        self.find_detail(GROUP_TAG).and_then(|g| g.attribute("name"))
    }

    /// Get the remarks text, if present
    pub fn remarks(&self) -> Option<&str> {
        self.find_detail("remarks").and_then(|r| r.text.as_deref())
    }

    /// Width of the stale window
    pub fn stale_window(&self) -> Duration {
        self.stale - self.start
    }
}

/// Builder for [`Event`] values.
///
/// Everything except the timestamps is fixed by the builder calls, so two
/// builders fed the same values and the same `now` produce equal events.
#[derive(Debug, Clone)]
pub struct EventBuilder {
    uid: String,
    event_type: String,
    how: String,
    point: Point,
    stale_after: Duration,
    detail: Vec<DetailElement>,
}

impl EventBuilder {
    pub fn new(uid: impl Into<String>, event_type: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            event_type: event_type.into(),
            how: HOW_MACHINE_GENERATED.to_string(),
            point: Point::new(0.0, 0.0, 0.0),
            stale_after: Duration::seconds(DEFAULT_STALE_SECS),
            detail: Vec::new(),
        }
    }

    pub fn how(mut self, how: impl Into<String>) -> Self {
        self.how = how.into();
        self
    }

    pub fn point(mut self, point: Point) -> Self {
        self.point = point;
        self
    }

    /// Offset between `start` and `stale`.
    ///
    /// Offsets under one second are raised to one second, since timestamps are
    /// written with whole-second resolution and `stale` must stay after `start`.
    pub fn stale_after(mut self, offset: Duration) -> Self {
        self.stale_after = offset;
        self
    }

    /// Append a detail block; blocks keep the order they were added in
    pub fn detail(mut self, element: impl Into<DetailElement>) -> Self {
        self.detail.push(element.into());
        self
    }

    /// Append a detail block only when `element` is `Some`
    pub fn detail_opt(self, element: Option<impl Into<DetailElement>>) -> Self {
        match element {
            Some(element) => self.detail(element),
            None => self,
        }
    }

    /// Finish the event, stamping `time`/`start` with `now`
    pub fn build(self, now: DateTime<Utc>) -> Event {
        let now = now.trunc_subsecs(0);
        let offset = self.stale_after.max(Duration::seconds(1));

        Event {
            version: COT_VERSION.to_string(),
            uid: self.uid,
            event_type: self.event_type,
            how: self.how,
            time: now,
            start: now,
            stale: now.checked_add_signed(offset).unwrap_or(DateTime::<Utc>::MAX_UTC),
            point: self.point,
            detail: self.detail,
        }
    }
}

/// Format a timestamp the way CoT attributes expect it
pub fn format_time(time: &DateTime<Utc>) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Format a number as a decimal string.
///
/// With `precision` the value is rendered with exactly that many fractional
/// digits. Without it the shortest round-trip form is used, always carrying a
/// fractional part (`42` becomes `42.0`).
pub fn format_decimal(value: f64, precision: Option<usize>) -> String {
    match precision {
        Some(digits) => format!("{:.*}", digits, value),
        None => {
            let mut s = value.to_string();
            if value.is_finite() && !s.contains('.') {
                s.push_str(".0");
            }
            s
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detail::{Contact, Group, Remarks};
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 17, 15, 17, 34).unwrap()
    }

    #[test]
    fn test_point_creation() {
        let point = Point::new(37.7749, -122.4194, 100.0);
        assert_eq!(point.lat, 37.7749);
        assert_eq!(point.lon, -122.4194);
        assert_eq!(point.hae, 100.0);
        assert_eq!(point.ce, 9999999.0);
        assert_eq!(point.le, 9999999.0);
        assert_eq!(point.precision, None);
    }

    #[test]
    fn test_builder_defaults() {
        let event = Event::builder("uid-1", "a-u-G").build(fixed_now());
        assert_eq!(event.version, "2.0");
        assert_eq!(event.how, "m-g");
        assert_eq!(event.time, event.start);
        assert_eq!(event.stale_window(), Duration::seconds(DEFAULT_STALE_SECS));
        assert!(event.detail.is_empty());
    }

    #[test]
    fn test_builder_truncates_subseconds() {
        let now = fixed_now() + Duration::milliseconds(750);
        let event = Event::builder("uid-1", "a-u-G")
            .stale_after(Duration::seconds(6))
            .build(now);
        assert_eq!(event.start, fixed_now());
        assert_eq!(event.stale, fixed_now() + Duration::seconds(6));
    }

    #[test]
    fn test_builder_clamps_stale_offset() {
        let event = Event::builder("uid-1", "a-u-G")
            .stale_after(Duration::zero())
            .build(fixed_now());
        assert!(event.stale > event.start);

        let event = Event::builder("uid-1", "a-u-G")
            .stale_after(Duration::seconds(-30))
            .build(fixed_now());
        assert!(event.stale > event.start);
    }

    #[test]
    fn test_detail_order_and_accessors() {
        let event = Event::builder("uid-1", "a-u-G")
            .detail(Remarks::new("hello"))
            .detail(Contact::new("Alpha-1"))
            .detail_opt(None::<Group>)
            .build(fixed_now());

        let names: Vec<&str> = event.detail.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["remarks", "contact"]);
        assert_eq!(event.callsign(), Some("Alpha-1"));
        assert_eq!(event.remarks(), Some("hello"));
        assert_eq!(event.group_name(), None);
        assert!(!event.has_detail("__group"));
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(&fixed_now()), "2025-12-17T15:17:34Z");
    }

    #[test]
    fn test_format_decimal() {
        assert_eq!(format_decimal(42.0, None), "42.0");
        assert_eq!(format_decimal(-83.1498, None), "-83.1498");
        assert_eq!(format_decimal(9999999.0, None), "9999999.0");
        assert_eq!(format_decimal(42.6064, Some(7)), "42.6064000");
        assert_eq!(format_decimal(120.0, Some(1)), "120.0");
        assert_eq!(format_decimal(f64::NAN, None), "NaN");
    }
}
