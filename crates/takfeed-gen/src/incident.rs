//! Incident converter
//!
//! Turns one CAD incident record into one marker event. Every field of the
//! record is optional and each has a placeholder, so conversion never fails on
//! a record that deserialized at all.

use crate::clock::{Clock, SystemClock};
use crate::id::{IdSource, UuidIdSource};
use chrono::Duration;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::sync::Arc;
use takfeed_core::config::IncidentConfig;
use takfeed_core::error::{InputError, Result};
use takfeed_cot::{Contact, Event, Group, Point, Remarks, UserIcon, DEFAULT_STALE_SECS};
use tracing::{debug, warn};

/// Status that puts an incident into the alert group
pub const ACTIVE_STATUS: &str = "ACTIVE";

const DEFAULT_TYPE_CODE: &str = "INC";
const UNKNOWN: &str = "UNKNOWN";
const NO_ARRIVAL: &str = "NO ARRIVAL";
const DEFAULT_COORD: &str = "0.0";

/// One incident as exported by the dispatch system
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub incident_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub lat_coord: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub long_coord: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub incident_type_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub incident_address: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub incident_status: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub incident_type_description: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub dispatch_date_utc: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub arrival_date_utc: Option<String>,
    /// Dispatcher comments, oldest first as exported
    #[serde(default, rename = "Comments", deserialize_with = "null_as_default")]
    pub comments: Vec<Comment>,
}

/// A dispatcher comment attached to an incident
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default, deserialize_with = "lenient_string")]
    pub comments_text: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub created_date_utc: Option<String>,
}

impl Comment {
    pub fn new(text: impl Into<String>, created: Option<&str>) -> Self {
        Self {
            comments_text: Some(text.into()),
            created_date_utc: created.map(str::to_string),
        }
    }

    /// `"<date>: <text>"`, or just the text when there is no date
    pub fn render(&self) -> String {
        let text = self.comments_text.as_deref().unwrap_or("").trim();
        let date = self.created_date_utc.as_deref().unwrap_or("").trim();
        if date.is_empty() {
            text.to_string()
        } else {
            format!("{}: {}", date, text)
        }
    }
}

impl IncidentRecord {
    /// Status with surrounding whitespace removed, `UNKNOWN` when absent
    pub fn status(&self) -> &str {
        self.incident_status.as_deref().map_or(UNKNOWN, str::trim)
    }

    /// Whether the incident belongs in the alert group
    pub fn is_active(&self) -> bool {
        self.status() == ACTIVE_STATUS
    }

    /// `"<type code> | <status> | <address>"`
    pub fn callsign(&self) -> String {
        format!(
            "{} | {} | {}",
            self.incident_type_code.as_deref().unwrap_or(DEFAULT_TYPE_CODE),
            self.status(),
            self.incident_address.as_deref().unwrap_or(UNKNOWN),
        )
    }

    /// Remarks text: a header, the status block, then one paragraph per
    /// comment in the order given.
    pub fn remarks(&self) -> String {
        let mut report = format!(
            "{} at {}\n\nSTATUS: {}\nDISPATCHED: {}\nARRIVAL: {}\n\n",
            self.incident_type_description.as_deref().unwrap_or(""),
            self.incident_address.as_deref().unwrap_or(""),
            self.status(),
            self.dispatch_date_utc.as_deref().unwrap_or("").trim(),
            self.arrival_date_utc.as_deref().unwrap_or(NO_ARRIVAL).trim(),
        );

        for comment in &self.comments {
            report.push_str(&comment.render());
            report.push_str("\n\n");
        }

        report
    }
}

/// A document of incidents, `{"Incidents": [...]}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentFeed {
    #[serde(default, rename = "Incidents", deserialize_with = "null_as_default")]
    pub incidents: Vec<IncidentRecord>,
}

impl IncidentFeed {
    /// Loads a feed from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a feed document.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(InputError::FileNotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| InputError::read_failed(path.display().to_string(), e.to_string()))?;

        Self::from_json(&contents)
    }

    /// Parses a feed from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| InputError::json(e.line(), e.column(), e.to_string()).into())
    }

    pub fn len(&self) -> usize {
        self.incidents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.incidents.is_empty()
    }
}

impl IntoIterator for IncidentFeed {
    type Item = IncidentRecord;
    type IntoIter = std::vec::IntoIter<IncidentRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.incidents.into_iter()
    }
}

/// Converts incident records into marker events
pub struct IncidentConverter {
    config: IncidentConfig,
    ids: Arc<dyn IdSource>,
    clock: Arc<dyn Clock>,
}

impl IncidentConverter {
    pub fn new(config: IncidentConfig, ids: Arc<dyn IdSource>, clock: Arc<dyn Clock>) -> Self {
        Self { config, ids, clock }
    }

    /// Converter using random UUIDs and the system clock
    pub fn with_config(config: IncidentConfig) -> Self {
        Self::new(config, Arc::new(UuidIdSource), Arc::new(SystemClock))
    }

    pub fn config(&self) -> &IncidentConfig {
        &self.config
    }

    /// `<prefix>-<incident number>`, with a fresh token standing in for a
    /// missing number
    pub fn uid_for(&self, record: &IncidentRecord) -> String {
        match record.incident_number {
            Some(ref number) => format!("{}-{}", self.config.uid_prefix, number),
            None => format!("{}-{}", self.config.uid_prefix, self.ids.next_id()),
        }
    }

    /// Convert one record.
    ///
    /// Timestamps come from the converter's clock, not from the record's
    /// dispatch time.
    pub fn convert(&self, record: &IncidentRecord) -> Event {
        let uid = self.uid_for(record);
        let lat = parse_coord(&uid, "lat_coord", record.lat_coord.as_deref());
        let lon = parse_coord(&uid, "long_coord", record.long_coord.as_deref());

        let group = record
            .is_active()
            .then(|| Group::new(self.config.active_group.clone()));

        debug!(uid = %uid, status = record.status(), "Converting incident");

        Event::builder(uid, self.config.cot_type.clone())
            .point(Point::new(lat, lon, 0.0))
            .stale_after(stale_offset(self.config.stale_secs))
            .detail(UserIcon::new(self.config.icon_path.clone()))
            .detail(Contact::new(record.callsign()))
            .detail(Remarks::new(record.remarks()))
            .detail_opt(group)
            .build(self.clock.now())
    }

    /// Convert every record of a feed, in order
    pub fn convert_all(&self, feed: &IncidentFeed) -> Vec<Event> {
        feed.incidents.iter().map(|r| self.convert(r)).collect()
    }
}

fn stale_offset(secs: u64) -> Duration {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or_else(|| Duration::seconds(DEFAULT_STALE_SECS))
}

fn parse_coord(uid: &str, field: &str, raw: Option<&str>) -> f64 {
    let raw = raw.unwrap_or(DEFAULT_COORD);
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => {
            warn!(uid = %uid, field, value = raw, "Non-numeric coordinate, using 0.0");
            0.0
        }
    }
}

/// JSON scalars the export has been seen to use for string fields
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Str(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
}

impl From<Scalar> for String {
    fn from(value: Scalar) -> Self {
        match value {
            Scalar::Str(s) => s,
            Scalar::Int(n) => n.to_string(),
            Scalar::UInt(n) => n.to_string(),
            Scalar::Float(n) => n.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(String::from))
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::id::SequentialIdSource;
    use chrono::{TimeZone, Utc};
    use takfeed_cot::GROUP_TAG;

    fn converter() -> IncidentConverter {
        IncidentConverter::new(
            IncidentConfig::default(),
            Arc::new(SequentialIdSource::new()),
            Arc::new(FixedClock(
                Utc.with_ymd_and_hms(2025, 12, 17, 15, 17, 34).unwrap(),
            )),
        )
    }

    fn record(status: &str) -> IncidentRecord {
        IncidentRecord {
            incident_number: Some("2025-000123".to_string()),
            lat_coord: Some("42.5".to_string()),
            long_coord: Some("-83.25".to_string()),
            incident_type_code: Some("FIRE".to_string()),
            incident_address: Some("100 Elm St".to_string()),
            incident_status: Some(status.to_string()),
            incident_type_description: Some("Structure Fire".to_string()),
            dispatch_date_utc: Some("12/17/2025 3:17:34 PM ".to_string()),
            arrival_date_utc: None,
            comments: Vec::new(),
        }
    }

    #[test]
    fn test_remarks_without_comments() {
        let remarks = record("ACTIVE").remarks();
        assert_eq!(
            remarks,
            concat!(
                "Structure Fire at 100 Elm St\n\n",
                "STATUS: ACTIVE\n",
                "DISPATCHED: 12/17/2025 3:17:34 PM\n",
                "ARRIVAL: NO ARRIVAL\n\n",
            )
        );
    }

    #[test]
    fn test_remarks_with_comments() {
        let mut rec = record("ACTIVE");
        rec.comments = vec![
            Comment::new(" Caller reports smoke ", Some("12/17/2025 3:18:00 PM")),
            Comment::new("Second alarm", None),
            Comment {
                comments_text: None,
                created_date_utc: Some("12/17/2025 3:30:00 PM".to_string()),
            },
        ];

        let remarks = rec.remarks();
        assert!(remarks.ends_with(concat!(
            "ARRIVAL: NO ARRIVAL\n\n",
            "12/17/2025 3:18:00 PM: Caller reports smoke\n\n",
            "Second alarm\n\n",
            "12/17/2025 3:30:00 PM: \n\n",
        )));
    }

    #[test]
    fn test_callsign_placeholders() {
        let empty = IncidentRecord::default();
        assert_eq!(empty.callsign(), "INC | UNKNOWN | UNKNOWN");
        assert_eq!(empty.status(), "UNKNOWN");
        assert_eq!(
            empty.remarks(),
            " at \n\nSTATUS: UNKNOWN\nDISPATCHED: \nARRIVAL: NO ARRIVAL\n\n"
        );
    }

    #[test]
    fn test_status_is_trimmed() {
        let rec = record("  ACTIVE\t");
        assert_eq!(rec.status(), "ACTIVE");
        assert!(rec.is_active());
        assert_eq!(rec.callsign(), "FIRE | ACTIVE | 100 Elm St");

        assert!(!record("active").is_active());
        assert!(!record("CLOSED").is_active());
    }

    #[test]
    fn test_convert_active_incident() {
        let event = converter().convert(&record("ACTIVE"));

        assert_eq!(event.uid, "GeoSafety-2025-000123");
        assert_eq!(event.event_type, "a-u-G");
        assert_eq!(event.how, "m-g");
        assert_eq!(event.point.lat, 42.5);
        assert_eq!(event.point.lon, -83.25);
        assert_eq!(event.point.hae, 0.0);
        assert_eq!(event.point.ce, Point::UNKNOWN_ERROR);
        assert_eq!(event.stale_window(), Duration::seconds(3600));
        assert_eq!(event.group_name(), Some("Orange"));

        let names: Vec<&str> = event.detail.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["usericon", "contact", "remarks", GROUP_TAG]);
        assert_eq!(
            event.find_detail("usericon").and_then(|d| d.attribute("iconsetpath")),
            Some("6d781afb-89a6-4c07-b2b9-a89748b6a38f/Misc/Camp.png")
        );
    }

    #[test]
    fn test_convert_inactive_incident_has_no_group() {
        let event = converter().convert(&record("CLOSED"));
        assert!(!event.has_detail(GROUP_TAG));
        assert_eq!(event.detail.len(), 3);
    }

    #[test]
    fn test_missing_incident_number_uses_id_source() {
        let conv = converter();
        let mut rec = record("ACTIVE");
        rec.incident_number = None;

        let first = conv.convert(&rec);
        let second = conv.convert(&rec);
        assert_eq!(first.uid, "GeoSafety-00000000-0000-0000-0000-000000000001");
        assert_ne!(first.uid, second.uid);
    }

    #[test]
    fn test_bad_coordinates_fall_back_to_zero() {
        let mut rec = record("ACTIVE");
        rec.lat_coord = Some("north-ish".to_string());
        rec.long_coord = None;

        let event = converter().convert(&rec);
        assert_eq!(event.point.lat, 0.0);
        assert_eq!(event.point.lon, 0.0);
    }

    #[test]
    fn test_custom_config() {
        let config = IncidentConfig {
            uid_prefix: "CAD".to_string(),
            active_group: "Red".to_string(),
            stale_secs: 600,
            ..Default::default()
        };
        let conv = IncidentConverter::new(
            config,
            Arc::new(SequentialIdSource::new()),
            Arc::new(FixedClock(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())),
        );

        let event = conv.convert(&record("ACTIVE"));
        assert_eq!(event.uid, "CAD-2025-000123");
        assert_eq!(event.group_name(), Some("Red"));
        assert_eq!(event.stale_window(), Duration::seconds(600));
    }

    #[test]
    fn test_lenient_deserialization() {
        let json = r#"{
            "Incidents": [
                {
                    "incident_number": 98765,
                    "lat_coord": 42.5,
                    "long_coord": "-83.1",
                    "incident_status": null,
                    "Comments": null
                }
            ]
        }"#;

        let feed = IncidentFeed::from_json(json).unwrap();
        assert_eq!(feed.len(), 1);
        let rec = &feed.incidents[0];
        assert_eq!(rec.incident_number.as_deref(), Some("98765"));
        assert_eq!(rec.lat_coord.as_deref(), Some("42.5"));
        assert_eq!(rec.long_coord.as_deref(), Some("-83.1"));
        assert_eq!(rec.incident_status, None);
        assert!(rec.comments.is_empty());
    }

    #[test]
    fn test_feed_without_incidents_key() {
        let feed = IncidentFeed::from_json(r#"{"Generated": "today"}"#).unwrap();
        assert!(feed.is_empty());
    }

    #[test]
    fn test_feed_rejects_malformed_document() {
        let err = IncidentFeed::from_json(r#"{"Incidents": [1, 2]}"#).unwrap_err();
        assert!(err.to_string().contains("JSON parse error"));

        let err = IncidentFeed::from_json("not json").unwrap_err();
        assert!(matches!(
            err,
            takfeed_core::TakFeedError::Input(InputError::JsonError { line: 1, .. })
        ));
    }
}
