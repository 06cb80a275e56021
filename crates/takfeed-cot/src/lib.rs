//! Cursor on Target event model and canonical XML serialization
//!
//! Producers build immutable [`Event`] values with [`EventBuilder`] and turn
//! them into wire bytes with [`serialize_event`] / [`to_bytes`]. The output is
//! canonical: a fixed declaration, a fixed attribute order and no
//! insignificant whitespace, so identical events give identical bytes.
//!
//! # Example
//!
//! ```rust
//! use chrono::{Duration, TimeZone, Utc};
//! use takfeed_cot::{serialize_event, Contact, Event, Point};
//!
//! let now = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
//! let event = Event::builder("test-1", "a-u-G")
//!     .point(Point::new(37.7749, -122.4194, 0.0))
//!     .stale_after(Duration::hours(1))
//!     .detail(Contact::new("Alpha-1"))
//!     .build(now);
//!
//! let xml = serialize_event(&event);
//! assert!(xml.starts_with("<?xml version='1.0' standalone='yes'?><event"));
//! assert!(xml.contains(r#"stale="2024-01-15T11:30:00Z""#));
//! ```

pub mod detail;
pub mod event;
pub mod serializer;
pub mod validate;

pub use detail::{
    Contact, DetailElement, Group, Remarks, RemoteId, RemoteIdLocation, Track, UserIcon,
    GROUP_TAG,
};
pub use event::{
    format_decimal, format_time, Event, EventBuilder, Point, COT_VERSION, DEFAULT_STALE_SECS,
    HOW_MACHINE_GENERATED,
};
pub use serializer::{serialize_event, to_bytes, CanonicalXml, XML_DECLARATION};
pub use validate::{validate_event, validate_point, ValidationError};
