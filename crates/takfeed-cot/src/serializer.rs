//! Canonical XML serialization for CoT messages
//!
//! The output has no insignificant whitespace and a fixed attribute order, so
//! equal [`Event`] values always serialize to identical bytes.

use crate::detail::DetailElement;
use crate::event::{format_decimal, format_time, Event};
use bytes::Bytes;
use quick_xml::escape::escape;
use std::fmt;

/// Declaration written in front of every event
pub const XML_DECLARATION: &str = "<?xml version='1.0' standalone='yes'?>";

/// Serialize an Event to an XML string
pub fn serialize_event(event: &Event) -> String {
    CanonicalXml(event).to_string()
}

/// Serialize an Event to the bytes handed to the transmission queue
pub fn to_bytes(event: &Event) -> Bytes {
    Bytes::from(serialize_event(event))
}

/// Display adapter writing an event as a complete XML document
pub struct CanonicalXml<'a>(pub &'a Event);

impl fmt::Display for CanonicalXml<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let event = self.0;

        f.write_str(XML_DECLARATION)?;

        write!(
            f,
            r#"<event version="{}" uid="{}" type="{}" how="{}" time="{}" start="{}" stale="{}">"#,
            escape(event.version.as_str()),
            escape(event.uid.as_str()),
            escape(event.event_type.as_str()),
            escape(event.how.as_str()),
            format_time(&event.time),
            format_time(&event.start),
            format_time(&event.stale),
        )?;

        let point = &event.point;
        write!(
            f,
            r#"<point lat="{}" lon="{}" hae="{}" ce="{}" le="{}"/>"#,
            format_decimal(point.lat, point.precision),
            format_decimal(point.lon, point.precision),
            format_decimal(point.hae, None),
            format_decimal(point.ce, None),
            format_decimal(point.le, None),
        )?;

        if event.detail.is_empty() {
            f.write_str("<detail/>")?;
        } else {
            f.write_str("<detail>")?;
            for element in &event.detail {
                write_element(f, element)?;
            }
            f.write_str("</detail>")?;
        }

        f.write_str("</event>")
    }
}

fn write_element(f: &mut fmt::Formatter<'_>, element: &DetailElement) -> fmt::Result {
    write!(f, "<{}", element.name)?;
    for (key, value) in &element.attributes {
        write!(f, r#" {}="{}""#, key, escape(value.as_str()))?;
    }

    if element.text.is_none() && element.children.is_empty() {
        return f.write_str("/>");
    }

    f.write_str(">")?;
    if let Some(ref text) = element.text {
        f.write_str(&escape(text.as_str()))?;
    }
    for child in &element.children {
        write_element(f, child)?;
    }
    write!(f, "</{}>", element.name)
}
