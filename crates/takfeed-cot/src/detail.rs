//! Detail blocks carried inside `<detail>`
//!
//! Every block is ultimately a [`DetailElement`]: a tag with ordered
//! attributes, optional text and nested child elements. The typed structs in
//! this module are the blocks producers attach; each converts into a
//! `DetailElement` and owns the number formatting its receivers expect.

use crate::event::{format_decimal, format_time};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tag TAK clients use for team/group membership
pub const GROUP_TAG: &str = "__group";

/// Generic extension block inside `<detail>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailElement {
    /// Tag name
    pub name: String,
    /// Attributes in serialization order
    pub attributes: Vec<(String, String)>,
    /// Nested elements in serialization order
    pub children: Vec<DetailElement>,
    /// Character data, written before any children
    pub text: Option<String>,
}

impl DetailElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            text: None,
        }
    }

    /// Append an attribute
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Append a child element
    pub fn child(mut self, child: impl Into<DetailElement>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Set the character data
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Look up an attribute value by key
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Find the first child with the given tag
    pub fn find_child(&self, name: &str) -> Option<&DetailElement> {
        self.children.iter().find(|c| c.name == name)
    }
}

/// Contact information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    /// Callsign for display
    pub callsign: String,
}

impl Contact {
    pub fn new(callsign: impl Into<String>) -> Self {
        Self {
            callsign: callsign.into(),
        }
    }
}

impl From<Contact> for DetailElement {
    fn from(contact: Contact) -> Self {
        DetailElement::new("contact").attr("callsign", contact.callsign)
    }
}

/// Free-text remarks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remarks {
    pub text: String,
}

impl Remarks {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl From<Remarks> for DetailElement {
    fn from(remarks: Remarks) -> Self {
        DetailElement::new("remarks").with_text(remarks.text)
    }
}

/// Icon from an iconset installed on the receiving client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIcon {
    /// `<iconset uuid>/<group>/<file>` path
    pub iconsetpath: String,
}

impl UserIcon {
    pub fn new(iconsetpath: impl Into<String>) -> Self {
        Self {
            iconsetpath: iconsetpath.into(),
        }
    }
}

impl From<UserIcon> for DetailElement {
    fn from(icon: UserIcon) -> Self {
        DetailElement::new("usericon").attr("iconsetpath", icon.iconsetpath)
    }
}

/// Group information (a team color such as "Orange")
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub name: String,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl From<Group> for DetailElement {
    fn from(group: Group) -> Self {
        DetailElement::new(GROUP_TAG).attr("name", group.name)
    }
}

/// Track information for moving entities
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    /// Course/heading in degrees (0-360)
    pub course: f64,
    /// Speed in meters per second
    pub speed: f64,
}

impl From<Track> for DetailElement {
    fn from(track: Track) -> Self {
        DetailElement::new("track")
            .attr("course", format_decimal(track.course, Some(1)))
            .attr("speed", format_decimal(track.speed, Some(2)))
    }
}

/// Remote ID style telemetry block.
///
/// Not a standard CoT detail; TAK servers relay unknown blocks untouched, so
/// downstream consumers can read it even though clients will not render it.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteId {
    pub standard: String,
    pub uas_id: String,
    pub msg_type: String,
    pub location: RemoteIdLocation,
    pub timestamp: DateTime<Utc>,
}

/// Kinematic snapshot nested inside [`RemoteId`]
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteIdLocation {
    pub lat: f64,
    pub lon: f64,
    pub alt_hae_m: f64,
    pub speed_mps: f64,
    pub heading_deg: f64,
}

impl From<RemoteIdLocation> for DetailElement {
    fn from(loc: RemoteIdLocation) -> Self {
        DetailElement::new("location")
            .attr("lat", format_decimal(loc.lat, Some(7)))
            .attr("lon", format_decimal(loc.lon, Some(7)))
            .attr("alt_hae_m", format_decimal(loc.alt_hae_m, Some(1)))
            .attr("speed_mps", format_decimal(loc.speed_mps, Some(2)))
            .attr("heading_deg", format_decimal(loc.heading_deg, Some(1)))
    }
}

impl From<RemoteId> for DetailElement {
    fn from(rid: RemoteId) -> Self {
        DetailElement::new("remoteid")
            .attr("standard", rid.standard)
            .attr("uas_id", rid.uas_id)
            .attr("msg_type", rid.msg_type)
            .child(rid.location)
            .child(DetailElement::new("timestamp").attr("iso8601", format_time(&rid.timestamp)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_contact_element() {
        let el: DetailElement = Contact::new("Alpha-1").into();
        assert_eq!(el.name, "contact");
        assert_eq!(el.attribute("callsign"), Some("Alpha-1"));
        assert!(el.children.is_empty());
        assert!(el.text.is_none());
    }

    #[test]
    fn test_group_uses_reserved_tag() {
        let el: DetailElement = Group::new("Orange").into();
        assert_eq!(el.name, "__group");
        assert_eq!(el.attribute("name"), Some("Orange"));
    }

    #[test]
    fn test_track_precision() {
        let el: DetailElement = Track {
            course: 90.0,
            speed: 15.0,
        }
        .into();
        assert_eq!(
            el.attributes,
            vec![
                ("course".to_string(), "90.0".to_string()),
                ("speed".to_string(), "15.00".to_string()),
            ]
        );
    }

    #[test]
    fn test_remote_id_children() {
        let rid = RemoteId {
            standard: "simulated".to_string(),
            uas_id: "UAS-ABC".to_string(),
            msg_type: "basic_id+location".to_string(),
            location: RemoteIdLocation {
                lat: 42.6064,
                lon: -83.1498,
                alt_hae_m: 120.0,
                speed_mps: 15.0,
                heading_deg: 90.0,
            },
            timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        };

        let el: DetailElement = rid.into();
        assert_eq!(el.attribute("uas_id"), Some("UAS-ABC"));

        let location = el.find_child("location").expect("location child");
        assert_eq!(location.attribute("lat"), Some("42.6064000"));
        assert_eq!(location.attribute("lon"), Some("-83.1498000"));
        assert_eq!(location.attribute("alt_hae_m"), Some("120.0"));

        let timestamp = el.find_child("timestamp").expect("timestamp child");
        assert_eq!(timestamp.attribute("iso8601"), Some("2025-01-01T00:00:00Z"));
    }

    #[test]
    fn test_attribute_lookup_missing() {
        let el = DetailElement::new("custom").attr("a", "1");
        assert_eq!(el.attribute("b"), None);
        assert!(el.find_child("x").is_none());
    }
}
