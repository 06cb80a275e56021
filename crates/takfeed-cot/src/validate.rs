//! Sanity checks for generated CoT events

use crate::event::{format_time, Event, Point};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Invalid latitude: {0} (must be between -90 and 90)")]
    InvalidLatitude(f64),

    #[error("Invalid longitude: {0} (must be between -180 and 180)")]
    InvalidLongitude(f64),

    #[error("Invalid circular error: {0} (must be positive)")]
    InvalidCircularError(f64),

    #[error("Invalid linear error: {0} (must be positive)")]
    InvalidLinearError(f64),

    #[error("Invalid timestamp order: stale ({0}) must be after start ({1})")]
    InvalidTimestampOrder(String, String),

    #[error("Invalid CoT type format: {0}")]
    InvalidCotType(String),

    #[error("Empty UID")]
    EmptyUid,

    #[error("Empty version")]
    EmptyVersion,

    #[error("Invalid detail tag: {0:?}")]
    InvalidDetailTag(String),
}

/// Validates a CoT Event
pub fn validate_event(event: &Event) -> Result<(), ValidationError> {
    if event.version.is_empty() {
        return Err(ValidationError::EmptyVersion);
    }

    if event.uid.is_empty() {
        return Err(ValidationError::EmptyUid);
    }

    // Dash-separated, e.g. "a-f-G"
    if !event.event_type.contains('-') {
        return Err(ValidationError::InvalidCotType(event.event_type.clone()));
    }

    if event.stale <= event.start {
        return Err(ValidationError::InvalidTimestampOrder(
            format_time(&event.stale),
            format_time(&event.start),
        ));
    }

    validate_point(&event.point)?;

    // Tags are written verbatim, so they must be plain XML names
    for element in &event.detail {
        if !is_xml_name(&element.name) {
            return Err(ValidationError::InvalidDetailTag(element.name.clone()));
        }
    }

    Ok(())
}

/// Validates a Point
pub fn validate_point(point: &Point) -> Result<(), ValidationError> {
    if !(-90.0..=90.0).contains(&point.lat) {
        return Err(ValidationError::InvalidLatitude(point.lat));
    }

    if !(-180.0..=180.0).contains(&point.lon) {
        return Err(ValidationError::InvalidLongitude(point.lon));
    }

    if point.ce < 0.0 {
        return Err(ValidationError::InvalidCircularError(point.ce));
    }

    if point.le < 0.0 {
        return Err(ValidationError::InvalidLinearError(point.le));
    }

    Ok(())
}

fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}
