use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::tag::{MetadataRecord, TagValue};

static COORDINATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(-?\d+(?:\.\d+)?)(?:\s*deg)?(?:\s+(\d+(?:\.\d+)?)')?(?:\s+(\d+(?:\.\d+)?)")?\s*([NSEWnsew])?$"#,
    )
    .unwrap()
});

static NUMERIC_PAIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(-?\d+(?:\.\d+)?)[,\s]+(-?\d+(?:\.\d+)?)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LatitudeRef {
    North,
    South,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LongitudeRef {
    East,
    West,
}

impl LatitudeRef {
    pub fn letter(self) -> &'static str {
        match self {
            LatitudeRef::North => "N",
            LatitudeRef::South => "S",
        }
    }

    fn apply(self, magnitude: f64) -> f64 {
        match self {
            LatitudeRef::North => magnitude,
            LatitudeRef::South => -magnitude,
        }
    }
}

impl LongitudeRef {
    pub fn letter(self) -> &'static str {
        match self {
            LongitudeRef::East => "E",
            LongitudeRef::West => "W",
        }
    }

    fn apply(self, magnitude: f64) -> f64 {
        match self {
            LongitudeRef::East => magnitude,
            LongitudeRef::West => -magnitude,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GpsCoordinate {
    pub lat: f64,
    pub lng: f64,
}

impl GpsCoordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        let lat_ref = if lat < 0.0 {
            LatitudeRef::South
        } else {
            LatitudeRef::North
        };
        let lng_ref = if lng < 0.0 {
            LongitudeRef::West
        } else {
            LongitudeRef::East
        };
        Self {
            lat: lat_ref.apply(lat.abs()),
            lng: lng_ref.apply(lng.abs()),
        }
    }

    pub fn latitude_ref(&self) -> LatitudeRef {
        if self.lat < 0.0 {
            LatitudeRef::South
        } else {
            LatitudeRef::North
        }
    }

    pub fn longitude_ref(&self) -> LongitudeRef {
        if self.lng < 0.0 {
            LongitudeRef::West
        } else {
            LongitudeRef::East
        }
    }

    /// Display fields in the tool's convention: unsigned magnitudes plus
    /// reference letters. For display only; never written back to a file.
    pub fn to_record(&self) -> MetadataRecord {
        [
            ("GPSLatitude", TagValue::text(self.lat.abs().to_string())),
            ("GPSLatitudeRef", TagValue::text(self.latitude_ref().letter())),
            ("GPSLongitude", TagValue::text(self.lng.abs().to_string())),
            ("GPSLongitudeRef", TagValue::text(self.longitude_ref().letter())),
        ]
        .into_iter()
        .collect()
    }

    pub fn map_url(&self) -> String {
        format!(
            "https://www.google.com/maps/search/?api=1&query={},{}",
            self.lat, self.lng
        )
    }
}

impl fmt::Display for GpsCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.lat, self.lng)
    }
}

pub fn extract_coordinate(record: &MetadataRecord) -> Option<GpsCoordinate> {
    // A present pair is authoritative even when it does not parse.
    match (record.get("GPSLatitude"), record.get("GPSLongitude")) {
        (Some(lat), Some(lng)) => from_pair(record, lat, lng),
        _ => from_position(record),
    }
}

fn from_pair(record: &MetadataRecord, lat: &TagValue, lng: &TagValue) -> Option<GpsCoordinate> {
    let lat_text = lat.as_scalar_text()?;
    let lng_text = lng.as_scalar_text()?;
    let lat = parse_coordinate(&lat_text, record.get("GPSLatitudeRef"), 'S')?;
    let lng = parse_coordinate(&lng_text, record.get("GPSLongitudeRef"), 'W')?;
    Some(GpsCoordinate::new(lat, lng))
}

fn from_position(record: &MetadataRecord) -> Option<GpsCoordinate> {
    let text = record.get("GPSPosition").and_then(TagValue::as_scalar_text)?;
    let text = text.trim();
    if text.contains("deg") || text.ends_with(|ch: char| ch.is_ascii_alphabetic()) {
        let (lat, lng) = text.split_once(',')?;
        return Some(GpsCoordinate::new(
            parse_coordinate(lat, None, 'S')?,
            parse_coordinate(lng, None, 'W')?,
        ));
    }
    let captures = NUMERIC_PAIR.captures(text)?;
    let lat = finite(captures[1].parse().ok()?)?;
    let lng = finite(captures[2].parse().ok()?)?;
    Some(GpsCoordinate::new(lat, lng))
}

fn parse_coordinate(text: &str, reference: Option<&TagValue>, negative: char) -> Option<f64> {
    let text = text.trim();
    let captures = COORDINATE.captures(text)?;
    let degrees: f64 = captures[1].parse().ok()?;
    let minutes: f64 = match captures.get(2) {
        Some(value) => value.as_str().parse().ok()?,
        None => 0.0,
    };
    let seconds: f64 = match captures.get(3) {
        Some(value) => value.as_str().parse().ok()?,
        None => 0.0,
    };
    let magnitude = degrees.abs() + minutes / 60.0 + seconds / 3600.0;
    let signed = degrees.is_sign_negative() || text.starts_with('-');

    let is_negative = match captures.get(4) {
        Some(letter) => letter.as_str().eq_ignore_ascii_case(&negative.to_string()),
        None if signed => true,
        None => reference
            .and_then(TagValue::as_scalar_text)
            .and_then(|value| value.trim().chars().next())
            .map(|ch| ch.eq_ignore_ascii_case(&negative))
            .unwrap_or(false),
    };
    let value = if is_negative { -magnitude } else { magnitude };
    finite(value)
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}
