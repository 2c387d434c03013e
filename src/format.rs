use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

use crate::tag::{Scalar, TagValue};

const DISPLAY_DATE_TIME: &str = "%Y-%m-%d %H:%M:%S";
const DISPLAY_DATE: &str = "%Y-%m-%d";

const OFFSET_FORMATS: &[&str] = &[
    "%Y:%m:%d %H:%M:%S%.f%:z",
    "%Y:%m:%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y:%m:%d %H:%M%:z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y:%m:%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y:%m:%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y:%m:%d", "%Y-%m-%d"];

pub fn format_value(value: &TagValue) -> String {
    match value {
        TagValue::Scalar(Scalar::Text(text)) => text.clone(),
        TagValue::Scalar(Scalar::Number(number)) => number.to_string(),
        TagValue::Scalar(Scalar::Bool(flag)) => flag.to_string(),
        TagValue::DateLike { raw_value } => format_date(raw_value).unwrap_or_default(),
        TagValue::Binary { .. } => String::new(),
        TagValue::Sequence(items) => items
            .iter()
            .map(format_value)
            .collect::<Vec<_>>()
            .join(", "),
        TagValue::Nested(_) => serde_json::to_string(&value.to_json()).unwrap_or_default(),
    }
}

/// Renders a structure in the tool's serialized write syntax
/// (`{Field=value,List=[a,b]}`), so it can be assigned back as one tag.
/// Binary and empty members are left out.
pub fn format_structure(value: &TagValue) -> String {
    match value {
        TagValue::Nested(fields) => {
            let members: Vec<String> = fields
                .iter()
                .filter_map(|(name, field)| {
                    let text = format_structure(field);
                    (!text.is_empty()).then(|| format!("{name}={text}"))
                })
                .collect();
            if members.is_empty() {
                String::new()
            } else {
                format!("{{{}}}", members.join(","))
            }
        }
        TagValue::Sequence(items) => {
            let members: Vec<String> = items
                .iter()
                .map(format_structure)
                .filter(|text| !text.is_empty())
                .collect();
            if members.is_empty() {
                String::new()
            } else {
                format!("[{}]", members.join(","))
            }
        }
        leaf => escape_structure_text(&format_value(leaf)),
    }
}

fn escape_structure_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, ',' | '[' | ']' | '{' | '}' | '|') {
            escaped.push('|');
        }
        escaped.push(ch);
    }
    escaped
}

pub fn format_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(render_with_offset(&parsed));
    }
    let normalized = raw.replace('Z', "+00:00");
    for pattern in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(&normalized, pattern) {
            return Some(render_with_offset(&parsed));
        }
    }
    for pattern in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, pattern) {
            return Some(parsed.format(DISPLAY_DATE_TIME).to_string());
        }
    }
    for pattern in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(raw, pattern) {
            return Some(parsed.format(DISPLAY_DATE).to_string());
        }
    }
    None
}

fn render_with_offset(value: &DateTime<FixedOffset>) -> String {
    format!("{} {}", value.format(DISPLAY_DATE_TIME), value.format("%:z"))
}
