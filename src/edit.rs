use std::collections::BTreeMap;

use serde::Serialize;

use crate::classify::{FieldClass, classify, classify_name};
use crate::error::MetaError;
use crate::format::{format_structure, format_value};
use crate::tag::MetadataRecord;

pub type EditableRecord = BTreeMap<String, String>;

const HIDDEN_IN_DISPLAY: &[&str] = &[
    "ExifToolVersion",
    "Directory",
    "SourceFile",
    "FilePermissions",
    "FileType",
    "FileTypeExtension",
    "errors",
    "warnings",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteInstructionSet {
    pub clear_all: bool,
    pub assignments: BTreeMap<String, String>,
}

impl WriteInstructionSet {
    pub fn strip_all() -> Self {
        Self {
            clear_all: true,
            assignments: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EditSummary {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub changed: Vec<String>,
}

impl EditSummary {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

// Structures are decomposed into the tool's write syntax, never the JSON
// display form.
pub fn build_editable_view(record: &MetadataRecord) -> EditableRecord {
    record
        .iter()
        .filter(|(name, value)| classify(name, value) == FieldClass::Editable)
        .map(|(name, value)| {
            let text = if value.is_structured() {
                format_structure(value)
            } else {
                format_value(value)
            };
            (name.clone(), text)
        })
        .filter(|(_, text)| !text.is_empty())
        .collect()
}

pub fn build_display_view(record: &MetadataRecord) -> EditableRecord {
    record
        .iter()
        .filter(|(name, value)| {
            !name.starts_with('_')
                && !name.starts_with("Error")
                && !name.starts_with("Warning")
                && !HIDDEN_IN_DISPLAY.contains(&name.as_str())
                && !value.is_binary()
        })
        .map(|(name, value)| (name.clone(), format_value(value)))
        .filter(|(_, text)| !text.is_empty())
        .collect()
}

pub fn build_write_instructions(
    _previous: &EditableRecord,
    submitted: &EditableRecord,
) -> WriteInstructionSet {
    let assignments = submitted
        .iter()
        .filter(|(name, value)| {
            classify_name(name) == FieldClass::Editable && !value.trim().is_empty()
        })
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    WriteInstructionSet {
        clear_all: true,
        assignments,
    }
}

pub fn summarize_edit(previous: &EditableRecord, submitted: &EditableRecord) -> EditSummary {
    let mut summary = EditSummary::default();
    for (name, value) in submitted {
        match previous.get(name) {
            None => summary.added.push(name.clone()),
            Some(old) if old != value => summary.changed.push(name.clone()),
            Some(_) => {}
        }
    }
    summary.removed = previous
        .keys()
        .filter(|name| !submitted.contains_key(*name))
        .cloned()
        .collect();
    summary
}

pub fn apply_field_edits(
    view: &EditableRecord,
    sets: &[String],
    unsets: &[String],
) -> Result<EditableRecord, MetaError> {
    let mut next = view.clone();
    for entry in sets {
        let (name, value) = entry
            .split_once('=')
            .ok_or_else(|| MetaError::Validation(format!("expected NAME=VALUE, got {entry}")))?;
        let name = name.trim();
        if classify_name(name) != FieldClass::Editable {
            return Err(MetaError::Validation(format!(
                "tag {name} is read-only and cannot be set"
            )));
        }
        next.insert(name.to_string(), value.trim().to_string());
    }
    for name in unsets {
        next.remove(name.trim());
    }
    Ok(next)
}
