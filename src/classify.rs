use serde::Serialize;

use crate::tag::TagValue;

pub const IDENTITY_FIELDS: &[&str] = &[
    "FileName",
    "Directory",
    "SourceFile",
    "ExifToolVersion",
    "FileSize",
    "FileModifyDate",
    "FileAccessDate",
    "FileInodeChangeDate",
    "FilePermissions",
    "errors",
    "warnings",
];

// Writable pseudo-tags that act on the filesystem or read other files
// instead of storing metadata.
pub const TOOL_PSEUDO_TAGS: &[&str] = &[
    "All",
    "HardLink",
    "SymLink",
    "TestName",
    "Geotag",
    "Geosync",
    "Geotime",
    "Geolocate",
];

pub const RESERVED_PREFIXES: &[&str] = &["File", "Error", "Warning"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldClass {
    ReadOnly,
    Binary,
    Editable,
}

pub fn classify(name: &str, value: &TagValue) -> FieldClass {
    match classify_name(name) {
        FieldClass::Editable if value.is_binary() => FieldClass::Binary,
        class => class,
    }
}

/// Name-only classification, used where values are already plain strings.
/// Group qualifiers (`System:FileName`) are ignored: the rules apply to the
/// tag itself, compared case-insensitively as the tool does.
pub fn classify_name(name: &str) -> FieldClass {
    if !is_tag_name(name) {
        return FieldClass::ReadOnly;
    }
    let tag = leaf_name(name);
    if tag.is_empty() || tag.starts_with('-') || is_identity_field(tag) || is_internal(tag) {
        FieldClass::ReadOnly
    } else {
        FieldClass::Editable
    }
}

fn leaf_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

fn is_identity_field(tag: &str) -> bool {
    IDENTITY_FIELDS
        .iter()
        .chain(TOOL_PSEUDO_TAGS)
        .any(|reserved| tag.eq_ignore_ascii_case(reserved))
        || RESERVED_PREFIXES.iter().any(|prefix| {
            tag.get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
        })
}

fn is_internal(tag: &str) -> bool {
    tag.starts_with('_') || tag.eq_ignore_ascii_case("SourceFile")
}

pub fn is_tag_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | ':'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_fields_are_read_only_for_any_shape() {
        let shapes = [
            TagValue::text("x"),
            TagValue::date("2021:05:01 00:00:00"),
            TagValue::Binary { length: None },
            TagValue::Sequence(vec![]),
        ];
        for name in [
            "FileModifyDate",
            "SourceFile",
            "FileTypeExtension",
            "ErrorCount",
            "Warning",
            "ExifToolVersion",
            "Directory",
        ] {
            for value in &shapes {
                assert_eq!(classify(name, value), FieldClass::ReadOnly, "{name}");
            }
        }
    }

    #[test]
    fn internal_and_malformed_names_are_read_only() {
        assert_eq!(classify_name("_ctor"), FieldClass::ReadOnly);
        assert_eq!(classify_name(""), FieldClass::ReadOnly);
        assert_eq!(classify_name("-All"), FieldClass::ReadOnly);
        assert_eq!(classify_name("Make\n-FileName"), FieldClass::ReadOnly);
        assert_eq!(classify_name("Bad Name"), FieldClass::ReadOnly);
    }

    #[test]
    fn binary_and_editable() {
        assert_eq!(
            classify("ThumbnailImage", &TagValue::Binary { length: Some(1) }),
            FieldClass::Binary
        );
        assert_eq!(classify("Make", &TagValue::text("Acme")), FieldClass::Editable);
        assert_eq!(classify_name("XMP-dc:Title"), FieldClass::Editable);
        assert_eq!(classify_name("XMP:XMP-dc:Subject"), FieldClass::Editable);
    }

    #[test]
    fn group_qualified_reserved_names_stay_read_only() {
        for name in [
            "System:FileName",
            "System:Directory",
            "File:FileModifyDate",
            "XMP:XMP-x:_ctor",
            "Composite:SourceFile",
            "IFD0:",
            "EXIF:-All",
            "filename",
            "DIRECTORY",
            "fileSize",
        ] {
            assert_eq!(classify_name(name), FieldClass::ReadOnly, "{name}");
        }
    }

    #[test]
    fn tool_pseudo_tags_are_read_only() {
        for name in TOOL_PSEUDO_TAGS {
            assert_eq!(classify_name(name), FieldClass::ReadOnly, "{name}");
            let grouped = format!("System:{name}");
            assert_eq!(classify_name(&grouped), FieldClass::ReadOnly, "{grouped}");
        }
        assert_eq!(classify_name("symlink"), FieldClass::ReadOnly);
    }
}
