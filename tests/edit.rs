use serde_json::json;

use metawiz::classify::{FieldClass, IDENTITY_FIELDS, TOOL_PSEUDO_TAGS, classify, classify_name};
use metawiz::edit::{EditableRecord, build_editable_view, build_write_instructions};
use metawiz::format::format_value;
use metawiz::gps::{LatitudeRef, LongitudeRef, extract_coordinate};
use metawiz::pipeline::instruction_lines;
use metawiz::tag::{MetadataRecord, TagValue};

fn view(fields: &[(&str, &str)]) -> EditableRecord {
    fields
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

fn tool_record() -> MetadataRecord {
    MetadataRecord::from_tool_json(&json!([{
        "SourceFile": "uploads/a.jpg",
        "ExifToolVersion": 12.76,
        "FileName": "a.jpg",
        "FileModifyDate": "2024:01:02 03:04:05+01:00",
        "Make": "Acme",
        "ISO": 100,
        "CreateDate": "2024:01:02 03:04:05",
        "ModifyDate": "0000:00:00 00:00:00",
        "ThumbnailImage": "(Binary data 5120 bytes, use -b option to extract)",
        "Subject": ["beach", "sunset"],
        "Warning": "Minor error"
    }]))
    .unwrap()
}

#[test]
fn editable_view_is_pure() {
    let record = tool_record();
    let first = build_editable_view(&record);
    let second = build_editable_view(&record);
    assert_eq!(first, second);
    assert_eq!(
        first,
        view(&[
            ("CreateDate", "2024-01-02 03:04:05"),
            ("ISO", "100"),
            ("Make", "Acme"),
            ("Subject", "beach, sunset"),
        ])
    );
}

#[test]
fn scalar_round_trip() {
    let record: MetadataRecord = [
        ("Make", TagValue::text("Acme")),
        ("Model", TagValue::text("X1")),
        ("Artist", TagValue::text("Jo")),
    ]
    .into_iter()
    .collect();
    let current = build_editable_view(&record);
    let instructions = build_write_instructions(&current, &current);
    assert!(instructions.clear_all);
    assert_eq!(instructions.assignments, current);
    assert_eq!(instructions.assignments.len(), 3);
}

#[test]
fn deletion_via_omission() {
    let instructions =
        build_write_instructions(&view(&[("A", "1"), ("B", "2")]), &view(&[("A", "1")]));
    assert!(instructions.clear_all);
    assert_eq!(instructions.assignments, view(&[("A", "1")]));
}

#[test]
fn classifier_never_leaks_reserved_names() {
    let shapes = [
        TagValue::text("value"),
        TagValue::date("2024:01:02 03:04:05"),
        TagValue::Binary { length: Some(3) },
        TagValue::Sequence(vec![TagValue::text("a")]),
    ];
    let names = IDENTITY_FIELDS
        .iter()
        .copied()
        .chain(["FileAnything", "ErrorLog", "WarningText", "_meta"]);
    for name in names {
        assert_ne!(classify_name(name), FieldClass::Editable, "{name}");
        for value in &shapes {
            assert_ne!(classify(name, value), FieldClass::Editable, "{name}");
        }
    }
}

#[test]
fn group_qualified_and_pseudo_tags_never_reach_instructions() {
    let submitted = view(&[
        ("System:Directory", "/tmp/escaped"),
        ("System:FileName", "../../evil.jpg"),
        ("SymLink", "/tmp/outside_link.jpg"),
        ("HardLink", "/tmp/copy.jpg"),
        ("TestName", "/tmp/renamed.jpg"),
        ("Geotag", "/etc/passwd"),
        ("XMP:Geosync", "+1:00"),
        ("filename", "lower.jpg"),
        ("EXIF:Make", "Acme"),
    ]);
    for name in submitted.keys().filter(|name| name.as_str() != "EXIF:Make") {
        assert_eq!(classify_name(name), FieldClass::ReadOnly, "{name}");
    }
    for name in TOOL_PSEUDO_TAGS {
        assert_ne!(classify(name, &TagValue::text("x")), FieldClass::Editable, "{name}");
    }

    let instructions = build_write_instructions(&EditableRecord::new(), &submitted);
    assert_eq!(instructions.assignments, view(&[("EXIF:Make", "Acme")]));
    assert_eq!(
        instruction_lines(&submitted),
        vec!["-EXIF:Make=Acme".to_string()]
    );
}

#[test]
fn nested_values_are_written_as_structures() {
    let record = MetadataRecord::from_tool_json(&json!([{
        "Make": "Acme",
        "RegionInfo": { "RegionList": [{ "Name": "face" }] },
        "Contributors": [{ "Name": "Jo", "Role": "editor" }]
    }]))
    .unwrap();
    let current = build_editable_view(&record);
    assert_eq!(
        current,
        view(&[
            ("Contributors", "[{Name=Jo,Role=editor}]"),
            ("Make", "Acme"),
            ("RegionInfo", "{RegionList=[{Name=face}]}"),
        ])
    );

    let instructions = build_write_instructions(&current, &current);
    assert!(instructions.assignments.values().all(|value| !value.contains('"')));
    assert_eq!(instructions.assignments, current);
}

#[test]
fn formatter_fails_safe() {
    assert_eq!(format_value(&TagValue::Binary { length: None }), "");
    assert_eq!(format_value(&TagValue::date("2024:13:45 99:99:99")), "");
    assert_eq!(format_value(&TagValue::date("garbage")), "");
}

#[test]
fn gps_sign_consistency() {
    let record: MetadataRecord = [
        ("GPSLatitude", TagValue::text("-12.5")),
        ("GPSLongitude", TagValue::text("45.0")),
    ]
    .into_iter()
    .collect();
    let coordinate = extract_coordinate(&record).unwrap();
    assert_eq!(coordinate.lat, -12.5);
    assert_eq!(coordinate.lng, 45.0);
    assert_eq!(coordinate.latitude_ref(), LatitudeRef::South);
    assert_eq!(coordinate.longitude_ref(), LongitudeRef::East);
    assert_eq!(extract_coordinate(&coordinate.to_record()), Some(coordinate));

    let editable = build_editable_view(&record);
    let instructions = build_write_instructions(&editable, &editable);
    assert!(!instructions.assignments.contains_key("GPSLatitudeRef"));
}
