use std::fs;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;
use serde_json::json;

use metawiz::app::App;
use metawiz::edit::{EditableRecord, build_editable_view, build_write_instructions};
use metawiz::error::MetaError;
use metawiz::fake_tool::{FakeOperation, FakeTagTool, ToolCall};
use metawiz::gps::extract_coordinate;
use metawiz::pipeline::{CommitPipeline, CommitState};
use metawiz::store::ManagedStore;

fn temp_store() -> (tempfile::TempDir, ManagedStore) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().join("uploads")).unwrap();
    let store = ManagedStore::new_with_root(root);
    store.ensure_root().unwrap();
    (temp, store)
}

fn root_entries(store: &ManagedStore) -> Vec<String> {
    let mut names = fs::read_dir(store.root().as_std_path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect::<Vec<_>>();
    names.sort();
    names
}

fn view(fields: &[(&str, &str)]) -> EditableRecord {
    fields
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

#[test]
fn edit_scenario_drops_omitted_gps() {
    let (_temp, store) = temp_store();
    let target = store.root().join("photo.jpg");
    FakeTagTool::seed(
        target.as_std_path(),
        &json!({
            "GPSLatitude": "48.8566",
            "GPSLongitude": "2.3522",
            "Make": "Acme",
        }),
    )
    .unwrap();

    let app = App::new(store, FakeTagTool::new());
    let record = app.read("photo.jpg").unwrap();
    assert!(record.contains("FileSize"));
    assert!(extract_coordinate(&record).is_some());

    let previous = build_editable_view(&record);
    assert_eq!(
        previous,
        view(&[
            ("GPSLatitude", "48.8566"),
            ("GPSLongitude", "2.3522"),
            ("Make", "Acme"),
        ])
    );

    let submitted = view(&[("Make", "Beta")]);
    let instructions = build_write_instructions(&previous, &submitted);
    assert!(instructions.clear_all);
    assert_eq!(instructions.assignments, submitted);

    let result = app.update("photo.jpg", &submitted).unwrap();
    assert_eq!(result.commit.state, CommitState::Committed);
    assert_eq!(result.summary.removed, vec!["GPSLatitude", "GPSLongitude"]);
    assert_eq!(result.summary.changed, vec!["Make"]);

    let reread = app.read("photo.jpg").unwrap();
    assert_eq!(
        reread.get("Make").and_then(|value| value.as_scalar_text()),
        Some("Beta".to_string())
    );
    assert!(!reread.contains("GPSLatitude"));
    assert!(!reread.contains("GPSLongitude"));
    assert!(extract_coordinate(&reread).is_none());
    assert_eq!(root_entries(app.store()), vec!["photo.jpg".to_string()]);
}

#[test]
fn rewrite_failure_keeps_original_bytes() {
    let (_temp, store) = temp_store();
    let target = store.root().join("photo.jpg");
    FakeTagTool::seed(target.as_std_path(), &json!({ "Make": "Acme", "Model": "X1" })).unwrap();
    let before = fs::read(target.as_std_path()).unwrap();

    let tool = FakeTagTool::failing(FakeOperation::Apply);
    let pipeline = CommitPipeline::new(&store, &tool);
    let instructions = build_write_instructions(&EditableRecord::new(), &view(&[("Make", "Beta")]));
    let err = pipeline.commit("photo.jpg", &instructions).unwrap_err();

    assert_matches!(err, MetaError::Tool(_));
    assert_eq!(fs::read(target.as_std_path()).unwrap(), before);
    assert_eq!(root_entries(&store), vec!["photo.jpg".to_string()]);

    let calls = tool.calls();
    assert_matches!(&calls[0], ToolCall::ClearAll(path) if path != target.as_std_path());
    assert_matches!(
        &calls[1],
        ToolCall::Apply { directives, .. } if directives == &vec!["-Make=Beta".to_string()]
    );
}

#[test]
fn clear_failure_keeps_original_bytes() {
    let (_temp, store) = temp_store();
    let target = store.root().join("photo.jpg");
    FakeTagTool::seed(target.as_std_path(), &json!({ "Make": "Acme" })).unwrap();
    let before = fs::read(target.as_std_path()).unwrap();

    let tool = FakeTagTool::failing(FakeOperation::ClearAll);
    let err = CommitPipeline::new(&store, &tool)
        .delete_all("photo.jpg")
        .unwrap_err();

    assert_matches!(err, MetaError::Tool(_));
    assert_eq!(fs::read(target.as_std_path()).unwrap(), before);
    assert_eq!(root_entries(&store), vec!["photo.jpg".to_string()]);
}

#[test]
fn strip_removes_every_tag() {
    let (_temp, store) = temp_store();
    FakeTagTool::seed(
        store.root().join("photo.jpg").as_std_path(),
        &json!({ "Make": "Acme", "Artist": "Jo" }),
    )
    .unwrap();

    let app = App::new(store, FakeTagTool::new());
    let result = app.strip("photo.jpg").unwrap();
    assert_eq!(result.commit.applied, 0);
    assert!(app.editable_view("photo.jpg").unwrap().is_empty());
    assert!(
        app.tool()
            .calls()
            .iter()
            .all(|call| !matches!(call, ToolCall::Apply { .. }))
    );
}

#[test]
fn edit_fields_cannot_touch_reserved_tags() {
    let (_temp, store) = temp_store();
    FakeTagTool::seed(
        store.root().join("photo.jpg").as_std_path(),
        &json!({ "Make": "Acme" }),
    )
    .unwrap();
    let app = App::new(store, FakeTagTool::new());

    let err = app
        .edit_fields("photo.jpg", &["FileName=evil.jpg".to_string()], &[])
        .unwrap_err();
    assert_matches!(err, MetaError::Validation(_));

    let result = app
        .edit_fields("photo.jpg", &["Artist=Jo".to_string()], &[])
        .unwrap();
    assert_eq!(result.summary.added, vec!["Artist"]);
    let current = app.editable_view("photo.jpg").unwrap();
    assert_eq!(current, view(&[("Artist", "Jo"), ("Make", "Acme")]));
}

#[test]
fn missing_and_escaping_targets() {
    let (_temp, store) = temp_store();
    let app = App::new(store, FakeTagTool::new());
    assert_matches!(app.strip("absent.jpg"), Err(MetaError::NotFound(_)));
    assert_matches!(app.inspect("../outside.jpg"), Err(MetaError::PathEscape(_)));
    assert!(app.tool().calls().is_empty());
}

#[test]
fn commit_ignores_group_qualified_reserved_names() {
    let (_temp, store) = temp_store();
    FakeTagTool::seed(
        store.root().join("photo.jpg").as_std_path(),
        &json!({
            "Make": "Acme",
            "RegionInfo": { "RegionList": [{ "Name": "face" }] },
        }),
    )
    .unwrap();
    let app = App::new(store, FakeTagTool::new());

    let mut submitted = app.editable_view("photo.jpg").unwrap();
    submitted.insert("System:Directory".to_string(), "/tmp/escaped".to_string());
    submitted.insert("System:FileName".to_string(), "../../evil.jpg".to_string());
    submitted.insert("SymLink".to_string(), "/tmp/outside_link.jpg".to_string());
    let result = app.update("photo.jpg", &submitted).unwrap();
    assert_eq!(result.commit.file_id, "photo.jpg");

    let directives = app
        .tool()
        .calls()
        .into_iter()
        .find_map(|call| match call {
            ToolCall::Apply { directives, .. } => Some(directives),
            _ => None,
        })
        .unwrap();
    assert_eq!(
        directives,
        vec![
            "-Make=Acme".to_string(),
            "-RegionInfo={RegionList=[{Name=face}]}".to_string(),
        ]
    );
    assert_eq!(root_entries(app.store()), vec!["photo.jpg"]);
}
