//! A [`TagTool`] that keeps a file's tags as a JSON object inside the file
//! itself. Tags therefore travel with every copy and rename, which lets the
//! commit pipeline be exercised end to end without an ExifTool install.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::{Map, Value};

use crate::error::MetaError;
use crate::exiftool::TagTool;
use crate::tag::MetadataRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    Read(PathBuf),
    ClearAll(PathBuf),
    Apply { path: PathBuf, directives: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeOperation {
    Read,
    ClearAll,
    Apply,
}

#[derive(Debug, Default)]
pub struct FakeTagTool {
    fail_on: Option<FakeOperation>,
    calls: Mutex<Vec<ToolCall>>,
}

impl FakeTagTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(operation: FakeOperation) -> Self {
        Self {
            fail_on: Some(operation),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn seed(path: &Path, tags: &Value) -> Result<(), MetaError> {
        let Value::Object(map) = tags else {
            return Err(MetaError::Validation("seed tags must be a JSON object".to_string()));
        };
        write_tags(path, map)
    }

    pub fn calls(&self) -> Vec<ToolCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn record(&self, call: ToolCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn check(&self, operation: FakeOperation) -> Result<(), MetaError> {
        if self.fail_on == Some(operation) {
            return Err(MetaError::Tool(format!(
                "simulated {operation:?} failure"
            )));
        }
        Ok(())
    }
}

impl TagTool for FakeTagTool {
    fn read(&self, path: &Path) -> Result<MetadataRecord, MetaError> {
        self.record(ToolCall::Read(path.to_path_buf()));
        self.check(FakeOperation::Read)?;
        let mut tags = read_tags(path).map_err(|err| MetaError::Read(err.to_string()))?;
        let size = fs::metadata(path)
            .map_err(|err| MetaError::Read(err.to_string()))?
            .len();
        tags.insert(
            "SourceFile".to_string(),
            Value::String(path.display().to_string()),
        );
        if let Some(name) = path.file_name() {
            tags.insert(
                "FileName".to_string(),
                Value::String(name.to_string_lossy().to_string()),
            );
        }
        tags.insert("FileSize".to_string(), Value::String(format!("{size} bytes")));
        MetadataRecord::from_tool_json(&Value::Object(tags))
    }

    fn clear_all(&self, path: &Path) -> Result<(), MetaError> {
        self.record(ToolCall::ClearAll(path.to_path_buf()));
        self.check(FakeOperation::ClearAll)?;
        write_tags(path, &Map::new())
    }

    fn apply_instructions(&self, path: &Path, argfile: &Path) -> Result<(), MetaError> {
        let content = fs::read_to_string(argfile).map_err(|err| MetaError::Tool(err.to_string()))?;
        let directives = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect::<Vec<_>>();
        self.record(ToolCall::Apply {
            path: path.to_path_buf(),
            directives: directives.clone(),
        });
        self.check(FakeOperation::Apply)?;

        let mut tags = read_tags(path)?;
        for directive in &directives {
            let Some((name, value)) = directive
                .strip_prefix('-')
                .and_then(|rest| rest.split_once('='))
            else {
                return Err(MetaError::Tool(format!("unrecognized directive: {directive}")));
            };
            if value.is_empty() {
                tags.remove(name);
            } else {
                tags.insert(name.to_string(), Value::String(value.to_string()));
            }
        }
        write_tags(path, &tags)
    }

    fn version(&self) -> Option<String> {
        Some("fake".to_string())
    }
}

fn read_tags(path: &Path) -> Result<Map<String, Value>, MetaError> {
    let content = fs::read_to_string(path).map_err(|err| MetaError::Io(err.to_string()))?;
    if content.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str(&content) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(MetaError::Tool(format!(
            "unsupported file format: {}",
            path.display()
        ))),
    }
}

fn write_tags(path: &Path, tags: &Map<String, Value>) -> Result<(), MetaError> {
    let content =
        serde_json::to_vec_pretty(tags).map_err(|err| MetaError::Tool(err.to_string()))?;
    fs::write(path, content).map_err(|err| MetaError::Io(err.to_string()))
}
