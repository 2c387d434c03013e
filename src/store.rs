use std::fs;
use std::io::Write;
use std::path::Path;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use serde::Serialize;
use tempfile::{Builder, TempPath};

use crate::error::MetaError;

pub const ARGFILE_PREFIX: &str = "metawiz_cmd_";

#[derive(Debug, Clone)]
pub struct ManagedStore {
    root: Utf8PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredFile {
    pub file_id: String,
    pub size: u64,
}

impl ManagedStore {
    pub fn new() -> Result<Self, MetaError> {
        let root = BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(dirs.data_local_dir().join("metawiz").join("uploads"))
                    .ok()
            })
            .ok_or_else(|| MetaError::Io("unable to resolve storage directory".to_string()))?;
        Ok(Self { root })
    }

    pub fn new_with_root(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn ensure_root(&self) -> Result<(), MetaError> {
        fs::create_dir_all(self.root.as_std_path()).map_err(|err| MetaError::Io(err.to_string()))
    }

    /// Maps a caller-supplied identifier to a path under the root. Rejects
    /// absolute paths, `..`, and hidden components (staging files are hidden).
    pub fn resolve(&self, file_id: &str) -> Result<Utf8PathBuf, MetaError> {
        let trimmed = file_id.trim();
        if trimmed.is_empty() {
            return Err(MetaError::InvalidFileId("no file identifier provided".to_string()));
        }
        let relative = Utf8Path::new(trimmed);
        for component in relative.components() {
            match component {
                Utf8Component::Normal(part) if !part.starts_with('.') => {}
                Utf8Component::CurDir => {}
                Utf8Component::Normal(_) => {
                    return Err(MetaError::InvalidFileId(file_id.to_string()));
                }
                _ => return Err(MetaError::PathEscape(file_id.to_string())),
            }
        }
        let path = self.root.join(relative);
        self.ensure_inside(path.as_std_path())?;
        Ok(path)
    }

    pub fn resolve_existing(&self, file_id: &str) -> Result<Utf8PathBuf, MetaError> {
        let path = self.resolve(file_id)?;
        if !path.as_std_path().is_file() {
            return Err(MetaError::NotFound(file_id.to_string()));
        }
        Ok(path)
    }

    pub fn ensure_inside(&self, path: &Path) -> Result<(), MetaError> {
        let root = fs::canonicalize(self.root.as_std_path())
            .map_err(|err| MetaError::Io(format!("storage root {}: {err}", self.root)))?;
        let resolved = match fs::canonicalize(path) {
            Ok(resolved) => resolved,
            Err(_) => {
                let parent = path
                    .parent()
                    .ok_or_else(|| MetaError::PathEscape(path.display().to_string()))?;
                let name = path
                    .file_name()
                    .ok_or_else(|| MetaError::PathEscape(path.display().to_string()))?;
                fs::canonicalize(parent)
                    .map_err(|_| MetaError::NotFound(path.display().to_string()))?
                    .join(name)
            }
        };
        if resolved.starts_with(&root) && resolved != root {
            Ok(())
        } else {
            Err(MetaError::PathEscape(path.display().to_string()))
        }
    }

    pub fn create_staging(&self, target: &Utf8Path) -> Result<TempPath, MetaError> {
        let parent = target
            .parent()
            .ok_or_else(|| MetaError::Io("invalid target path".to_string()))?;
        let prefix = format!(".{}.", target.file_stem().unwrap_or("file"));
        let suffix = match target.extension() {
            Some(ext) => format!(".tmp.{ext}"),
            None => ".tmp".to_string(),
        };
        let temp = Builder::new()
            .prefix(&prefix)
            .suffix(&suffix)
            .tempfile_in(parent.as_std_path())
            .map_err(|err| MetaError::Io(err.to_string()))?
            .into_temp_path();
        self.ensure_inside(&temp)?;
        Ok(temp)
    }

    pub fn write_argfile(&self, lines: &[String]) -> Result<TempPath, MetaError> {
        let nonce = chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_default();
        let mut file = Builder::new()
            .prefix(&format!("{ARGFILE_PREFIX}{nonce}_"))
            .suffix(".txt")
            .tempfile_in(self.root.as_std_path())
            .map_err(|err| MetaError::Io(err.to_string()))?;
        for line in lines {
            writeln!(file, "{line}").map_err(|err| MetaError::Io(err.to_string()))?;
        }
        file.flush().map_err(|err| MetaError::Io(err.to_string()))?;
        let temp = file.into_temp_path();
        self.ensure_inside(&temp)?;
        Ok(temp)
    }

    pub fn copy(source: &Path, dest: &Path) -> Result<(), MetaError> {
        fs::copy(source, dest)
            .map(|_| ())
            .map_err(|err| MetaError::Io(format!("copy {}: {err}", source.display())))
    }

    pub fn remove(path: &Path) -> Result<(), MetaError> {
        if path.exists() {
            fs::remove_file(path)
                .map_err(|err| MetaError::Io(format!("remove {}: {err}", path.display())))?;
        }
        Ok(())
    }

    pub fn import(&self, source: &Path) -> Result<String, MetaError> {
        if !source.is_file() {
            return Err(MetaError::NotFound(source.display().to_string()));
        }
        self.ensure_root()?;
        let suffix = source
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();
        let temp = Builder::new()
            .prefix("")
            .rand_bytes(16)
            .suffix(&suffix)
            .tempfile_in(self.root.as_std_path())
            .map_err(|err| MetaError::Io(err.to_string()))?
            .into_temp_path();
        Self::copy(source, &temp)?;
        let kept = temp.keep().map_err(|err| MetaError::Io(err.to_string()))?;
        kept.file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_else(|| MetaError::Io("imported file has no UTF-8 name".to_string()))
    }

    pub fn export(&self, file_id: &str, dest: &Utf8Path) -> Result<(), MetaError> {
        let source = self.resolve_existing(file_id)?;
        let parent = match dest.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent.to_path_buf(),
            _ => Utf8PathBuf::from("."),
        };
        fs::create_dir_all(parent.as_std_path()).map_err(|err| MetaError::Io(err.to_string()))?;
        let temp = Builder::new()
            .prefix("metawiz-export")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| MetaError::Io(err.to_string()))?
            .into_temp_path();
        Self::copy(source.as_std_path(), &temp)?;
        temp.persist(dest.as_std_path())
            .map_err(|err| MetaError::Io(err.to_string()))?;
        Ok(())
    }

    pub fn list(&self) -> Result<Vec<StoredFile>, MetaError> {
        if !self.root.as_std_path().exists() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        let entries =
            fs::read_dir(self.root.as_std_path()).map_err(|err| MetaError::Io(err.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|err| MetaError::Io(err.to_string()))?;
            let metadata = entry.metadata().map_err(|err| MetaError::Io(err.to_string()))?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !metadata.is_file() || name.starts_with('.') || name.starts_with(ARGFILE_PREFIX) {
                continue;
            }
            files.push(StoredFile {
                file_id: name,
                size: metadata.len(),
            });
        }
        files.sort_by(|a, b| a.file_id.cmp(&b.file_id));
        Ok(files)
    }
}
