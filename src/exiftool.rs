use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::MetaError;
use crate::tag::MetadataRecord;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const POLL_INTERVAL: Duration = Duration::from_millis(20);

pub trait TagTool: Send + Sync {
    fn read(&self, path: &Path) -> Result<MetadataRecord, MetaError>;
    fn clear_all(&self, path: &Path) -> Result<(), MetaError>;
    fn apply_instructions(&self, path: &Path, argfile: &Path) -> Result<(), MetaError>;
    fn version(&self) -> Option<String>;
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub exiftool: Option<String>,
    pub path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SystemExifTool {
    program: Option<PathBuf>,
    timeout: Duration,
}

struct ToolOutput {
    stdout: String,
    stderr: String,
}

impl SystemExifTool {
    pub fn new() -> Self {
        Self {
            program: find_in_path("exiftool"),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_program(program: PathBuf) -> Self {
        Self {
            program: Some(program),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn info(&self) -> ToolInfo {
        ToolInfo {
            exiftool: self.version(),
            path: self
                .program
                .as_ref()
                .map(|path| path.to_string_lossy().to_string()),
        }
    }

    fn require_program(&self) -> Result<&PathBuf, MetaError> {
        self.program
            .as_ref()
            .ok_or_else(|| MetaError::MissingTool("exiftool".to_string()))
    }

    fn run_cmd(&self, args: &[OsString]) -> Result<ToolOutput, MetaError> {
        let program = self.require_program()?;
        debug!(program = %program.display(), ?args, "running exiftool");
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| MetaError::Tool(format!("spawn {}: {err}", program.display())))?;
        let (success, output) = wait_with_timeout(child, self.timeout)?;
        if success {
            if !output.stderr.trim().is_empty() {
                warn!(stderr = %output.stderr.trim(), "exiftool reported warnings");
            }
            return Ok(output);
        }
        let stderr = output.stderr.trim().to_string();
        let message = if stderr.is_empty() {
            format!("command failed: {}", program.display())
        } else {
            stderr
        };
        Err(MetaError::Tool(message))
    }
}

impl Default for SystemExifTool {
    fn default() -> Self {
        Self::new()
    }
}

impl TagTool for SystemExifTool {
    fn read(&self, path: &Path) -> Result<MetadataRecord, MetaError> {
        let output = self
            .run_cmd(&["-json".into(), "-struct".into(), "-m".into(), path.into()])
            .map_err(|err| match err {
                MetaError::Tool(message) => MetaError::Read(message),
                other => other,
            })?;
        let value: serde_json::Value = serde_json::from_str(&output.stdout)
            .map_err(|err| MetaError::Read(format!("invalid exiftool output: {err}")))?;
        MetadataRecord::from_tool_json(&value)
    }

    fn clear_all(&self, path: &Path) -> Result<(), MetaError> {
        self.run_cmd(&[
            "-All=".into(),
            "-m".into(),
            "-overwrite_original".into(),
            path.into(),
        ])?;
        Ok(())
    }

    fn apply_instructions(&self, path: &Path, argfile: &Path) -> Result<(), MetaError> {
        self.run_cmd(&[
            "-m".into(),
            "-overwrite_original".into(),
            "-@".into(),
            argfile.into(),
            path.into(),
        ])?;
        Ok(())
    }

    fn version(&self) -> Option<String> {
        let output = self.run_cmd(&["-ver".into()]).ok()?;
        let stdout = output.stdout.trim().to_string();
        if stdout.is_empty() { None } else { Some(stdout) }
    }
}

// Waits for `child`, draining both pipes on helper threads so a chatty
// process cannot block on a full pipe. Kills the child once `timeout` passes.
fn wait_with_timeout(mut child: Child, timeout: Duration) -> Result<(bool, ToolOutput), MetaError> {
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);
    let deadline = Instant::now() + timeout;

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                if let Err(err) = child.kill() {
                    warn!(error = %err, "failed to kill timed out exiftool");
                }
                let _ = child.wait();
                return Err(MetaError::Timeout {
                    seconds: timeout.as_secs(),
                });
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(err) => return Err(MetaError::Tool(err.to_string())),
        }
    };

    let output = ToolOutput {
        stdout: stdout.map(join_reader).unwrap_or_default(),
        stderr: stderr.map(join_reader).unwrap_or_default(),
    };
    Ok((status.success(), output))
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = reader.read_to_end(&mut buffer);
        String::from_utf8_lossy(&buffer).to_string()
    })
}

fn join_reader(handle: thread::JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{name}.exe"));
        if exe.exists() {
            return Some(exe);
        }
        let plain = path.join(name);
        if plain.exists() {
            return Some(plain);
        }
    }
    None
}
