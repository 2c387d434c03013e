use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use metawiz::app::{App, EditResult, InspectResult};
use metawiz::config::ConfigLoader;
use metawiz::edit::EditableRecord;
use metawiz::error::{ErrorKind, MetaError};
use metawiz::exiftool::SystemExifTool;
use metawiz::output::{JsonOutput, OutputMode};

#[derive(Parser)]
#[command(name = "metawiz")]
#[command(about = "Inspect, edit and strip embedded file metadata through ExifTool")]
#[command(version, author)]
struct Cli {
    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true)]
    config: Option<String>,

    /// Managed storage directory (overrides the config file)
    #[arg(long, global = true)]
    root: Option<Utf8PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Copy a file into managed storage")]
    Import(ImportArgs),
    #[command(about = "List managed files")]
    List,
    #[command(about = "Show a file's metadata")]
    View(FileArgs),
    #[command(about = "Show a file's GPS position")]
    Gps(FileArgs),
    #[command(about = "Edit metadata: unlisted tags are removed on commit")]
    Edit(EditArgs),
    #[command(about = "Remove all metadata")]
    Strip(FileArgs),
    #[command(about = "Copy a managed file out of storage")]
    Export(ExportArgs),
    #[command(about = "Show ExifTool version and location")]
    Tool,
}

#[derive(Args)]
struct ImportArgs {
    path: PathBuf,
}

#[derive(Args)]
struct FileArgs {
    file: String,
}

#[derive(Args)]
struct EditArgs {
    file: String,

    /// NAME=VALUE to add or change (repeatable)
    #[arg(long = "set")]
    sets: Vec<String>,

    /// Tag to remove (repeatable)
    #[arg(long = "unset")]
    unsets: Vec<String>,

    /// JSON object of NAME: VALUE replacing the whole editable view
    #[arg(long, conflicts_with_all = ["sets", "unsets"])]
    from: Option<PathBuf>,
}

#[derive(Args)]
struct ExportArgs {
    file: String,
    dest: Utf8PathBuf,
}

fn main() -> ExitCode {
    let json = std::env::args().any(|arg| arg == "--json");
    if let Err(report) = run() {
        let meta = report.downcast_ref::<MetaError>();
        match (json, meta) {
            (true, Some(error)) => {
                let _ = JsonOutput::print_failure(error);
            }
            _ => eprintln!("{report:?}"),
        }
        return ExitCode::from(meta.map(map_exit_code).unwrap_or(1));
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &MetaError) -> u8 {
    match error.kind() {
        ErrorKind::Validation | ErrorKind::NotFound => 2,
        ErrorKind::Tool | ErrorKind::Timeout => 3,
        ErrorKind::Io | ErrorKind::Config => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let store = config.store(cli.root)?;
    let app = App::new(store, config.tool());
    match cli.command {
        Commands::Import(args) => {
            let result = app.import(&args.path)?;
            match output_mode {
                OutputMode::Json => JsonOutput::print(&result).into_diagnostic()?,
                OutputMode::Human => println!("imported {} as {}", result.original_name, result.file_id),
            }
        }
        Commands::List => {
            let result = app.list()?;
            match output_mode {
                OutputMode::Json => JsonOutput::print(&result).into_diagnostic()?,
                OutputMode::Human => {
                    println!("{}", result.root);
                    for file in &result.files {
                        println!("  {} ({} bytes)", file.file_id, file.size);
                    }
                }
            }
        }
        Commands::View(args) => {
            let result = app.inspect(&args.file)?;
            match output_mode {
                OutputMode::Json => JsonOutput::print(&result).into_diagnostic()?,
                OutputMode::Human => print_inspect(&result),
            }
        }
        Commands::Gps(args) => {
            let coordinate = app.gps(&args.file)?;
            match (output_mode, coordinate) {
                (OutputMode::Json, coordinate) => JsonOutput::print(&coordinate).into_diagnostic()?,
                (OutputMode::Human, Some(coordinate)) => {
                    println!("{coordinate}");
                    println!("{}", coordinate.map_url());
                }
                (OutputMode::Human, None) => println!("no GPS position"),
            }
        }
        Commands::Edit(args) => {
            let result = match args.from {
                Some(path) => {
                    let submitted = read_submitted(&path)?;
                    app.update(&args.file, &submitted)?
                }
                None => app.edit_fields(&args.file, &args.sets, &args.unsets)?,
            };
            match output_mode {
                OutputMode::Json => JsonOutput::print(&result).into_diagnostic()?,
                OutputMode::Human => print_edit(&result),
            }
        }
        Commands::Strip(args) => {
            let result = app.strip(&args.file)?;
            match output_mode {
                OutputMode::Json => JsonOutput::print(&result).into_diagnostic()?,
                OutputMode::Human => println!("stripped all metadata from {}", args.file),
            }
        }
        Commands::Export(args) => {
            let result = app.export(&args.file, &args.dest)?;
            match output_mode {
                OutputMode::Json => JsonOutput::print(&result).into_diagnostic()?,
                OutputMode::Human => println!("exported {} to {}", result.file_id, result.destination),
            }
        }
        Commands::Tool => run_tool(app.tool(), output_mode)?,
    }
    Ok(())
}

fn run_tool(tool: &SystemExifTool, output_mode: OutputMode) -> miette::Result<()> {
    let info = tool.info();
    match output_mode {
        OutputMode::Json => JsonOutput::print(&info).into_diagnostic()?,
        OutputMode::Human => match (&info.path, &info.exiftool) {
            (Some(path), Some(version)) => println!("exiftool {version} at {path}"),
            (Some(path), None) => println!("exiftool at {path} (version unavailable)"),
            (None, _) => println!("exiftool not found on PATH"),
        },
    }
    Ok(())
}

/// Reads a flat JSON object; anything else is a validation error.
fn read_submitted(path: &Path) -> Result<EditableRecord, MetaError> {
    let content = fs::read_to_string(path)
        .map_err(|err| MetaError::Io(format!("read {}: {err}", path.display())))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .map_err(|err| MetaError::Validation(format!("edit payload is not JSON: {err}")))?;
    let serde_json::Value::Object(map) = value else {
        return Err(MetaError::Validation(
            "edit payload must be a JSON object".to_string(),
        ));
    };
    map.into_iter()
        .map(|(name, value)| match value {
            serde_json::Value::String(text) => Ok((name, text)),
            serde_json::Value::Number(number) => Ok((name, number.to_string())),
            serde_json::Value::Bool(flag) => Ok((name, flag.to_string())),
            serde_json::Value::Null => Ok((name, String::new())),
            _ => Err(MetaError::Validation(format!(
                "value for {name} must be a string"
            ))),
        })
        .collect()
}

fn print_inspect(result: &InspectResult) {
    if let Some(gps) = &result.gps {
        println!(
            "Location: {:.6}, {:.6} ({}{})",
            gps.lat,
            gps.lng,
            gps.latitude_ref.letter(),
            gps.longitude_ref.letter()
        );
        println!("  {}", gps.map_url);
    }
    if result.metadata.is_empty() {
        println!("No metadata found for this file");
        return;
    }
    let width = result.metadata.keys().map(String::len).max().unwrap_or(0);
    for (name, value) in &result.metadata {
        let marker = if result.editable.contains_key(name) { ' ' } else { '*' };
        println!("{marker} {name:<width$}  {value}");
    }
    println!("(* read-only)");
}

fn print_edit(result: &EditResult) {
    let summary = &result.summary;
    if summary.is_empty() {
        println!("no changes; tags rewritten ({} applied)", result.commit.applied);
        return;
    }
    for name in &summary.added {
        println!("+ {name}");
    }
    for name in &summary.changed {
        println!("~ {name}");
    }
    for name in &summary.removed {
        println!("- {name}");
    }
    println!("committed {} tags to {}", result.commit.applied, result.commit.file_id);
}
