//! Command-line entry point for the import pipeline.
//!
//! # Responsibility
//! - Read one JSON batch, run the import, print the summary as JSON.
//! - Map the outcome onto stable exit codes for scripting.
//!
//! # Exit codes
//! - `0`: imported with no errors, or committed under `--allow-fatal`.
//! - `1`: imported, but the summary holds errors or commit was blocked.
//! - `2`: usage, input or logging setup failure.

use clap::{Parser, Subcommand, ValueEnum};
use lineage_core::{
    core_version, default_log_level, init_logging, CommitPolicy, FamilyGraph, ImportBatch,
    ImportContext, ImportOptions, ImportService, ImportServiceError, InMemoryGraphSink,
    LogSettings, Person, PersonRelation, SourceFormat,
};
use log::warn;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const EXIT_SUCCESS: u8 = 0;
const EXIT_WITH_ERRORS: u8 = 1;
const EXIT_USAGE: u8 = 2;

#[derive(Parser)]
#[command(name = "lineage")]
#[command(about = "Validate and normalize family tree imports")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import a JSON batch and print its summary
    #[command(after_help = "\
Input is either a bare array of member records or an object with
`members`, `stories`, `locations`, `media` and `artifacts` arrays.

Examples:
  lineage import family.json
  lineage import sheet-export.json --format xlsx --graph-out graph.json")]
    Import {
        /// Batch file (JSON)
        file: PathBuf,

        /// Format the records were exported from
        #[arg(long, short = 'f', value_enum)]
        format: Option<FormatArg>,

        /// Import options as JSON, e.g. '{"reportUnmappedFields":false}'
        #[arg(long, value_name = "JSON")]
        config: Option<String>,

        /// Commit even when the summary holds fatal errors
        #[arg(long)]
        allow_fatal: bool,

        /// Write the committed graph to this file
        #[arg(long, short = 'o', value_name = "FILE")]
        graph_out: Option<PathBuf>,

        /// Log level (trace|debug|info|warn|error)
        #[arg(long)]
        log_level: Option<String>,

        /// Absolute directory for log files
        #[arg(long, value_name = "DIR")]
        log_dir: Option<PathBuf>,
    },

    /// Print the core library version
    Version,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Json,
    Csv,
    Xlsx,
}

impl From<FormatArg> for SourceFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Json => SourceFormat::Json,
            FormatArg::Csv => SourceFormat::Csv,
            FormatArg::Xlsx => SourceFormat::Xlsx,
        }
    }
}

/// Person plus its resolved relations, as written by `--graph-out`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphMember<'a> {
    #[serde(flatten)]
    person: &'a Person,
    relations: Vec<PersonRelation>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Command::Version => {
            println!("lineage_core {}", core_version());
            ExitCode::from(EXIT_SUCCESS)
        }
        Command::Import {
            file,
            format,
            config,
            allow_fatal,
            graph_out,
            log_level,
            log_dir,
        } => {
            let request = ImportRequest {
                file,
                format: format.map(SourceFormat::from),
                config,
                allow_fatal,
                graph_out,
            };
            if let Err(message) = setup_logging(log_level, log_dir) {
                eprintln!("error: {message}");
                return ExitCode::from(EXIT_USAGE);
            }
            match run_import(&request) {
                Ok(code) => ExitCode::from(code),
                Err(message) => {
                    eprintln!("error: {message}");
                    ExitCode::from(EXIT_USAGE)
                }
            }
        }
    }
}

struct ImportRequest {
    file: PathBuf,
    format: Option<SourceFormat>,
    config: Option<String>,
    allow_fatal: bool,
    graph_out: Option<PathBuf>,
}

fn setup_logging(level: Option<String>, dir: Option<PathBuf>) -> Result<(), String> {
    let dir = match dir {
        Some(dir) => dir,
        None => std::env::temp_dir().join("lineage").join("logs"),
    };
    let mut settings = LogSettings::new(
        level.unwrap_or_else(|| default_log_level().to_string()),
        dir,
    );
    settings.echo_warnings = true;
    init_logging(&settings).map_err(|err| err.to_string())
}

fn build_options(request: &ImportRequest) -> Result<ImportOptions, String> {
    let mut options = match &request.config {
        Some(raw) => serde_json::from_str::<ImportOptions>(raw)
            .map_err(|err| format!("invalid --config: {err}"))?,
        None => ImportOptions::default(),
    };
    if let Some(format) = request.format {
        options.format = format;
    }
    if request.allow_fatal {
        options.commit_policy = CommitPolicy::AllowFatal;
    }
    Ok(options)
}

fn read_batch(path: &Path) -> Result<ImportBatch, String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|err| format!("cannot read {}: {err}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|err| format!("{} is not valid JSON: {err}", path.display()))?;
    ImportBatch::from_value(value)
        .map_err(|err| format!("{} is not an import batch: {err}", path.display()))
}

/// Runs one import and returns the exit code.
fn run_import(request: &ImportRequest) -> Result<u8, String> {
    let options = build_options(request)?;
    let batch = read_batch(&request.file)?;
    let ctx = ImportContext::new(options);

    let mut service = ImportService::new(InMemoryGraphSink::new());
    let outcome = service.import(&batch, &ctx).map_err(|err| err.to_string())?;
    let has_errors = outcome.summary().error_count() > 0;

    let code = match service.commit(outcome.clone(), ctx.options.commit_policy) {
        Ok(_) => {
            if let (Some(path), Some(committed)) = (&request.graph_out, service.sink().last()) {
                write_graph(path, &committed.graph)?;
            }
            if has_errors && ctx.options.commit_policy != CommitPolicy::AllowFatal {
                EXIT_WITH_ERRORS
            } else {
                EXIT_SUCCESS
            }
        }
        Err(ImportServiceError::CommitBlocked { fatal_errors }) => {
            warn!(
                "event=cli_import module=cli status=blocked fatal_errors={}",
                fatal_errors
            );
            EXIT_WITH_ERRORS
        }
        Err(err) => return Err(err.to_string()),
    };

    let rendered = serde_json::to_string_pretty(outcome.summary())
        .map_err(|err| format!("cannot render summary: {err}"))?;
    println!("{rendered}");
    Ok(code)
}

fn graph_members(graph: &FamilyGraph) -> Vec<GraphMember<'_>> {
    graph
        .persons()
        .iter()
        .map(|person| GraphMember {
            person,
            relations: graph.relations_of(&person.id),
        })
        .collect()
}

fn write_graph(path: &Path, graph: &FamilyGraph) -> Result<(), String> {
    let rendered = serde_json::to_string_pretty(&graph_members(graph))
        .map_err(|err| format!("cannot render graph: {err}"))?;
    std::fs::write(path, rendered).map_err(|err| format!("cannot write {}: {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::{
        build_options, read_batch, run_import, ImportRequest, EXIT_SUCCESS, EXIT_WITH_ERRORS,
    };
    use lineage_core::{CommitPolicy, SourceFormat};
    use std::path::PathBuf;

    fn request(file: PathBuf) -> ImportRequest {
        ImportRequest {
            file,
            format: None,
            config: None,
            allow_fatal: false,
            graph_out: None,
        }
    }

    #[test]
    fn flags_override_config_json() {
        let mut req = request(PathBuf::from("unused.json"));
        req.config = Some(r#"{"format":"csv","reportUnmappedFields":false}"#.to_string());
        req.format = Some(SourceFormat::Xlsx);
        req.allow_fatal = true;

        let options = build_options(&req).unwrap();
        assert_eq!(options.format, SourceFormat::Xlsx);
        assert!(!options.report_unmapped_fields);
        assert_eq!(options.commit_policy, CommitPolicy::AllowFatal);
    }

    #[test]
    fn bare_array_and_collection_object_are_both_batches() {
        let dir = tempfile::tempdir().unwrap();
        let array = dir.path().join("array.json");
        std::fs::write(&array, r#"[{"id":"1"},{"id":"2"}]"#).unwrap();
        let object = dir.path().join("object.json");
        std::fs::write(&object, r#"{"members":[{"id":"1"}],"stories":[{"id":"s1"}]}"#).unwrap();

        assert_eq!(read_batch(&array).unwrap().members.len(), 2);
        let batch = read_batch(&object).unwrap();
        assert_eq!(batch.members.len(), 1);
        assert_eq!(batch.stories.len(), 1);
    }

    #[test]
    fn object_without_known_collections_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let single = dir.path().join("single.json");
        std::fs::write(&single, r#"{"id":"1","firstName":"Ada"}"#).unwrap();
        let misnamed = dir.path().join("misnamed.json");
        std::fs::write(&misnamed, r#"{"people":[{"id":"1"}]}"#).unwrap();

        let err = read_batch(&single).unwrap_err();
        assert!(err.contains("is not an import batch"), "{err}");
        assert!(read_batch(&misnamed).unwrap_err().contains("people"));
        assert!(run_import(&request(misnamed)).is_err());
    }

    #[test]
    fn clean_import_writes_graph_and_exits_zero() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("family.json");
        std::fs::write(
            &input,
            r#"[{"id":"1","relations":[{"type":"child","personId":"2"}]},{"id":"2"}]"#,
        )
        .unwrap();
        let graph_out = dir.path().join("graph.json");
        let mut req = request(input);
        req.graph_out = Some(graph_out.clone());

        assert_eq!(run_import(&req).unwrap(), EXIT_SUCCESS);
        let graph: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(graph_out).unwrap()).unwrap();
        assert_eq!(graph.as_array().unwrap().len(), 2);
        assert_eq!(graph[1]["relations"][0]["type"], "parent");
    }

    #[test]
    fn dangling_reference_blocks_commit() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("family.json");
        std::fs::write(
            &input,
            r#"[{"id":"1","relations":[{"type":"child","personId":"99"}]}]"#,
        )
        .unwrap();
        let graph_out = dir.path().join("graph.json");
        let mut req = request(input);
        req.graph_out = Some(graph_out.clone());

        assert_eq!(run_import(&req).unwrap(), EXIT_WITH_ERRORS);
        assert!(!graph_out.exists());
    }

    #[test]
    fn unreadable_file_is_reported() {
        let err = run_import(&request(PathBuf::from("/nonexistent/lineage.json"))).unwrap_err();
        assert!(err.contains("cannot read"));
    }
}
