//! VNC Flux CLI - Command-line interface for VNC Flux
//!
//! Commands:
//! - table: Build the flat activity table from an activity bundle
//! - counts: Count subjects per behavior transition
//! - recode: Recode a spreadsheet and emit per-subject transitions
//! - validate: Check label coverage and activity integrity
//! - behavior-stats: Reshape fit results into per-transition statistics
//! - codes: Print the behavior code table

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{warn, Level};

use vnc_flux::codes::BehaviorCode;
use vnc_flux::encoder::decode_rows;
use vnc_flux::error::{ErrorKind, ProcessingError};
use vnc_flux::pipeline::{ProcessorConfig, VncProcessor};
use vnc_flux::stats::PValueKind;
use vnc_flux::types::SubjectAnnotation;
use vnc_flux::{FLUX_VERSION, PRODUCER_NAME};

/// VNC Flux - Behavior-transition recoding and activity tables for VNC imaging data
#[derive(Parser)]
#[command(name = "vnc-flux")]
#[command(version = FLUX_VERSION)]
#[command(about = "Recode behavior annotations and build activity tables", long_about = None)]
struct Cli {
    /// Processor configuration file (JSON); flags override its fields
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug events to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the flat activity table from an activity bundle
    Table {
        /// Activity bundle (JSON, use - for stdin)
        #[arg(short, long)]
        bundle: PathBuf,

        /// Annotation spreadsheet (JSON); selects the specimen-id path
        #[arg(short, long)]
        transitions: Option<PathBuf>,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Relabel transitions slower than this many seconds as quiet
        #[arg(long)]
        cutoff: Option<f64>,
    },

    /// Count subjects per behavior transition
    Counts {
        /// Activity table (document, JSON array or NDJSON; use - for stdin)
        #[arg(short, long, conflicts_with = "transitions", required_unless_present = "transitions")]
        input: Option<PathBuf>,

        /// Count straight from an annotation spreadsheet instead of a table
        #[arg(short, long)]
        transitions: Option<PathBuf>,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Matrix axes in order, e.g. F,B,Q,T (default: every observed behavior)
        #[arg(long, value_delimiter = ',')]
        behaviors: Option<Vec<BehaviorCode>>,

        /// Relabel transitions slower than this many seconds as quiet
        #[arg(long)]
        cutoff: Option<f64>,
    },

    /// Recode a spreadsheet and emit per-subject transitions
    Recode {
        /// Annotation spreadsheet (JSON, use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Relabel transitions slower than this many seconds as quiet
        #[arg(long)]
        cutoff: Option<f64>,

        /// Sheet to read when the input is a workbook
        #[arg(long)]
        sheet: Option<String>,
    },

    /// Check label coverage and activity integrity
    Validate {
        /// Annotation spreadsheet (JSON)
        #[arg(short, long, required_unless_present = "bundle")]
        transitions: Option<PathBuf>,

        /// Activity bundle (JSON)
        #[arg(short, long)]
        bundle: Option<PathBuf>,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Reshape fit results into per-transition statistics
    BehaviorStats {
        /// Fit results with `beh_trans` and `full_stats` (JSON, use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Which p-value to report
        #[arg(long)]
        p_value: Option<PValueArg>,
    },

    /// Print the behavior code table
    Codes {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// Single JSON document
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum PValueArg {
    /// Transition mean differs from the mean of the others
    EqMean,
    /// Coefficient differs from zero
    NonZero,
    /// Coefficient is not the maximum
    NonMax,
}

impl From<PValueArg> for PValueKind {
    fn from(arg: PValueArg) -> Self {
        match arg {
            PValueArg::EqMean => PValueKind::EqMean,
            PValueArg::NonZero => PValueKind::NonZero,
            PValueArg::NonMax => PValueKind::NonMax,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string()));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let level = if verbose {
        Level::DEBUG
    } else if quiet {
        Level::WARN
    } else {
        Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), VncCliError> {
    let config = match &cli.config {
        Some(path) => ProcessorConfig::from_json(&fs::read_to_string(path)?)?,
        None => ProcessorConfig::default(),
    };

    match cli.command {
        Commands::Table {
            bundle,
            transitions,
            output,
            output_format,
            cutoff,
        } => {
            let config = ProcessorConfig {
                cutoff_time: cutoff.or(config.cutoff_time),
                ..config
            };
            cmd_table(config, &bundle, transitions.as_deref(), &output, output_format)
        }

        Commands::Counts {
            input,
            transitions,
            output,
            behaviors,
            cutoff,
        } => {
            let config = ProcessorConfig {
                cutoff_time: cutoff.or(config.cutoff_time),
                behaviors: behaviors.or(config.behaviors),
                ..config
            };
            cmd_counts(config, input.as_deref(), transitions.as_deref(), &output)
        }

        Commands::Recode {
            input,
            output,
            output_format,
            cutoff,
            sheet,
        } => {
            let config = ProcessorConfig {
                cutoff_time: cutoff.or(config.cutoff_time),
                sheet_name: sheet.unwrap_or(config.sheet_name),
                ..config
            };
            cmd_recode(config, &input, &output, output_format)
        }

        Commands::Validate {
            transitions,
            bundle,
            json,
        } => cmd_validate(config, transitions.as_deref(), bundle.as_deref(), json),

        Commands::BehaviorStats {
            input,
            output,
            p_value,
        } => {
            let config = ProcessorConfig {
                p_value: p_value.map(PValueKind::from).unwrap_or(config.p_value),
                ..config
            };
            cmd_behavior_stats(config, &input, &output)
        }

        Commands::Codes { json } => cmd_codes(json),
    }
}

fn cmd_table(
    config: ProcessorConfig,
    bundle: &Path,
    transitions: Option<&Path>,
    output: &Path,
    output_format: OutputFormat,
) -> Result<(), VncCliError> {
    let processor = VncProcessor::with_config(config);
    let bundle_json = read_input(bundle)?;

    let table = match transitions {
        Some(path) => processor.table_from_specimen_ids(&bundle_json, &read_input(path)?)?,
        None => processor.table_from_annotated(&bundle_json)?,
    };

    if table.is_empty() {
        warn!("Activity table has no rows");
    }

    let document = processor.encode_table(&table);
    let output_data = format_output(&document, &document.rows, &output_format)?;
    write_output(output, &output_data)
}

fn cmd_counts(
    config: ProcessorConfig,
    input: Option<&Path>,
    transitions: Option<&Path>,
    output: &Path,
) -> Result<(), VncCliError> {
    let processor = VncProcessor::with_config(config);

    let matrix = match (input, transitions) {
        (_, Some(path)) => processor.count_subjects_in_spreadsheet(&read_input(path)?)?,
        (Some(path), None) => {
            let rows = decode_rows(&read_input(path)?)?;
            if rows.is_empty() {
                return Err(VncCliError::NoRows);
            }
            processor.count_subjects(&rows)
        }
        (None, None) => return Err(VncCliError::NoInput),
    };

    let document = processor.encode_counts(&matrix);
    write_output(output, &serde_json::to_string_pretty(&document)?)
}

fn cmd_recode(
    config: ProcessorConfig,
    input: &Path,
    output: &Path,
    output_format: OutputFormat,
) -> Result<(), VncCliError> {
    let processor = VncProcessor::with_config(config);
    let transitions = processor.extract(&read_input(input)?)?;

    if transitions.is_empty() {
        return Err(VncCliError::NoRows);
    }

    let subjects: Vec<SubjectAnnotation> = transitions.into_annotations();
    let output_data = format_output(&subjects, &subjects, &output_format)?;
    write_output(output, &output_data)
}

fn cmd_validate(
    config: ProcessorConfig,
    transitions: Option<&Path>,
    bundle: Option<&Path>,
    json: bool,
) -> Result<(), VncCliError> {
    let processor = VncProcessor::with_config(config);
    let spreadsheet_json = transitions.map(read_input).transpose()?;
    let mut checks: Vec<ValidationCheck> = Vec::new();

    if let Some(spreadsheet_json) = &spreadsheet_json {
        checks.push(match processor.extract(spreadsheet_json) {
            Ok(extracted) => ValidationCheck::passed(
                "labels",
                format!(
                    "All labels recognized ({} subjects, {} events)",
                    extracted.len(),
                    extracted.iter().map(|s| s.transitions.len()).sum::<usize>()
                ),
            ),
            Err(e) => ValidationCheck::failed("labels", &e),
        });
    }

    if let Some(bundle) = bundle {
        let bundle_json = read_input(bundle)?;
        checks.push(
            match processor.validate_bundle(&bundle_json, spreadsheet_json.as_deref()) {
                Ok(events) => ValidationCheck::passed(
                    "activity",
                    format!(
                        "Activity consistent ({} subjects, {} events)",
                        events.len(),
                        events.iter().sum::<usize>()
                    ),
                ),
                Err(e) => ValidationCheck::failed("activity", &e),
            },
        );
    }

    let failed = checks.iter().filter(|c| !c.passed).count();
    let report = ValidationReport {
        producer: PRODUCER_NAME.to_string(),
        version: FLUX_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        for check in &report.checks {
            let status_icon = if check.passed { "[OK]" } else { "[ERR]" };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    if failed > 0 {
        Err(VncCliError::ValidationFailed(failed))
    } else {
        Ok(())
    }
}

fn cmd_behavior_stats(config: ProcessorConfig, input: &Path, output: &Path) -> Result<(), VncCliError> {
    let processor = VncProcessor::with_config(config);
    let stats = processor.behavior_stats(&read_input(input)?)?;
    write_output(output, &serde_json::to_string_pretty(&stats)?)
}

fn cmd_codes(json: bool) -> Result<(), VncCliError> {
    let entries: Vec<CodeEntry> = BehaviorCode::ALL
        .iter()
        .map(|code| CodeEntry {
            code: *code,
            name: code.name(),
            synonyms: code.synonyms(),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        println!("Behavior Codes");
        println!("==============");
        for entry in &entries {
            let synonyms: Vec<String> = entry.synonyms.iter().map(|s| format!("{:?}", s)).collect();
            println!("  {}  {:<10} {}", entry.code, entry.name, synonyms.join(", "));
        }
    }

    Ok(())
}

// Helper functions

fn read_input(path: &Path) -> Result<String, VncCliError> {
    if path.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            warn!("Reading from stdin, which is an interactive terminal");
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn write_output(output: &Path, data: &str) -> Result<(), VncCliError> {
    if output.to_string_lossy() == "-" {
        print!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

/// NDJSON writes one line per record; the JSON formats write the whole document.
fn format_output<D: Serialize, R: Serialize>(
    document: &D,
    records: &[R],
    format: &OutputFormat,
) -> Result<String, VncCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for record in records {
                lines.push(serde_json::to_string(record)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(document)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(document)?),
    }
}

// Error types

#[derive(Debug)]
enum VncCliError {
    Io(io::Error),
    Processing(ProcessingError),
    Json(serde_json::Error),
    NoInput,
    NoRows,
    ValidationFailed(usize),
}

impl From<io::Error> for VncCliError {
    fn from(e: io::Error) -> Self {
        VncCliError::Io(e)
    }
}

impl From<ProcessingError> for VncCliError {
    fn from(e: ProcessingError) -> Self {
        VncCliError::Processing(e)
    }
}

impl From<serde_json::Error> for VncCliError {
    fn from(e: serde_json::Error) -> Self {
        VncCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<VncCliError> for CliError {
    fn from(e: VncCliError) -> Self {
        match e {
            VncCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            VncCliError::Processing(e) => {
                let (code, hint) = match e.kind() {
                    ErrorKind::ShapeMismatch => ("SHAPE_MISMATCH", "Check that the bundle and annotations cover the same subjects and events"),
                    ErrorKind::OrderMismatch => ("ORDER_MISMATCH", "Re-export the bundle with neurons in the same order for every phase"),
                    ErrorKind::NonFiniteValue => ("NON_FINITE_VALUE", "Remove or impute NaN activity values upstream"),
                    ErrorKind::LabelCoverage => ("LABEL_COVERAGE", "Run 'vnc-flux codes' to list accepted behavior labels"),
                    ErrorKind::Input => ("INPUT_ERROR", "Check input format and configured variable or column names"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            VncCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            VncCliError::NoInput => CliError {
                code: "NO_INPUT".to_string(),
                message: "No input given".to_string(),
                hint: Some("Pass --input or --transitions".to_string()),
            },
            VncCliError::NoRows => CliError {
                code: "NO_ROWS".to_string(),
                message: "No rows found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            VncCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} check(s) failed", count),
                hint: Some("Fix the reported problems and retry".to_string()),
            },
        }
    }
}

// Report types

#[derive(Serialize)]
struct ValidationReport {
    producer: String,
    version: String,
    checks: Vec<ValidationCheck>,
}

#[derive(Serialize)]
struct ValidationCheck {
    name: String,
    passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<ErrorKind>,
    message: String,
}

impl ValidationCheck {
    fn passed(name: &str, message: String) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            kind: None,
            message,
        }
    }

    fn failed(name: &str, error: &ProcessingError) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            kind: Some(error.kind()),
            message: error.to_string(),
        }
    }
}

#[derive(Serialize)]
struct CodeEntry {
    code: BehaviorCode,
    name: &'static str,
    synonyms: &'static [&'static str],
}
