//! MediGraph CLI - Command-line interface for the MediGraph engine
//!
//! Commands:
//! - report: Evaluate a panel and print the dashboard report
//! - evaluate: Classify a single category from readings
//! - summary: Produce advisory text for a panel
//! - ranges: Print reference ranges
//! - seed: Print the startup panel as a JSON snapshot
//! - doctor: Diagnose configuration and rule tables

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use medigraph::advisory::AdvisoryScheduler;
use medigraph::logging::init_logger;
use medigraph::report::ReportEncoder;
use medigraph::seed;
use medigraph::thresholds::{self, evaluate_named};
use medigraph::types::{CategoryId, Marker, Readings};
use medigraph::{ComputeError, DashboardConfig, MetricStore, MEDIGRAPH_VERSION, PRODUCER_NAME};

/// MediGraph - Biomarker status and metabolic age engine
#[derive(Parser)]
#[command(name = "medigraph")]
#[command(version = MEDIGRAPH_VERSION)]
#[command(about = "Evaluate biomarker panels and metabolic age", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a panel and print the dashboard report
    Report {
        /// Snapshot file (use - for stdin); defaults to the startup panel
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Chronological age override
        #[arg(long)]
        age: Option<i64>,

        /// Reading edit applied before reporting, e.g. cardio.ldlCholesterol=117
        #[arg(long = "set", value_name = "CATEGORY.MARKER=VALUE")]
        edits: Vec<String>,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format (defaults to pretty JSON on a terminal)
        #[arg(long)]
        output_format: Option<OutputFormat>,
    },

    /// Classify a single category from readings
    Evaluate {
        /// Category id (cardio, inflammation, energy, muscle, renal)
        #[arg(short, long)]
        category: String,

        /// Reading, e.g. glucose=98
        #[arg(short, long = "reading", value_name = "MARKER=VALUE")]
        readings: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Produce advisory text for a panel
    Summary {
        /// Snapshot file (use - for stdin); defaults to the startup panel
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Focus on one category instead of the overall view
        #[arg(short, long)]
        category: Option<String>,

        /// Chronological age override
        #[arg(long)]
        age: Option<i64>,
    },

    /// Print reference ranges
    Ranges {
        /// Limit to one category
        #[arg(short, long)]
        category: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the startup panel as a JSON snapshot
    Seed,

    /// Diagnose configuration and rule tables
    Doctor {
        /// Snapshot file to check
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), MediGraphCliError> {
    let config = match &cli.config {
        Some(path) => DashboardConfig::from_file(path)?,
        None => DashboardConfig::default(),
    };
    init_logger(&config.logging, cli.verbose);
    tracing::debug!(?config, "configuration loaded");

    match cli.command {
        Commands::Report {
            input,
            age,
            edits,
            output,
            output_format,
        } => cmd_report(&config, input.as_deref(), age, &edits, &output, output_format),

        Commands::Evaluate {
            category,
            readings,
            json,
        } => cmd_evaluate(&category, &readings, json),

        Commands::Summary {
            input,
            category,
            age,
        } => cmd_summary(&config, input.as_deref(), category.as_deref(), age),

        Commands::Ranges { category, json } => cmd_ranges(category.as_deref(), json),

        Commands::Seed => {
            println!("{}", MetricStore::seeded().to_json()?);
            Ok(())
        }

        Commands::Doctor { input, json } => {
            cmd_doctor(cli.config.as_deref(), input.as_deref(), json)
        }
    }
}

fn cmd_report(
    config: &DashboardConfig,
    input: Option<&Path>,
    age: Option<i64>,
    edits: &[String],
    output: &Path,
    output_format: Option<OutputFormat>,
) -> Result<(), MediGraphCliError> {
    let mut store = load_store(config, input, age)?;

    for edit in edits {
        let (id, marker, raw) = parse_edit(edit)?;
        let status = store.set_reading_input(id, marker, &raw)?;
        tracing::info!(category = %id, marker = %marker, status = %status, "applied edit");
    }

    let report = ReportEncoder::new().encode(&store);
    let pretty = match output_format {
        Some(OutputFormat::JsonPretty) => true,
        Some(OutputFormat::Json) => false,
        None => atty::is(atty::Stream::Stdout),
    };
    let output_data = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };

    if output.to_string_lossy() == "-" {
        println!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
        tracing::info!(path = %output.display(), "report written");
    }

    Ok(())
}

fn cmd_evaluate(category: &str, readings: &[String], json: bool) -> Result<(), MediGraphCliError> {
    let readings = readings
        .iter()
        .map(|r| parse_reading(r))
        .collect::<Result<Readings, _>>()?;

    let status = evaluate_named(category, &readings);
    let violations = CategoryId::parse(category)
        .map(|id| thresholds::violations(id, &readings))
        .unwrap_or_default();

    if json {
        let value = serde_json::json!({
            "category": category,
            "status": status,
            "violations": violations,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{}: {}", category, status.label());
        for v in &violations {
            let source = if v.fallback { " (absent)" } else { "" };
            println!(
                "  - {} = {}{} (ref {})",
                v.marker.label(),
                v.value,
                source,
                v.limit
            );
        }
    }

    Ok(())
}

fn cmd_summary(
    config: &DashboardConfig,
    input: Option<&Path>,
    category: Option<&str>,
    age: Option<i64>,
) -> Result<(), MediGraphCliError> {
    let store = load_store(config, input, age)?;
    let active = category.map(str::parse::<CategoryId>).transpose()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    let text = runtime.block_on(async {
        let mut scheduler = AdvisoryScheduler::with_debounce(
            config.advisory.local_advisor(),
            config.advisory.debounce(),
        );
        scheduler.schedule(&store, active);
        scheduler.flush().await;
        scheduler.current().text
    });

    println!("{}", text);
    Ok(())
}

fn cmd_ranges(category: Option<&str>, json: bool) -> Result<(), MediGraphCliError> {
    let categories: Vec<CategoryId> = match category {
        Some(id) => vec![id.parse::<CategoryId>()?],
        None => CategoryId::ALL.to_vec(),
    };

    let rows: Vec<RangeRow> = categories
        .iter()
        .flat_map(|id| id.markers())
        .map(|marker| RangeRow {
            category: marker.category(),
            marker,
            label: marker.label(),
            unit: marker.unit(),
            reference: thresholds::reference_range(marker).map(|l| l.to_string()),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        let mut current: Option<CategoryId> = None;
        for row in &rows {
            if current != Some(row.category) {
                println!("{}", row.category.title());
                current = Some(row.category);
            }
            let unit = if row.unit.is_empty() {
                String::new()
            } else {
                format!(" ({})", row.unit)
            };
            println!(
                "  {:<24} {}",
                format!("{}{}", row.label, unit),
                row.reference.as_deref().unwrap_or("-")
            );
        }
    }

    Ok(())
}

fn cmd_doctor(
    config_path: Option<&Path>,
    input: Option<&Path>,
    json: bool,
) -> Result<(), MediGraphCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "medigraph_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("MediGraph version {}", MEDIGRAPH_VERSION),
    });

    // Seed panel against its published interpretation
    let mismatches = seed::verify();
    if mismatches.is_empty() {
        checks.push(DoctorCheck {
            name: "seed_consistency".to_string(),
            status: CheckStatus::Ok,
            message: "Seed statuses match the threshold rules".to_string(),
        });
    } else {
        for (id, expected, actual) in mismatches {
            checks.push(DoctorCheck {
                name: "seed_consistency".to_string(),
                status: CheckStatus::Error,
                message: format!("{id}: expected {expected}, rules give {actual}"),
            });
        }
    }

    if let Some(path) = config_path {
        checks.push(match DashboardConfig::from_file(path) {
            Ok(_) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: format!("Configuration {} is valid", path.display()),
            },
            Err(e) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            },
        });
    }

    if let Some(path) = input {
        let check = match fs::read_to_string(path) {
            Ok(content) => match MetricStore::from_json(&content) {
                Ok(store) => {
                    let missing: Vec<&str> = CategoryId::ALL
                        .iter()
                        .filter(|id| store.category(**id).is_none())
                        .map(|id| id.as_str())
                        .collect();
                    if missing.is_empty() {
                        DoctorCheck {
                            name: "snapshot".to_string(),
                            status: CheckStatus::Ok,
                            message: format!(
                                "Snapshot valid, metabolic age {}",
                                store.metabolic_age()
                            ),
                        }
                    } else {
                        DoctorCheck {
                            name: "snapshot".to_string(),
                            status: CheckStatus::Warning,
                            message: format!("Snapshot lacks categories: {}", missing.join(", ")),
                        }
                    }
                }
                Err(e) => DoctorCheck {
                    name: "snapshot".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Invalid snapshot: {}", e),
                },
            },
            Err(e) => DoctorCheck {
                name: "snapshot".to_string(),
                status: CheckStatus::Error,
                message: format!("Cannot read snapshot: {}", e),
            },
        };
        checks.push(check);
    }

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: MEDIGRAPH_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("MediGraph Doctor Report");
        println!("=======================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(MediGraphCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn load_store(
    config: &DashboardConfig,
    input: Option<&Path>,
    age: Option<i64>,
) -> Result<MetricStore, MediGraphCliError> {
    let mut store = match input {
        Some(path) => {
            let data = if path.to_string_lossy() == "-" {
                let mut buffer = String::new();
                io::stdin().read_to_string(&mut buffer)?;
                buffer
            } else {
                fs::read_to_string(path)?
            };
            MetricStore::from_json(&data)?
        }
        None => {
            let mut store = MetricStore::seeded();
            store.set_age(config.profile.age as i64);
            store
        }
    };

    if let Some(age) = age {
        store.set_age(age);
    }
    Ok(store)
}

/// Parse `category.marker=value`
fn parse_edit(edit: &str) -> Result<(CategoryId, Marker, String), MediGraphCliError> {
    let (target, raw) = edit.split_once('=').ok_or_else(|| {
        MediGraphCliError::BadArgument(format!("expected CATEGORY.MARKER=VALUE, got '{edit}'"))
    })?;
    let (id, marker) = target.split_once('.').ok_or_else(|| {
        MediGraphCliError::BadArgument(format!("expected CATEGORY.MARKER, got '{target}'"))
    })?;
    Ok((id.parse()?, marker.parse()?, raw.to_string()))
}

/// Parse `marker=value`
fn parse_reading(reading: &str) -> Result<(Marker, f64), MediGraphCliError> {
    let (marker, raw) = reading.split_once('=').ok_or_else(|| {
        MediGraphCliError::BadArgument(format!("expected MARKER=VALUE, got '{reading}'"))
    })?;
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| MediGraphCliError::BadArgument(format!("'{raw}' is not a number")))?;
    Ok((marker.parse()?, value))
}

// Error handling

#[derive(Debug)]
enum MediGraphCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    BadArgument(String),
    DoctorFailed,
}

impl From<io::Error> for MediGraphCliError {
    fn from(e: io::Error) -> Self {
        MediGraphCliError::Io(e)
    }
}

impl From<ComputeError> for MediGraphCliError {
    fn from(e: ComputeError) -> Self {
        MediGraphCliError::Compute(e)
    }
}

impl From<serde_json::Error> for MediGraphCliError {
    fn from(e: serde_json::Error) -> Self {
        MediGraphCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<MediGraphCliError> for CliError {
    fn from(e: MediGraphCliError) -> Self {
        match e {
            MediGraphCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            MediGraphCliError::Compute(e) => {
                let hint = match &e {
                    ComputeError::UnknownCategory(_) | ComputeError::CategoryNotFound(_) => {
                        "Valid categories: cardio, inflammation, energy, muscle, renal"
                    }
                    ComputeError::UnknownMarker(_) | ComputeError::MarkerMismatch { .. } => {
                        "Run 'medigraph ranges' to list readings per category"
                    }
                    ComputeError::ConfigError(_) => "Check the configuration file",
                    _ => "Check that input is a valid snapshot (see 'medigraph seed')",
                };
                CliError {
                    code: "COMPUTE_ERROR".to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            MediGraphCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            MediGraphCliError::BadArgument(msg) => CliError {
                code: "BAD_ARGUMENT".to_string(),
                message: msg,
                hint: None,
            },
            MediGraphCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct RangeRow {
    category: CategoryId,
    marker: Marker,
    label: &'static str,
    unit: &'static str,
    reference: Option<String>,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
