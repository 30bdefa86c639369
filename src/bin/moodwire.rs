//! Moodwire CLI - Offline replay harness for the behavioral engine
//!
//! Commands:
//! - replay: Drive the engine with a recorded event stream and print output
//! - validate: Validate a raw event stream against the input schema
//! - doctor: Diagnose engine configuration and environment

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use moodwire::config::EngineConfig;
use moodwire::engine::{Action, Engine};
use moodwire::types::RawEvent;
use moodwire::{EngineError, ENGINE_VERSION, PRODUCER_NAME};

/// Moodwire - Behavioral emotion inference engine
#[derive(Parser)]
#[command(name = "moodwire")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Replay interaction event streams through the emotion engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive the engine with a recorded event stream (NDJSON, one event per line)
    Replay {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Engine configuration JSON file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Print admitted emotion records instead of host actions
        #[arg(long)]
        records: bool,

        /// Tick interval in milliseconds between events
        #[arg(long, default_value = "250")]
        tick_ms: u64,
    },

    /// Validate a raw event stream against the input schema
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose engine configuration and environment
    Doctor {
        /// Check a configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one item per line)
    Ndjson,
    /// JSON array
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("line {0}: {1}")]
    BadEvent(usize, String),

    #[error("{0} invalid events")]
    ValidationFailed(usize),

    #[error("doctor found errors")]
    DoctorFailed,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("moodwire: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Replay {
            input,
            config,
            output_format,
            records,
            tick_ms,
        } => cmd_replay(&input, config.as_deref(), output_format, records, tick_ms),
        Commands::Validate { input, json } => cmd_validate(&input, json),
        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

fn read_input(input: &PathBuf) -> Result<String, CliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn parse_events(data: &str) -> Result<Vec<RawEvent>, CliError> {
    let mut events = Vec::new();
    for (index, line) in data.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let event: RawEvent = serde_json::from_str(trimmed)
            .map_err(|e| CliError::BadEvent(index + 1, e.to_string()))?;
        events.push(event);
    }
    Ok(events)
}

fn cmd_replay(
    input: &PathBuf,
    config: Option<&std::path::Path>,
    output_format: OutputFormat,
    records: bool,
    tick_ms: u64,
) -> Result<(), CliError> {
    let config = match config {
        Some(path) => EngineConfig::from_json(&fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };
    let events = parse_events(&read_input(input)?)?;

    let start_ms = events.first().map(|e| e.t_ms).unwrap_or(0);
    let mut engine = Engine::new(config, start_ms)?;
    let mut actions: Vec<Action> = Vec::new();
    let mut next_tick = start_ms + tick_ms;

    actions.extend(engine.start()?);
    for event in &events {
        // Catch the clock up before delivering the event.
        while next_tick <= event.t_ms {
            actions.extend(engine.tick(next_tick)?);
            next_tick += tick_ms;
        }
        actions.extend(engine.handle_event(event.t_ms, &event.event)?);
    }
    // One trailing tick so due classifications land before teardown.
    let end_ms = events.last().map(|e| e.t_ms).unwrap_or(start_ms) + tick_ms;
    actions.extend(engine.tick(end_ms)?);

    let output = if records {
        let history: Vec<_> = engine.emotion_history().collect();
        format_output(&history, &output_format)?
    } else {
        actions.extend(engine.teardown()?);
        format_output(&actions, &output_format)?
    };
    print!("{output}");
    Ok(())
}

#[derive(Serialize)]
struct ValidationReport {
    total_events: usize,
    valid_events: usize,
    invalid_events: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(Serialize)]
struct ValidationErrorDetail {
    line: usize,
    error: String,
}

fn cmd_validate(input: &PathBuf, json: bool) -> Result<(), CliError> {
    let data = read_input(input)?;
    let mut report = ValidationReport {
        total_events: 0,
        valid_events: 0,
        invalid_events: 0,
        errors: Vec::new(),
    };

    for (index, line) in data.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        report.total_events += 1;
        match serde_json::from_str::<RawEvent>(trimmed) {
            Ok(_) => report.valid_events += 1,
            Err(e) => {
                report.invalid_events += 1;
                report.errors.push(ValidationErrorDetail {
                    line: index + 1,
                    error: e.to_string(),
                });
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total events:   {}", report.total_events);
        println!("Valid events:   {}", report.valid_events);
        println!("Invalid events: {}", report.invalid_events);
        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - line {}: {}", err.line, err.error);
            }
        }
    }

    if report.invalid_events > 0 {
        Err(CliError::ValidationFailed(report.invalid_events))
    } else {
        Ok(())
    }
}

#[derive(Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}

fn cmd_doctor(config: Option<&std::path::Path>, json: bool) -> Result<(), CliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "engine_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Moodwire version {ENGINE_VERSION}"),
    });

    if let Some(config_path) = config {
        if config_path.exists() {
            let check = match fs::read_to_string(config_path)
                .map_err(CliError::from)
                .and_then(|data| EngineConfig::from_json(&data).map_err(CliError::from))
            {
                Ok(_) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Ok,
                    message: "Configuration file valid".to_string(),
                },
                Err(e) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Invalid configuration: {e}"),
                },
            };
            checks.push(check);
        } else {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Configuration file does not exist".to_string(),
            });
        }
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (replay mode ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: ENGINE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Moodwire Doctor Report");
        println!("======================");
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
        Err(CliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn format_output<T: Serialize>(items: &[T], format: &OutputFormat) -> Result<String, CliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for item in items {
                lines.push(serde_json::to_string(item)?);
            }
            if lines.is_empty() {
                Ok(String::new())
            } else {
                Ok(lines.join("\n") + "\n")
            }
        }
        OutputFormat::Json => Ok(serde_json::to_string(items)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(items)?),
    }
}
