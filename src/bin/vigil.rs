//! Vigil CLI - replay attention signals and flag streams through the engine
//!
//! Commands:
//! - frames: Fuse NDJSON raw signal frames into decisions
//! - flags: Replay timestamped flags through risk scoring and alerting
//! - config: Print the default configuration

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use vigil::{
    Alert, AttentionMonitor, Clock, FlagEvent, FlagOutcome, ManualClock, MonitorConfig,
    RawSignalFrame, RiskAssessment, VigilError, PRODUCER_NAME, VIGIL_VERSION,
};

/// Vigil - attention decision engine
#[derive(Parser)]
#[command(name = "vigil")]
#[command(version = VIGIL_VERSION)]
#[command(about = "Replay attention signals through the Vigil decision engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fuse raw signal frames into attention decisions
    Frames {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Monitor configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,
    },

    /// Replay timestamped flags through risk scoring and alerting
    Flags {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Monitor configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Disable alert tones
        #[arg(long)]
        mute: bool,
    },

    /// Print the default monitor configuration
    Config,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one decision per line)
    Ndjson,
    /// JSON array of decisions
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

/// One line of `flags` input
#[derive(Deserialize)]
struct TimedFlag {
    timestamp: DateTime<Utc>,
    #[serde(flatten)]
    flag: FlagEvent,
}

/// One line of `flags` output
#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum ReplayEvent {
    Flag {
        timestamp: DateTime<Utc>,
        #[serde(flatten)]
        outcome: FlagOutcome,
    },
    Dismissed {
        timestamp: DateTime<Utc>,
        alert: Alert,
    },
    Assessment {
        producer: &'static str,
        #[serde(flatten)]
        assessment: RiskAssessment,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

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

fn run(cli: Cli) -> Result<(), VigilCliError> {
    match cli.command {
        Commands::Frames {
            input,
            output,
            config,
            output_format,
        } => cmd_frames(&input, &output, config.as_deref(), output_format),

        Commands::Flags {
            input,
            output,
            config,
            mute,
        } => cmd_flags(&input, &output, config.as_deref(), mute),

        Commands::Config => {
            println!("{}", MonitorConfig::default().to_json()?);
            Ok(())
        }
    }
}

fn cmd_frames(
    input: &Path,
    output: &Path,
    config: Option<&Path>,
    output_format: OutputFormat,
) -> Result<(), VigilCliError> {
    let input_data = read_input(input)?;
    let config = load_config(config)?;
    let mut monitor = AttentionMonitor::with_system_clock(config)?;

    let mut decisions = Vec::new();
    for (line_no, line) in non_empty_lines(&input_data) {
        let frame: RawSignalFrame = serde_json::from_str(line).map_err(|e| {
            VigilCliError::ParseError(format!("line {line_no}: invalid frame: {e}"))
        })?;
        decisions.push(monitor.process_frame(&frame)?);
    }

    if decisions.is_empty() {
        return Err(VigilCliError::NoRecords);
    }

    let output_data = match output_format {
        OutputFormat::Ndjson => to_ndjson(&decisions)?,
        OutputFormat::Json => serde_json::to_string(&decisions)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(&decisions)?,
    };
    write_output(output, &output_data)
}

fn cmd_flags(
    input: &Path,
    output: &Path,
    config: Option<&Path>,
    mute: bool,
) -> Result<(), VigilCliError> {
    let input_data = read_input(input)?;
    let mut config = load_config(config)?;
    if mute {
        config.alerts.audio.enabled = false;
    }

    let mut records = Vec::new();
    for (line_no, line) in non_empty_lines(&input_data) {
        let record: TimedFlag = serde_json::from_str(line).map_err(|e| {
            VigilCliError::ParseError(format!("line {line_no}: invalid flag record: {e}"))
        })?;
        records.push(record);
    }

    let start = records
        .first()
        .map(|r| r.timestamp)
        .ok_or(VigilCliError::NoRecords)?;
    let clock = ManualClock::new(start);
    let mut monitor = AttentionMonitor::new(config, Arc::new(clock.clone()))?;

    let mut events = Vec::new();
    for record in &records {
        // Out-of-order records are replayed at the latest instant seen
        clock.set(record.timestamp.max(clock.now()));
        push_dismissals(&mut events, &mut monitor, &clock);

        let outcome = monitor.report_flag(&record.flag);
        events.push(ReplayEvent::Flag {
            timestamp: clock.now(),
            outcome,
        });
    }

    push_dismissals(&mut events, &mut monitor, &clock);
    events.push(ReplayEvent::Assessment {
        producer: PRODUCER_NAME,
        assessment: monitor.assessment(),
    });
    monitor.dispose();

    write_output(output, &to_ndjson(&events)?)
}

fn push_dismissals(
    events: &mut Vec<ReplayEvent>,
    monitor: &mut AttentionMonitor,
    clock: &ManualClock,
) {
    for alert in monitor.poll() {
        events.push(ReplayEvent::Dismissed {
            timestamp: clock.now(),
            alert,
        });
    }
}

// Helper functions

fn read_input(input: &Path) -> Result<String, VigilCliError> {
    if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            return Err(VigilCliError::InteractiveStdin);
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn load_config(path: Option<&Path>) -> Result<MonitorConfig, VigilCliError> {
    match path {
        Some(path) => Ok(MonitorConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(MonitorConfig::default()),
    }
}

fn non_empty_lines(data: &str) -> impl Iterator<Item = (usize, &str)> {
    data.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
}

fn to_ndjson<T: Serialize>(records: &[T]) -> Result<String, VigilCliError> {
    let mut lines: Vec<String> = Vec::new();
    for record in records {
        lines.push(serde_json::to_string(record)?);
    }
    Ok(lines.join("\n") + "\n")
}

fn write_output(output: &Path, data: &str) -> Result<(), VigilCliError> {
    if output.to_string_lossy() == "-" {
        let mut stdout = io::stdout();
        stdout.write_all(data.as_bytes())?;
        stdout.flush()?;
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

// Error types

#[derive(Debug)]
enum VigilCliError {
    Io(io::Error),
    Engine(VigilError),
    Json(serde_json::Error),
    ParseError(String),
    InteractiveStdin,
    NoRecords,
}

impl From<io::Error> for VigilCliError {
    fn from(e: io::Error) -> Self {
        VigilCliError::Io(e)
    }
}

impl From<VigilError> for VigilCliError {
    fn from(e: VigilError) -> Self {
        VigilCliError::Engine(e)
    }
}

impl From<serde_json::Error> for VigilCliError {
    fn from(e: serde_json::Error) -> Self {
        VigilCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<VigilCliError> for CliError {
    fn from(e: VigilCliError) -> Self {
        match e {
            VigilCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            VigilCliError::Engine(e) => CliError {
                code: "ENGINE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'vigil config' for a valid configuration".to_string()),
            },
            VigilCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            VigilCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Input must be newline-delimited JSON".to_string()),
            },
            VigilCliError::InteractiveStdin => CliError {
                code: "INTERACTIVE_STDIN".to_string(),
                message: "Refusing to read records from an interactive terminal".to_string(),
                hint: Some("Pipe NDJSON into stdin or pass --input <file>".to_string()),
            },
            VigilCliError::NoRecords => CliError {
                code: "NO_RECORDS".to_string(),
                message: "No records found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
        }
    }
}
