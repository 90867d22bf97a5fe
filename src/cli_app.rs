//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use rampcheck::core::config::Config;
use rampcheck::core::duration::format_duration;
use rampcheck::core::errors::RampError;
use rampcheck::iteration::http::ReqwestClient;
use rampcheck::iteration::recorder::MemoryRecorder;
use rampcheck::iteration::{IterationResult, SimulatedIteration};
use rampcheck::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity};
use rampcheck::report::artifact::{read_snapshot_file, render_artifact, write_artifact};
use rampcheck::report::render::{RenderOptions, render_text};
use rampcheck::report::thresholds::{ThresholdOutcome, all_passed, evaluate_thresholds};
use rampcheck::workload::spec::WorkloadSpec;
use rampcheck::workload::threshold::ERRORS;

/// Ramp-up load profile and end-of-run summary for a CPU stress endpoint.
#[derive(Debug, Parser)]
#[command(
    name = "rampcheck",
    author,
    version,
    about = "Staged load profile and summary report for a stress endpoint",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Increase verbosity.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Quiet mode (errors only).
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Show the workload: stages, thresholds, target. `--json` prints engine options.
    Plan,
    /// Send a few sequential iterations at the target and report the check results.
    Probe(ProbeArgs),
    /// Render the summary for a finished run and enforce thresholds.
    Report(ReportArgs),
    /// View and validate configuration.
    Config(ConfigArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args)]
struct ProbeArgs {
    /// Number of iterations to run.
    #[arg(long, short = 'n', default_value_t = 1, value_name = "N")]
    iterations: u32,
    /// Skip the pause between iterations.
    #[arg(long)]
    no_delay: bool,
}

#[derive(Debug, Clone, Args)]
struct ReportArgs {
    /// Engine end-of-test summary JSON (or a previous rampcheck artifact).
    #[arg(value_name = "SUMMARY")]
    summary: PathBuf,
    /// Where to write the JSON artifact (overrides `report.artifact_path`).
    #[arg(long, value_name = "PATH", conflicts_with = "no_artifact")]
    artifact: Option<PathBuf>,
    /// Do not write the JSON artifact.
    #[arg(long)]
    no_artifact: bool,
    /// Line prefix for the text report (overrides `report.indent`).
    #[arg(long, value_name = "TEXT", allow_hyphen_values = true)]
    indent: Option<String>,
}

#[derive(Debug, Clone, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Print resolved config file path.
    Path,
    /// Print effective merged configuration.
    Show,
    /// Validate configuration and exit.
    Validate,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completions for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input or configuration.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// Internal bug or invariant violation.
    #[error("{0}")]
    Internal(String),
    /// The run completed but crossed at least one threshold.
    #[error("{failed} threshold(s) crossed")]
    Thresholds { failed: usize },
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Internal(_) | Self::Json(_) => 3,
            Self::Thresholds { .. } => 99,
        }
    }
}

impl From<RampError> for CliError {
    fn from(err: RampError) -> Self {
        match err {
            RampError::InvalidConfig { .. }
            | RampError::MissingConfig { .. }
            | RampError::ConfigParse { .. }
            | RampError::InvalidSummary { .. } => Self::User(err.to_string()),
            RampError::Io { .. } => Self::Runtime(err.to_string()),
            RampError::Serialization { .. } => Self::Internal(err.to_string()),
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Plan => run_plan(cli),
        Command::Probe(args) => run_probe(cli, args),
        Command::Report(args) => run_report(cli, args),
        Command::Config(args) => run_config(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

/// Load config and open the event log it names.
fn load_context(cli: &Cli) -> Result<(Config, JsonlWriter), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let mut log = JsonlWriter::open(JsonlConfig::new(config.paths.event_log.clone()));

    let mut entry = LogEntry::new(EventType::ConfigLoaded, Severity::Info)
        .with_path(&config.paths.config_file);
    entry.config_hash = config.stable_hash().ok();
    log.write_entry(&entry);

    if cli.verbose {
        eprintln!("[RC-CONFIG] loaded {}", config.paths.config_file.display());
    }
    Ok((config, log))
}

/// Log a fatal error before handing it back to `main`.
fn logged(log: &mut JsonlWriter, err: RampError) -> CliError {
    log.write_entry(&LogEntry::from_error(&err));
    log.flush();
    err.into()
}

fn run_plan(cli: &Cli) -> Result<(), CliError> {
    let (config, _log) = load_context(cli)?;
    let spec = WorkloadSpec::from_config(&config)?;

    match output_mode(cli) {
        OutputMode::Human => {
            println!("Target: {}", spec.target_base_url());
            println!(
                "Iteration: GET {}{}?duration={}  (delay {})",
                spec.target_base_url().trim_end_matches('/'),
                config.target.path,
                config.target.stress_duration_secs,
                format_duration(spec.iteration_delay())
            );
            println!();
            println!("{}", "Stages:".bold());
            println!("  {:>3}  {:<10} {:>6}", "#", "duration", "target");
            for (i, stage) in spec.stages().iter().enumerate() {
                println!(
                    "  {:>3}  {:<10} {:>6}",
                    i + 1,
                    format_duration(stage.duration),
                    stage.target
                );
            }
            println!(
                "  total {}, peak {} virtual users",
                format_duration(spec.total_duration()),
                spec.peak_concurrency()
            );
            println!();
            println!("{}", "Thresholds:".bold());
            for (metric, exprs) in spec.thresholds() {
                let rendered: Vec<String> = exprs.iter().map(ToString::to_string).collect();
                println!("  {metric}: {}", rendered.join(", "));
            }
        }
        OutputMode::Json => write_json_line(&spec.engine_options())?,
    }
    Ok(())
}

fn run_probe(cli: &Cli, args: &ProbeArgs) -> Result<(), CliError> {
    if args.iterations == 0 {
        return Err(CliError::User("--iterations must be at least 1".to_string()));
    }
    let (config, mut log) = load_context(cli)?;
    let spec = WorkloadSpec::from_config(&config).map_err(|e| logged(&mut log, e))?;
    let iteration = SimulatedIteration::for_workload(&spec, &config.target);
    let client = ReqwestClient::new(Duration::from_millis(config.target.timeout_ms))
        .map_err(|e| CliError::Runtime(format!("http client: {e}")))?;
    let recorder = MemoryRecorder::new();
    let mode = output_mode(cli);

    for i in 1..=args.iterations {
        let result = iteration.run(&client, &recorder);
        log.write_entry(&probe_entry(iteration.url(), &result));

        match mode {
            OutputMode::Human => {
                if !cli.quiet {
                    print_probe_line(i, args.iterations, iteration.url(), &result);
                }
            }
            OutputMode::Json => write_json_line(&probe_payload(i, iteration.url(), &result))?,
        }

        if i < args.iterations && !args.no_delay {
            thread::sleep(iteration.delay());
        }
    }
    log.flush();

    match mode {
        OutputMode::Human => {
            if !cli.quiet {
                for (metric, tally) in recorder.snapshot() {
                    let rate = tally
                        .rate()
                        .map_or_else(|| "N/A".to_string(), |r| format!("{:.2}%", r * 100.0));
                    println!(
                        "{metric}: {rate} ({} of {} iterations failed)",
                        tally.hits, tally.samples
                    );
                }
            }
        }
        OutputMode::Json => {
            let tally = recorder.tally(ERRORS).unwrap_or_default();
            write_json_line(&json!({
                "command": "probe",
                "target": iteration.url(),
                "iterations": tally.samples,
                "failed": tally.hits,
                "error_rate": tally.rate(),
            }))?;
        }
    }
    Ok(())
}

fn probe_entry(url: &str, result: &IterationResult) -> LogEntry {
    let severity = if result.success {
        Severity::Info
    } else {
        Severity::Warning
    };
    let mut entry = LogEntry::new(EventType::ProbeIteration, severity);
    entry.target = Some(url.to_string());
    entry.status_code = result.status_code;
    entry.ok = Some(result.success);
    entry.details = result.failure.as_ref().map(ToString::to_string);
    entry
}

fn probe_payload(index: u32, url: &str, result: &IterationResult) -> Value {
    json!({
        "iteration": index,
        "target": url,
        "success": result.success,
        "status_code": result.status_code,
        "body_parsed": result.body_parsed,
        "checks": result.checks,
        "failure": result.failure.as_ref().map(ToString::to_string),
    })
}

fn print_probe_line(index: u32, total: u32, url: &str, result: &IterationResult) {
    let status = result
        .status_code
        .map_or_else(|| "---".to_string(), |s| s.to_string());
    let verdict = match &result.failure {
        None => "ok".green().to_string(),
        Some(failure) => format!("{} ({failure})", "failed".red()),
    };
    println!("[{index}/{total}] GET {url} -> {status} {verdict}");
    for check in result.checks.iter().filter(|c| !c.passed) {
        println!("        x {}", check.name);
    }
}

fn run_report(cli: &Cli, args: &ReportArgs) -> Result<(), CliError> {
    let (config, mut log) = load_context(cli)?;
    let spec = WorkloadSpec::from_config(&config).map_err(|e| logged(&mut log, e))?;
    let snapshot = read_snapshot_file(&args.summary).map_err(|e| logged(&mut log, e))?;

    let mode = output_mode(cli);
    let outcomes = evaluate_thresholds(&snapshot, spec.thresholds());

    match mode {
        OutputMode::Human => {
            let stdout = io::stdout();
            let options = RenderOptions::new(
                args.indent.clone().unwrap_or_else(|| config.report.indent.clone()),
                config.report.colors && !cli.no_color && stdout.is_terminal(),
            );
            let mut out = stdout.lock();
            out.write_all(render_text(&snapshot, &options).as_bytes())?;
            out.flush()?;
        }
        OutputMode::Json => write_json_line(&json!({
            "command": "report",
            "snapshot": snapshot,
            "thresholds": outcomes,
            "passed": all_passed(&outcomes),
        }))?,
    }
    log.write_entry(
        &LogEntry::new(EventType::ReportRendered, Severity::Info)
            .with_path(&args.summary)
            .with_details(format!("{} requests", snapshot.request_count)),
    );
    if !snapshot.duration.is_ordered() {
        log.write_entry(
            &LogEntry::new(EventType::ReportRendered, Severity::Warning)
                .with_path(&args.summary)
                .with_details("latency percentiles out of order (p50 <= p95 <= p99 <= max)"),
        );
        if !cli.quiet {
            eprintln!(
                "warning: {}: latency percentiles out of order",
                args.summary.display()
            );
        }
    }

    if !args.no_artifact {
        let path = args
            .artifact
            .clone()
            .unwrap_or_else(|| config.report.artifact_path.clone());
        let bytes = render_artifact(&snapshot).map_err(|e| logged(&mut log, e))?;
        write_artifact(&path, &bytes).map_err(|e| logged(&mut log, e))?;
        log.write_entry(
            &LogEntry::new(EventType::ArtifactWritten, Severity::Info).with_path(&path),
        );
        if cli.verbose {
            eprintln!("artifact written to {}", path.display());
        }
    }

    for outcome in &outcomes {
        log.write_entry(&threshold_entry(outcome));
    }
    log.flush();

    let failed: Vec<&ThresholdOutcome> = outcomes.iter().filter(|o| !o.passed).collect();
    if failed.is_empty() {
        return Ok(());
    }
    if mode == OutputMode::Human && !cli.quiet {
        let mut err = io::stderr().lock();
        for outcome in &failed {
            let actual = outcome
                .actual
                .map_or_else(|| "N/A".to_string(), |v| format!("{v:.2}"));
            writeln!(
                err,
                "{} {}: {} (actual {actual})",
                "threshold crossed".red().bold(),
                outcome.metric,
                outcome.expression
            )?;
        }
    }
    Err(CliError::Thresholds {
        failed: failed.len(),
    })
}

fn threshold_entry(outcome: &ThresholdOutcome) -> LogEntry {
    let severity = if outcome.passed {
        Severity::Info
    } else {
        Severity::Warning
    };
    let mut entry = LogEntry::new(EventType::ThresholdsEvaluated, severity);
    entry.metric = Some(outcome.metric.clone());
    entry.expression = Some(outcome.expression.clone());
    entry.actual = outcome.actual;
    entry.ok = Some(outcome.passed);
    entry
}

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match &args.command {
        None | Some(ConfigCommand::Path) => {
            let path = cli.config.clone().unwrap_or_else(Config::default_path);
            let exists = path.exists();

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", path.display());
                    if !exists {
                        println!("  (file does not exist; defaults will be used)");
                    }
                }
                OutputMode::Json => {
                    write_json_line(&json!({
                        "command": "config path",
                        "path": path.to_string_lossy(),
                        "exists": exists,
                    }))?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Show) => {
            let config = Config::load(cli.config.as_deref())?;

            match output_mode(cli) {
                OutputMode::Human => println!("{}", config.to_toml()?),
                OutputMode::Json => {
                    write_json_line(&json!({
                        "command": "config show",
                        "config": serde_json::to_value(&config)?,
                    }))?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Validate) => match Config::load(cli.config.as_deref()) {
            Ok(config) => {
                let hash = config.stable_hash()?;

                match output_mode(cli) {
                    OutputMode::Human => {
                        println!("Configuration is valid.");
                        println!("  Source: {}", config.paths.config_file.display());
                        println!("  Hash: {hash}");
                    }
                    OutputMode::Json => {
                        write_json_line(&json!({
                            "command": "config validate",
                            "valid": true,
                            "path": config.paths.config_file.to_string_lossy(),
                            "hash": hash,
                        }))?;
                    }
                }
                Ok(())
            }
            Err(e) => {
                match output_mode(cli) {
                    OutputMode::Human => eprintln!("Configuration is INVALID: {e}"),
                    OutputMode::Json => {
                        write_json_line(&json!({
                            "command": "config validate",
                            "valid": false,
                            "code": e.code(),
                            "error": e.to_string(),
                        }))?;
                    }
                }
                Err(CliError::User(format!("invalid config: {e}")))
            }
        },
    }
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("RAMPCHECK_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref())
}

/// Report text is the product, so human output stays the default even when
/// stdout is piped.
fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }
    match env_mode.map(str::trim).map(str::to_ascii_lowercase).as_deref() {
        Some("json") => OutputMode::Json,
        _ => OutputMode::Human,
    }
}
