mod config;
mod topics;

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use colored::Colorize;

use draftloops_core::{
    Attempt, LoopContext, LoopOutcome, LoopRunner, StoppingPolicy, DEFAULT_DIMENSIONS,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_QUALITY_THRESHOLD,
};
use draftloops_critic::Role;
use draftloops_logging::{init_tracing, LogFormat, Logger, SessionLine, SessionWriter};
use draftloops_oracle::{create_oracle, Oracle, OracleType, RetryingOracle};
use draftloops_topics::GoogleNewsSource;

use config::ProjectConfig;
use topics::{resolve_topic, TopicArgs};

#[derive(Parser, Debug)]
#[command(
    name = "draftloops",
    about = "Generate, evaluate and refine written content",
    version,
    author
)]
struct Cli {
    #[command(flatten)]
    topic: TopicArgs,

    /// Working directory holding draftloops.toml (default: current directory)
    #[arg(short = 'd', long)]
    working_dir: Option<PathBuf>,

    /// Maximum attempts (default: 3)
    #[arg(short = 'n', long)]
    max_attempts: Option<usize>,

    /// Overall score (0-100) that ends the loop early (default: 95)
    #[arg(long)]
    threshold: Option<f64>,

    /// Quality dimension to score; repeat for several
    #[arg(long = "dimension")]
    dimensions: Vec<String>,

    /// Oracle backend
    #[arg(long, value_enum)]
    oracle: Option<OracleChoice>,

    /// Model to use (if the oracle supports it)
    #[arg(short, long)]
    model: Option<String>,

    /// Retries for transient oracle failures
    #[arg(long)]
    retries: Option<u32>,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogFormatChoice,

    /// Also append JSON log events to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Record the run as a JSONL session file
    #[arg(long)]
    record: bool,

    /// Output the final outcome as JSON
    #[arg(long)]
    json_output: bool,

    /// Dry run: show the resolved settings without calling the oracle
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OracleChoice {
    Gemini,
    Command,
}

impl From<OracleChoice> for OracleType {
    fn from(choice: OracleChoice) -> Self {
        match choice {
            OracleChoice::Gemini => OracleType::Gemini,
            OracleChoice::Command => OracleType::Command,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // GOOGLE_API_KEY may live in .env
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let log_format: LogFormat = cli.log_format.into();
    init_tracing("warn", log_format);

    let working_dir = match cli.working_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let config = ProjectConfig::load(&working_dir)?.unwrap_or_default();

    // Resolve the topic
    let topic = if cli.topic.is_direct() || !cli.dry_run {
        let source = GoogleNewsSource::new().context("Failed to create news client")?;
        match resolve_topic(&cli.topic, &source).await? {
            Some(topic) => topic,
            None => return Ok(()),
        }
    } else {
        String::from("(chosen from news headlines)")
    };

    let oracle_type = match cli.oracle {
        Some(choice) => choice.into(),
        None => config.oracle_kind()?.unwrap_or(OracleType::Gemini),
    };

    let dimensions = if !cli.dimensions.is_empty() {
        cli.dimensions.clone()
    } else if let Some(ref dims) = config.dimensions {
        dims.clone()
    } else {
        DEFAULT_DIMENSIONS.iter().map(|d| d.to_string()).collect()
    };

    let policy = StoppingPolicy {
        max_attempts: cli
            .max_attempts
            .or(config.max_attempts)
            .unwrap_or(DEFAULT_MAX_ATTEMPTS),
        quality_threshold: cli
            .threshold
            .or(config.quality_threshold)
            .unwrap_or(DEFAULT_QUALITY_THRESHOLD),
        stop_on_repeated_content: config.stop_on_repeated_content.unwrap_or(true),
        stop_on_repeated_feedback: config.stop_on_repeated_feedback.unwrap_or(false),
    };

    let reviewers = config.reviewer_roles().unwrap_or_else(Role::default_panel);
    let retry = config.retry_policy(cli.retries);

    let oracle_config = config.oracle_config(cli.model.clone());

    if cli.dry_run {
        println!("=== Dry Run ===");
        println!("Topic: {}", topic);
        println!("Working dir: {}", working_dir.display());
        println!("Oracle: {}", oracle_type);
        println!(
            "Model: {}",
            oracle_config.model.as_deref().unwrap_or("(default)")
        );
        println!("Dimensions: {}", dimensions.join(", "));
        println!("Max attempts: {}", policy.max_attempts);
        println!("Quality threshold: {:.1}", policy.quality_threshold);
        let names: Vec<&str> = reviewers.iter().map(|r| r.name.as_str()).collect();
        println!("Reviewers: {}", names.join(", "));
        println!("Retries: {}", retry.max_retries);
        return Ok(());
    }

    // Create the oracle
    let backend = create_oracle(oracle_type, &config.backend_settings())
        .with_context(|| format!("Failed to create {} oracle", oracle_type))?;
    if !backend.is_available().await {
        anyhow::bail!(
            "Oracle '{}' is not available. Check GOOGLE_API_KEY or that the command is installed.",
            backend.name()
        );
    }
    let oracle = RetryingOracle::new(backend, retry);

    let context = LoopContext::new(topic.clone())
        .with_dimensions(dimensions)
        .with_policy(policy);

    let logger = match cli.log_file {
        Some(ref path) => Logger::with_file(log_format, path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?,
        None => Logger::new(log_format),
    };

    let mut runner = LoopRunner::new(&oracle, Arc::new(logger))
        .with_reviewers(reviewers)
        .with_oracle_config(oracle_config.clone());

    // Record the session
    let session = if cli.record {
        let writer = Arc::new(SessionWriter::new(&topic).context("Failed to create session file")?);
        writer.write(&SessionLine::SessionStart {
            timestamp: Utc::now(),
            run_id: &context.run_id.to_string(),
            topic: &topic,
            oracle: oracle.name(),
            model: oracle_config.model.as_deref(),
            dimensions: &context.dimensions,
            max_attempts: context.policy.max_attempts,
            quality_threshold: context.policy.quality_threshold,
        });
        let recorder = writer.clone();
        runner = runner.with_attempt_callback(Arc::new(move |attempt: &Attempt| {
            recorder.write_attempt(attempt);
        }));
        Some(writer)
    } else {
        None
    };

    // Handle Ctrl+C gracefully
    let interrupt_handle = runner.interrupt_handle();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted. Finishing current attempt...");
        interrupt_handle.store(true, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    // Run the loop
    let outcome = runner.run(context).await?;

    if let Some(ref writer) = session {
        let best = outcome.best();
        writer.write(&SessionLine::SessionEnd {
            outcome: outcome.status(),
            attempts: outcome.attempts(),
            best_attempt: best.attempt,
            best_score: best.overall,
            duration_secs: outcome.total_duration_secs(),
            timestamp: Utc::now(),
        });
    }

    // Output result
    if cli.json_output {
        let json = serde_json::to_string_pretty(&outcome)?;
        println!("{}", json);
    } else {
        if !outcome.best().is_failed() {
            println!("{}", outcome.best().content);
        }
        print_outcome(&outcome);
    }
    if let Some(ref writer) = session {
        eprintln!("Session: {}", writer.path().display());
    }

    // Exit with appropriate code
    std::process::exit(outcome.exit_code());
}

fn print_outcome(outcome: &LoopOutcome) {
    let best = outcome.best();
    let best_line = match best.attempt {
        Some(index) => format!("attempt {} ({:.1})", index + 1, best.overall),
        None => "none".to_string(),
    };

    eprintln!();
    match outcome {
        LoopOutcome::QualityMet { .. } => {
            eprintln!("{}", "=== QUALITY MET ===".bright_green().bold());
        }
        LoopOutcome::FeedbackConverged { .. } => {
            eprintln!("{}", "=== FEEDBACK CONVERGED ===".bright_green().bold());
            eprintln!("Reviewers repeated their feedback.");
        }
        LoopOutcome::BudgetExhausted { .. } => {
            eprintln!("{}", "=== BUDGET EXHAUSTED ===".bright_yellow().bold());
            if outcome.no_progress() {
                eprintln!("Stopped early: revisions repeated earlier content.");
            }
        }
        LoopOutcome::UserInterrupted { .. } => {
            eprintln!("{}", "=== INTERRUPTED ===".bright_yellow().bold());
        }
        LoopOutcome::Failed { attempt, error, .. } => {
            eprintln!("{}", "=== FAILED ===".bright_red().bold());
            eprintln!("Attempt {} failed: {}", attempt + 1, error);
        }
    }
    eprintln!("Attempts: {}", outcome.attempts());
    eprintln!("Best: {}", best_line);
    eprintln!("Duration: {:.1}s", outcome.total_duration_secs());
}
