//! Stepdoc CLI - record a session, then generate documentation from it

use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use colored::Colorize;

use stepdoc::error::{FixSuggestion, StepdocError};
use stepdoc::{create_provider, Describer, ReportSynthesizer, SessionStore, StepdocConfig};

#[derive(Parser)]
#[command(name = "stepdoc")]
#[command(about = "Record desktop sessions and turn them into step-by-step markdown docs")]
#[command(version)]
struct Cli {
    /// Start recording inputs (Esc or Ctrl-C stops)
    #[arg(long, conflicts_with = "generate")]
    record: bool,

    /// Generate documentation from the last session
    #[arg(long)]
    generate: bool,

    /// Session directory (log.json + images/)
    #[arg(long)]
    session_dir: Option<PathBuf>,

    /// Markdown output file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Vision provider (ollama, mock)
    #[arg(short, long)]
    provider: Option<String>,

    /// Vision model name
    #[arg(short, long)]
    model: Option<String>,

    /// Ollama base URL
    #[arg(long)]
    ollama_url: Option<String>,

    /// Seconds to wait for one description
    #[arg(long)]
    timeout: Option<u64>,

    /// Steps described in parallel
    #[arg(long)]
    concurrency: Option<usize>,

    /// Config file (default: ./stepdoc.yaml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    // Load .env file (ignore if not present)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if !cli.record && !cli.generate {
        let _ = Cli::command().print_help();
        println!();
        return;
    }

    let result = match resolve_config(&cli) {
        Ok(config) if cli.record => record(&config).await,
        Ok(config) => generate(&config).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(suggestion) = e.fix_suggestion() {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

/// File, then environment, then flags
fn resolve_config(cli: &Cli) -> Result<StepdocConfig, StepdocError> {
    let mut config = StepdocConfig::load(cli.config.as_deref())?.with_env()?;

    if let Some(dir) = &cli.session_dir {
        config.session_dir = dir.clone();
    }
    if let Some(output) = &cli.output {
        config.output = output.clone();
    }
    if let Some(provider) = &cli.provider {
        config.provider = provider.clone();
    }
    if let Some(model) = &cli.model {
        config.model = model.clone();
    }
    if let Some(url) = &cli.ollama_url {
        config.ollama_url = url.clone();
    }
    if let Some(secs) = cli.timeout {
        config.timeout_secs = secs;
    }
    if let Some(n) = cli.concurrency {
        config.concurrency = n;
    }

    config.validate()?;
    Ok(config)
}

#[cfg(feature = "desktop")]
async fn record(config: &StepdocConfig) -> Result<(), StepdocError> {
    use std::sync::Arc;
    use stepdoc::capture::desktop::{RdevKeyboard, RdevPointer, XcapScreen};
    use stepdoc::CaptureController;

    let store = SessionStore::new(&config.session_dir);
    let log_path = store.log_path().display().to_string();
    let controller = CaptureController::new(
        store,
        Arc::new(XcapScreen),
        Arc::new(RdevPointer),
        Arc::new(RdevKeyboard),
    );

    println!(
        "{} Recording started. Saving to {}",
        "●".red(),
        config.session_dir.display().to_string().cyan()
    );
    println!("  Press Esc (or Ctrl-C) to stop.");

    let interrupt = {
        let controller = controller.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                controller.stop();
            }
        })
    };

    let events = controller.start().await;
    interrupt.abort();
    let events = events?;

    println!(
        "{} Recorded {} events to {}",
        "✓".green(),
        events.len(),
        log_path.cyan()
    );
    Ok(())
}

#[cfg(not(feature = "desktop"))]
async fn record(_config: &StepdocConfig) -> Result<(), StepdocError> {
    Err(StepdocError::CaptureUnavailable)
}

async fn generate(config: &StepdocConfig) -> Result<(), StepdocError> {
    let provider = create_provider(&config.provider, config)?;

    println!(
        "{} Using provider: {} | model: {}",
        "→".cyan(),
        provider.name().cyan().bold(),
        provider.model().cyan()
    );

    let describer = Describer::new(provider).with_timeout(config.timeout());
    let synthesizer = ReportSynthesizer::new(
        SessionStore::new(&config.session_dir),
        describer,
        &config.output,
    )
    .with_concurrency(config.concurrency);

    let summary = synthesizer.generate().await?;

    println!(
        "{} Documentation generated: {} ({} steps)",
        "✓".green(),
        summary.output.display().to_string().cyan(),
        summary.steps
    );
    Ok(())
}
