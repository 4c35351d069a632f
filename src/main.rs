use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use rio_core::config::{Config, resolve_config_path};
use rio_core::{HookError, HookEvent, HookLog, Pipeline};
use rio_matchers::MatcherLoader;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Rank installed skills, agents, and commands against a submitted prompt.
///
/// Reads the `UserPromptSubmit` payload on stdin and, when any matcher
/// matches, writes the directive envelope to stdout.
#[derive(Debug, Parser)]
#[command(name = "rio", version, about)]
struct Cli {
    /// TOML config file (default: $RIO_CONFIG, then .claude/hooks/rio/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_subscriber();
    let cli = Cli::parse();

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("rio: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let config_path = resolve_config_path(cli.config.as_deref());
    let config = Config::load(&config_path)?;
    tracing::debug!(
        "loaded config from {}, {} matcher paths",
        config_path.display(),
        config.matchers.paths.len()
    );

    let log = HookLog::new(&config.log.dir, &config.log.hook_name);

    let mut input = String::new();
    if let Err(e) = tokio::io::stdin().read_to_string(&mut input).await {
        let e = anyhow::Error::new(e).context("failed to read stdin");
        log.record(&HookEvent::Error {
            message: format!("{e:#}"),
        })
        .await?;
        return Err(e);
    }

    let loader = MatcherLoader::new();
    let output = match Pipeline::new(&config.matchers.paths, &loader, &log)
        .run(&input)
        .await
    {
        Ok(output) => output,
        Err(e) => return Err(fail(&log, e).await),
    };

    if let Some(output) = output {
        let mut text = output
            .to_json_pretty()
            .context("failed to serialize output")?;
        text.push('\n');
        let mut stdout = tokio::io::stdout();
        stdout.write_all(text.as_bytes()).await?;
        stdout.flush().await?;
    }
    Ok(())
}

/// Record a fatal error in the hook log when it is still writable.
async fn fail(log: &HookLog, err: HookError) -> anyhow::Error {
    if err.is_loggable()
        && let Err(log_err) = log
            .record(&HookEvent::Error {
                message: err.to_string(),
            })
            .await
    {
        return log_err.into();
    }
    err.into()
}

fn init_subscriber() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("RIO_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    // Stdout carries the hook output.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
