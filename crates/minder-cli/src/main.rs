//! minder - run child-safety evaluation suites against an LLM provider.

mod report;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use minder_core::{summarize, Suite, VerdictBand};
use minder_runtime::{
    build_provider, run_suite, ApiKey, GenerateOptions, ProviderConfig, ProviderKind, RetryPolicy,
    RunConfig,
};

#[derive(Parser)]
#[command(
    name = "minder",
    version,
    about = "Rule-based evaluation of LLM responses for child-facing use"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one or more suites and export results
    Run(RunArgs),

    /// Validate suite files without calling a provider
    Validate {
        /// Suite YAML files
        #[arg(required = true)]
        suites: Vec<PathBuf>,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Suite YAML files
    #[arg(required = true)]
    suites: Vec<PathBuf>,

    /// Provider backend
    #[arg(long, value_enum, default_value_t = ProviderArg::Dummy)]
    provider: ProviderArg,

    /// Model name (defaults to the backend's default model)
    #[arg(long)]
    model: Option<String>,

    /// API key (defaults to the backend's environment variable)
    #[arg(long)]
    api_key: Option<String>,

    /// Concurrent case evaluations
    #[arg(long, default_value_t = 4)]
    concurrency: usize,

    /// Per-call timeout (e.g. "30s")
    #[arg(long, value_parser = humantime::parse_duration, default_value = "30s")]
    timeout: Duration,

    /// Overall suite deadline (e.g. "5m")
    #[arg(long, value_parser = humantime::parse_duration)]
    deadline: Option<Duration>,

    /// Retries for transient provider failures
    #[arg(long, default_value_t = 2)]
    max_retries: u32,

    /// Directory for JSON/CSV exports
    #[arg(long, default_value = "results")]
    output_dir: PathBuf,

    /// Also render an SVG badge per suite
    #[arg(long)]
    badge: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ProviderArg {
    Dummy,
    Openai,
    Anthropic,
}

impl From<ProviderArg> for ProviderKind {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Dummy => ProviderKind::Dummy,
            ProviderArg::Openai => ProviderKind::OpenAi,
            ProviderArg::Anthropic => ProviderKind::Anthropic,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run(args).await,
        Command::Validate { suites } => validate(&suites),
    }
}

async fn run(args: RunArgs) -> Result<()> {
    let kind = ProviderKind::from(args.provider);
    let model = args
        .model
        .unwrap_or_else(|| kind.default_model().to_string());

    let mut provider_config = ProviderConfig::new(kind, model);
    if let Some(key) = args.api_key {
        provider_config = provider_config.with_api_key(ApiKey::new(key, "API key"));
    }
    let provider = build_provider(&provider_config)?;

    let run_config = RunConfig {
        concurrency_limit: args.concurrency,
        suite_deadline: args.deadline,
        retry: RetryPolicy {
            max_retries: args.max_retries,
            ..Default::default()
        },
        generation: GenerateOptions {
            timeout: args.timeout,
            ..Default::default()
        },
        ..Default::default()
    };

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating output directory {}", args.output_dir.display()))?;

    let mut worst_band = VerdictBand::Excellent;

    for path in &args.suites {
        let suite = Suite::from_yaml_file(path)
            .with_context(|| format!("loading suite {}", path.display()))?;

        tracing::info!(
            suite = %suite.name,
            provider = provider.name(),
            cases = suite.cases.len(),
            "running suite"
        );
        let result = run_suite(&suite, provider.clone(), run_config.clone()).await?;
        let summary = summarize(&result);

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("suite");
        let timestamp = result.generated_at.format("%Y%m%d_%H%M%S");
        let json_path = report::write_json(
            &args.output_dir.join(format!("{stem}_{timestamp}.json")),
            &result,
            &summary,
            provider.name(),
            provider.model(),
        )?;
        let csv_path = report::write_csv(
            &args.output_dir.join(format!("{stem}_{timestamp}.csv")),
            &result,
        )?;

        println!("{} ({})", result.suite_name, result.age_band);
        println!(
            "  {}/{} passed ({:.0}%) - {}",
            summary.passed,
            summary.total,
            summary.overall_pass_rate * 100.0,
            summary.verdict_band
        );
        for (category, rate) in &summary.per_category_pass_rate {
            println!("  {category}: {:.0}%", rate * 100.0);
        }
        println!("  results: {}", json_path.display());
        println!("           {}", csv_path.display());

        if args.badge {
            let badge_path = report::write_badge(
                &args.output_dir.join(format!("{stem}_badge.svg")),
                &summary,
            )?;
            println!("  badge:   {}", badge_path.display());
        }

        if band_rank(summary.verdict_band) > band_rank(worst_band) {
            worst_band = summary.verdict_band;
        }
    }

    if worst_band == VerdictBand::Critical {
        std::process::exit(1);
    }
    Ok(())
}

fn validate(paths: &[PathBuf]) -> Result<()> {
    let mut failed = false;
    for path in paths {
        match Suite::from_yaml_file(path) {
            Ok(suite) => println!("OK   {} ({} cases)", path.display(), suite.cases.len()),
            Err(error) => {
                failed = true;
                eprintln!("FAIL {}: {error}", path.display());
            }
        }
    }
    if failed {
        bail!("one or more suites failed validation");
    }
    Ok(())
}

fn band_rank(band: VerdictBand) -> u8 {
    match band {
        VerdictBand::Excellent => 0,
        VerdictBand::Good => 1,
        VerdictBand::NeedsAttention => 2,
        VerdictBand::Critical => 3,
    }
}
