//! AbstainLab CLI — campaign reports and completeness checks.
//!
//! Commands:
//! - `report` — load a campaign, build the comparison report, print or save it
//! - `check` — count completed runs per configuration in a campaign directory

use std::path::{Path, PathBuf};

use abstainlab_analysis::export::{export_csv, export_json, export_markdown, save_report};
use abstainlab_analysis::{to_percentage_points, AnalysisConfig, ComparisonReport, ReportBuilder};
use abstainlab_core::{
    completed_runs, load_campaign_dir, load_jsonl_file, ConfigName, LoadOptions, LoadedCampaign,
};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "abstainlab",
    about = "AbstainLab CLI — stochastic evaluation aggregation and comparison"
)]
struct Cli {
    /// Log progress to stderr (RUST_LOG overrides the level).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the comparison report for a campaign.
    Report {
        /// Campaign directory (<config>/run_NNN/results.json) or a JSONL record file.
        #[arg(long)]
        input: PathBuf,

        /// Analysis config TOML. Flags below override its values.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Baseline configuration name.
        #[arg(long)]
        baseline: Option<String>,

        /// Confidence level for intervals, in (0, 1).
        #[arg(long)]
        confidence: Option<f64>,

        /// Skip configurations with fewer completed runs.
        #[arg(long)]
        required_runs: Option<usize>,

        /// Only load these configurations (comma-separated).
        #[arg(long, value_delimiter = ',')]
        configs: Vec<String>,

        /// Output format when printing to stdout.
        #[arg(long, value_enum, default_value_t = Format::Markdown)]
        format: Format,

        /// Write report.json, report.csv and report.md into this directory instead.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Report completed runs per configuration.
    Check {
        /// Campaign directory.
        #[arg(long)]
        input: PathBuf,

        /// Runs each configuration needs to be complete.
        #[arg(long, default_value_t = 50)]
        required_runs: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Csv,
    Markdown,
}

fn init_tracing(verbose: bool) {
    if verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Report {
            input,
            config,
            baseline,
            confidence,
            required_runs,
            configs,
            format,
            output,
        } => run_report(
            &input,
            config.as_deref(),
            baseline,
            confidence,
            required_runs,
            configs,
            format,
            output.as_deref(),
        ),
        Commands::Check {
            input,
            required_runs,
        } => run_check(&input, required_runs),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_report(
    input: &Path,
    config_path: Option<&Path>,
    baseline: Option<String>,
    confidence: Option<f64>,
    required_runs: Option<usize>,
    configs: Vec<String>,
    format: Format,
    output: Option<&Path>,
) -> Result<()> {
    let mut config = match (config_path, baseline.as_deref()) {
        (Some(path), _) => AnalysisConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        (None, Some(name)) => AnalysisConfig::new(name),
        (None, None) => bail!("a baseline is required: pass --baseline or --config"),
    };
    if let Some(name) = baseline {
        config.baseline = ConfigName::new(name);
    }
    if let Some(level) = confidence {
        config.confidence_level = level;
    }
    config.validate().context("invalid analysis config")?;

    let opts = LoadOptions {
        required_runs,
        configurations: (!configs.is_empty())
            .then(|| configs.into_iter().map(ConfigName::new).collect()),
        kinds: config.category_kinds.clone(),
    };
    let campaign = load(input, &opts)?;
    for skipped in &campaign.skipped {
        eprintln!(
            "Skipped {}: {}/{} runs complete",
            skipped.configuration, skipped.completed_runs, skipped.required_runs
        );
    }
    if campaign.store.is_empty() {
        bail!("no runs loaded from {}", input.display());
    }

    let report = ReportBuilder::new(&campaign.store, &config).build()?;

    match output {
        Some(dir) => {
            let dir = save_report(&report, dir)?;
            print_summary(&report);
            println!("Report saved to: {}", dir.display());
        }
        None => {
            let rendered = match format {
                Format::Json => export_json(&report)?,
                Format::Csv => export_csv(&report)?,
                Format::Markdown => export_markdown(&report),
            };
            print!("{rendered}");
        }
    }

    Ok(())
}

fn load(input: &Path, opts: &LoadOptions) -> Result<LoadedCampaign> {
    let campaign = if input.is_dir() {
        load_campaign_dir(input, opts)
    } else {
        load_jsonl_file(input, opts)
    };
    campaign.with_context(|| format!("failed to load campaign from {}", input.display()))
}

fn print_summary(report: &ComparisonReport) {
    println!("Baseline: {}", report.baseline);
    println!("Campaign: {}", report.campaign_hash);
    for overall in &report.overall {
        let mean = overall
            .mean_accuracy
            .value()
            .map_or("unavailable".to_string(), |m| {
                format!("{:.2}%", to_percentage_points(*m))
            });
        let delta = match overall.delta.as_ref() {
            Some(cell) => cell.value().map_or("unavailable".to_string(), |d| {
                format!("{:+.2} pp", to_percentage_points(*d))
            }),
            None => "baseline".to_string(),
        };
        println!(
            "  {:<20} runs={:<4} mean={:<10} delta={}",
            overall.configuration.as_str(),
            overall.runs,
            mean,
            delta
        );
    }
    if !report.errors.is_empty() {
        println!("Unavailable cells: {}", report.errors.len());
    }
}

fn run_check(input: &Path, required_runs: usize) -> Result<()> {
    let counts = completed_runs(input)
        .with_context(|| format!("failed to scan campaign {}", input.display()))?;
    if counts.is_empty() {
        println!("No configurations found in {}", input.display());
        return Ok(());
    }

    let mut complete = 0usize;
    for (configuration, runs) in &counts {
        let status = if *runs >= required_runs {
            complete += 1;
            "complete"
        } else {
            "incomplete"
        };
        println!(
            "{:<20} {:>4}/{:<4} {}",
            configuration.as_str(),
            runs,
            required_runs,
            status
        );
    }
    println!("{complete}/{} configurations complete", counts.len());

    Ok(())
}
