//! hypotest: CLI entry point.
//!
//! Runs a single analysis on a data file or manual entry, or a batch of YAML
//! scenarios.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use hypotest::assumptions::{AssumptionReport, CheckResult, Outcome};
use hypotest::interpret::{Verdict, DEFAULT_ALPHA};
use hypotest::selector::{DataType, Pairing};
use hypotest::types::{load_scenarios, AnalysisSpec, ScenarioResult};
use hypotest::{Analysis, AnalysisOutcome, DataMatrix};

#[derive(Parser)]
#[command(name = "hypotest")]
#[command(about = "Select and run the appropriate hypothesis test for your data")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze one dataset.
    Analyze(AnalyzeArgs),
    /// Run every scenario file in a directory.
    Batch {
        /// Directory of `*.yaml` scenario files.
        #[arg(short, long, default_value = "scenarios")]
        scenarios: PathBuf,
    },
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Delimited data file, one group per column.
    #[arg(short, long, conflicts_with = "group")]
    file: Option<PathBuf>,

    /// Cell delimiter for `--file`.
    #[arg(short, long, default_value_t = ';')]
    delimiter: char,

    /// Comma-separated values for one group; repeat per group.
    #[arg(short, long)]
    group: Vec<String>,

    /// Treat values as category codes.
    #[arg(long)]
    categorical: bool,

    /// Groups are matched observations on the same units.
    #[arg(long)]
    paired: bool,

    /// Declared number of groups (must match the data).
    #[arg(long)]
    groups: Option<usize>,

    /// Do not assert that observations are independent.
    #[arg(long)]
    no_independence: bool,

    /// Significance level.
    #[arg(short, long, default_value_t = DEFAULT_ALPHA)]
    alpha: f64,

    /// Print the outcome as JSON.
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Analyze(args) => run_analyze(&args),
        Command::Batch { scenarios } => run_batch_mode(&scenarios),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_matrix(args: &AnalyzeArgs) -> anyhow::Result<DataMatrix> {
    if let Some(path) = &args.file {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read data file: {}", path.display()))?;
        return DataMatrix::from_delimited(&content, args.delimiter)
            .with_context(|| format!("Failed to parse {}", path.display()));
    }

    if args.group.is_empty() {
        anyhow::bail!("No data given. Use --file or one --group per group");
    }
    DataMatrix::from_manual_entry(&args.group).context("Please enter only numeric values")
}

fn run_analyze(args: &AnalyzeArgs) -> anyhow::Result<()> {
    let matrix = load_matrix(args)?;

    let mut analysis = Analysis::new(&matrix)
        .data_type(if args.categorical {
            DataType::Categorical
        } else {
            DataType::Numerical
        })
        .pairing(if args.paired {
            Pairing::Paired
        } else {
            Pairing::Unpaired
        })
        .independence(!args.no_independence)
        .alpha(args.alpha);
    if let Some(groups) = args.groups {
        analysis = analysis.groups(groups);
    }

    let outcome = analysis.run()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&matrix, &outcome);
    }

    Ok(())
}

fn print_outcome(matrix: &DataMatrix, outcome: &AnalysisOutcome) {
    println!("{}", "hypotest".bold());
    println!(
        "  Data: {} group(s) x {} row(s): {}",
        matrix.column_count(),
        matrix.row_count(),
        matrix.names().collect::<Vec<_>>().join(", ")
    );
    println!(
        "  Request: {}, {}, {} group(s)",
        outcome.request.data_type, outcome.request.pairing, outcome.request.groups
    );
    println!();

    if let Some(report) = &outcome.assumptions {
        print_report(report);
        println!();
    }

    let interp = &outcome.interpretation;
    println!("{} {}", "Selected test:".bold(), interp.test.to_string().cyan());
    println!("  statistic = {:.4}", interp.statistic);
    println!("  p-value   = {:.4}", interp.p_value);
    println!();

    let verdict = match interp.verdict {
        Verdict::Reject => interp.verdict.to_string().red().bold(),
        Verdict::FailToReject => interp.verdict.to_string().green().bold(),
    };
    println!("  {verdict}");
    println!("  {}", interp.summary());
}

fn print_report(report: &AssumptionReport) {
    println!("{}", "Assumption checks".bold());
    for result in report.results() {
        print_check(result);
    }
    let classification = report.classification().to_string();
    println!("  => {}", classification.bold());
}

fn print_check(result: &CheckResult) {
    let mark = match result.outcome {
        Outcome::Pass => "✓".green(),
        Outcome::Fail => "✗".red(),
    };
    let scope = result
        .column
        .as_deref()
        .map_or_else(String::new, |c| format!(" [{c}]"));
    let value = match (result.p_value, result.statistic) {
        (Some(p), _) => format!("p={p:.4}"),
        (None, Some(s)) => format!("max |z|={s:.2}"),
        (None, None) => String::new(),
    };
    println!("  {mark} {}{scope} {}", result.check, value.dimmed());
    if let Some(note) = &result.note {
        println!("      {}", note.yellow());
    }
}

fn load_specs(dir: &Path) -> anyhow::Result<Vec<AnalysisSpec>> {
    let mut all_specs = Vec::new();

    if !dir.exists() {
        anyhow::bail!("Scenarios directory not found: {}", dir.display());
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<_, _>>()?;
    paths.sort();

    for path in paths {
        if path.extension().is_some_and(|e| e == "yaml" || e == "yml") {
            let content = fs::read_to_string(&path)?;
            match load_scenarios(&content) {
                Ok(specs) => all_specs.extend(specs),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping scenario file");
                    eprintln!("Warning: Failed to parse {}: {e}", path.display());
                }
            }
        }
    }

    Ok(all_specs)
}

fn run_batch_mode(dir: &Path) -> anyhow::Result<()> {
    let specs = load_specs(dir)?;

    println!("{}", "hypotest".bold());
    println!("  Scenarios: {}", dir.display());
    println!("Loaded {} analyses", specs.len());
    println!();

    let start = Instant::now();
    println!("{}", "Running scenarios...".cyan());

    let results: Vec<ScenarioResult> = specs
        .iter()
        .map(|spec| {
            let result = spec.evaluate();
            print_result(&result);
            result
        })
        .collect();

    let elapsed = start.elapsed();

    // Summary
    println!();
    println!("{}", "=".repeat(60));

    let passed = results.iter().filter(|r| r.is_pass()).count();
    let failed = results.iter().filter(|r| r.is_fail()).count();
    let skipped = results
        .iter()
        .filter(|r| matches!(r, ScenarioResult::Skip { .. }))
        .count();

    if failed == 0 {
        println!(
            "  {} {} passed, {} skipped in {:.2}s",
            "PASS".green(),
            passed.to_string().green(),
            skipped,
            elapsed.as_secs_f64()
        );
    } else {
        println!(
            "  {} {} passed, {} failed, {} skipped in {:.2}s",
            "FAIL".red(),
            passed,
            failed.to_string().red(),
            skipped,
            elapsed.as_secs_f64()
        );
    }

    println!("{}", "=".repeat(60));

    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn print_result(result: &ScenarioResult) {
    match result {
        ScenarioResult::Pass { name, details } => {
            println!("  {} {} {}", "✓".green(), name, details.dimmed());
        }
        ScenarioResult::Fail { name, reason } => {
            println!("  {} {}", "✗".red(), name.red());
            println!("      {reason}");
        }
        ScenarioResult::Error { name, error } => {
            println!("  {} {} (error)", "✗".red(), name.red());
            println!("      {error}");
        }
        ScenarioResult::Skip { name, reason } => {
            println!("  {} {} ({})", "○".yellow(), name.dimmed(), reason.dimmed());
        }
    }
}
