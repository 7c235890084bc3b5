use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "lone workspace automation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the singleton benchmarks and write a comparison report
    Bench {
        /// Run quickly (lower sample size/time)
        #[arg(long, default_value_t = false)]
        quick: bool,

        /// Generate report only (skip running benchmarks)
        #[arg(long, default_value_t = false)]
        report_only: bool,
    },
    /// Run the loom models of the double-checked publish
    Loom,
}

const BENCH: &str = "singleton_benchmark";
const BASELINE: &str = "std_once_lock";
const REPORT_PATH: &str = "benchmark_results/report.md";

/// `<group>/<function>/new/estimates.json`, as written by criterion.
#[derive(Deserialize)]
struct Estimates {
    mean: Estimate,
}

#[derive(Deserialize)]
struct Estimate {
    point_estimate: f64,
}

/// `<group>/<function>/new/benchmark.json`; only the throughput is read.
#[derive(Deserialize)]
struct BenchmarkMeta {
    #[serde(default)]
    throughput: Option<serde_json::Value>,
}

/// Mean time per iteration and per element, for one benchmark function.
struct Measurement {
    ns_per_iter: f64,
    ns_per_element: f64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Bench { quick, report_only } => {
            if !report_only {
                run_benchmarks(quick)?;
            }
            generate_report()?;
        }
        Commands::Loom => run_loom()?,
    }

    Ok(())
}

fn run_benchmarks(quick: bool) -> Result<()> {
    println!(">>> Running {BENCH}...");
    let start = Instant::now();

    let mut cmd = Command::new("cargo");
    cmd.arg("bench").arg("--bench").arg(BENCH);

    // Args for the test runner (Criterion) go after --
    cmd.arg("--");
    if quick {
        cmd.arg("--measurement-time").arg("0.5");
        cmd.arg("--noplot");
        cmd.arg("--sample-size").arg("10");
    }

    let status = cmd.status().context("Failed to spawn cargo bench")?;
    if !status.success() {
        anyhow::bail!("Benchmark {BENCH} failed");
    }

    println!("Finished in {:.2?}", start.elapsed());
    Ok(())
}

fn run_loom() -> Result<()> {
    println!(">>> Running loom models...");
    let status = Command::new("cargo")
        .env("RUSTFLAGS", "--cfg loom")
        .args(["test", "--release", "--test", "loom_lazy_singleton"])
        .status()
        .context("Failed to spawn cargo test")?;
    if !status.success() {
        anyhow::bail!("Loom models failed");
    }
    Ok(())
}

fn generate_report() -> Result<()> {
    println!("\n>>> Generating Report...");

    let criterion_dir = Path::new("target/criterion");
    if !criterion_dir.exists() {
        eprintln!("No criterion output found at {}", criterion_dir.display());
        return Ok(());
    }

    let results = collect_results(criterion_dir)?;

    let report_path = Path::new(REPORT_PATH);
    if let Some(parent) = report_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let mut file = fs::File::create(report_path)
        .with_context(|| format!("Failed to create {}", report_path.display()))?;

    writeln!(file, "# Singleton Benchmark Report")?;

    for (group, functions) in &results {
        writeln!(file, "\n## {group}\n")?;
        writeln!(file, "| Implementation | ns/iter | ns/caller | vs {BASELINE} |")?;
        writeln!(file, "|---|---|---|---|")?;

        let baseline = functions.get(BASELINE).map(|m| m.ns_per_iter);
        for (function, m) in functions {
            let relative = match baseline {
                Some(base) if m.ns_per_iter > 0.0 => format!("**{:.2}x**", base / m.ns_per_iter),
                _ => "-".to_owned(),
            };
            writeln!(
                file,
                "| {function} | {:.2} | {:.2} | {relative} |",
                m.ns_per_iter, m.ns_per_element
            )?;
        }
    }

    println!("Report written to {}", report_path.display());
    Ok(())
}

fn collect_results(
    criterion_dir: &Path,
) -> Result<BTreeMap<String, BTreeMap<String, Measurement>>> {
    let mut results: BTreeMap<String, BTreeMap<String, Measurement>> = BTreeMap::new();

    for group in fs::read_dir(criterion_dir)?.flatten() {
        let group_path = group.path();
        let group_name = group.file_name().to_string_lossy().into_owned();
        // Filter out 'report' directory or others
        if !group_path.is_dir() || group_name == "report" {
            continue;
        }

        for function in fs::read_dir(&group_path)?.flatten() {
            let function_name = function.file_name().to_string_lossy().into_owned();
            if function_name == "report" {
                continue;
            }

            let run_dir = function.path().join("new");
            let Some(measurement) = read_measurement(&run_dir)? else {
                continue;
            };
            results
                .entry(group_name.clone())
                .or_default()
                .insert(function_name, measurement);
        }
    }

    Ok(results)
}

fn read_measurement(run_dir: &Path) -> Result<Option<Measurement>> {
    let estimates_path = run_dir.join("estimates.json");
    if !estimates_path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&estimates_path)
        .with_context(|| format!("Failed to read {}", estimates_path.display()))?;
    let estimates: Estimates = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", estimates_path.display()))?;

    let mut elements = 1.0;
    if let Ok(content) = fs::read_to_string(run_dir.join("benchmark.json")) {
        if let Ok(meta) = serde_json::from_str::<BenchmarkMeta>(&content) {
            if let Some(n) = meta
                .throughput
                .as_ref()
                .and_then(|t| t.get("Elements"))
                .and_then(serde_json::Value::as_f64)
            {
                elements = n;
            }
        }
    }

    let ns_per_iter = estimates.mean.point_estimate;
    Ok(Some(Measurement {
        ns_per_iter,
        ns_per_element: ns_per_iter / elements,
    }))
}
