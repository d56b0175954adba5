use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use globset::Glob;
use rayon::prelude::*;
use walkdir::WalkDir;

use sandscan_core::dataset;
use sandscan_core::engine::Analyzer;
use sandscan_core::features::{FeatureVector, FEATURE_NAMES};
use sandscan_core::report::{BatchEntry, BatchReport};
use sandscan_core::trace::{self, ExtractOptions};
use sandscan_core::train::{self, TrainOptions};

const MAX_TRACE_BYTES: u64 = 256 * 1024 * 1024;
const MAX_BATCH_FILES: usize = 100_000;
const MAX_WALK_DEPTH: usize = 10;

#[derive(Parser)]
#[command(name = "sandscan")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Train the trace classifier from a labelled counter dataset")]
    Train {
        #[arg(long)]
        dataset: PathBuf,
        #[arg(long, default_value = "model")]
        model_dir: PathBuf,
        #[arg(long, default_value_t = train::DEFAULT_TEST_RATIO)]
        test_ratio: f64,
        #[arg(long, default_value_t = train::DEFAULT_SEED)]
        seed: u64,
        #[arg(long)]
        json: bool,
    },
    #[command(about = "Scan execution traces and report a verdict for each")]
    Scan {
        #[arg(value_name = "TRACE", required_unless_present = "path")]
        trace: Option<PathBuf>,
        #[arg(long)]
        path: Option<PathBuf>,
        #[arg(long, default_value = "*.log")]
        glob: String,
        #[arg(long, default_value = "model")]
        model_dir: PathBuf,
        #[arg(long)]
        json: bool,
        #[arg(long, alias = "seq")]
        sequential: bool,
    },
    #[command(about = "Extract per-trace counters and features without classifying")]
    ExportFeatures {
        #[arg(value_name = "TRACE", required_unless_present = "path")]
        trace: Option<PathBuf>,
        #[arg(long)]
        path: Option<PathBuf>,
        #[arg(long, default_value = "*.log")]
        glob: String,
        #[arg(long, value_parser = ["benign", "malware"])]
        label: Option<String>,
        #[arg(long, default_value = "csv", value_parser = ["csv", "jsonl"])]
        format: String,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // reports go to stdout, so logging stays on stderr
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let args = Args::parse();
    match args.command {
        Command::Train {
            dataset,
            model_dir,
            test_ratio,
            seed,
            json,
        } => run_train(&dataset, &model_dir, test_ratio, seed, json),
        Command::Scan {
            trace,
            path,
            glob,
            model_dir,
            json,
            sequential,
        } => run_scan(
            trace.as_deref(),
            path.as_deref(),
            &glob,
            &model_dir,
            json,
            !sequential,
        ),
        Command::ExportFeatures {
            trace,
            path,
            glob,
            label,
            format,
            out,
        } => run_export_features(
            trace.as_deref(),
            path.as_deref(),
            &glob,
            label.as_deref(),
            &format,
            out.as_deref(),
        ),
    }
}

fn run_train(
    dataset_path: &Path,
    model_dir: &Path,
    test_ratio: f64,
    seed: u64,
    json: bool,
) -> Result<()> {
    let samples = dataset::load_csv(dataset_path)
        .with_context(|| format!("failed to load dataset {}", dataset_path.display()))?;
    let options = TrainOptions {
        test_ratio,
        seed,
        ..TrainOptions::default()
    };
    let outcome = train::train(&samples, &options)?;
    outcome
        .artifact
        .save(model_dir)
        .with_context(|| format!("failed to save model to {}", model_dir.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome.report)?);
        return Ok(());
    }
    let report = &outcome.report;
    println!(
        "trained on {} samples ({} train / {} test, ratio {}, seed {})",
        report.samples, report.train_size, report.test_size, report.test_ratio, report.seed
    );
    for candidate in &report.candidates {
        println!(
            "  candidate {:<19} accuracy {:.4}",
            candidate.kind.as_str(),
            candidate.accuracy
        );
    }
    println!(
        "selected {} (held-out accuracy {:.4})",
        report.winner.as_str(),
        report.accuracy
    );
    for class in &report.classes {
        println!(
            "  {:<8} precision {:.4} recall {:.4} f1 {:.4} support {}",
            class.label.as_str(),
            class.precision,
            class.recall,
            class.f1,
            class.support
        );
    }
    println!("model written to {}", model_dir.display());
    Ok(())
}

fn run_scan(
    trace_path: Option<&Path>,
    dir: Option<&Path>,
    glob: &str,
    model_dir: &Path,
    json: bool,
    parallel: bool,
) -> Result<()> {
    if trace_path.is_some() && dir.is_some() {
        return Err(anyhow!("provide either a trace path or --path, not both"));
    }
    let analyzer = Analyzer::load(model_dir)
        .with_context(|| format!("failed to load model from {}", model_dir.display()))?;
    match (trace_path, dir) {
        (Some(trace_path), _) => {
            check_trace_size(trace_path)?;
            let report = analyzer.analyze_path(trace_path, ExtractOptions { parallel })?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                report.print_human();
            }
            Ok(())
        }
        (None, Some(dir)) => run_scan_batch(&analyzer, dir, glob, json, parallel),
        (None, None) => Err(anyhow!("provide a trace path or --path")),
    }
}

fn run_scan_batch(
    analyzer: &Analyzer,
    dir: &Path,
    glob: &str,
    json: bool,
    parallel: bool,
) -> Result<()> {
    let paths = collect_traces(dir, glob)?;
    let scan_one = |path: &PathBuf| -> BatchEntry {
        let result = check_trace_size(path)
            .and_then(|_| analyzer.analyze_path(path, ExtractOptions::default()));
        match result {
            Ok(report) => BatchEntry::scanned(&report),
            Err(err) => BatchEntry::failed(path, format!("{:#}", err)),
        }
    };
    let thread_count = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let use_parallel = parallel && thread_count > 1 && paths.len() > 1;
    let entries: Vec<BatchEntry> = if use_parallel {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(thread_count)
            .build()
        {
            Ok(pool) => pool.install(|| paths.par_iter().map(scan_one).collect()),
            Err(err) => {
                eprintln!(
                    "failed to build batch worker pool; falling back to sequential ({})",
                    err
                );
                paths.iter().map(scan_one).collect()
            }
        }
    } else {
        paths.iter().map(scan_one).collect()
    };

    let batch = BatchReport::from_entries(entries);
    if json {
        println!("{}", serde_json::to_string_pretty(&batch)?);
        return Ok(());
    }
    batch.print_human();
    Ok(())
}

fn run_export_features(
    trace_path: Option<&Path>,
    dir: Option<&Path>,
    glob: &str,
    label: Option<&str>,
    format: &str,
    out: Option<&Path>,
) -> Result<()> {
    let paths = match (trace_path, dir) {
        (Some(_), Some(_)) => {
            return Err(anyhow!("provide either a trace path or --path, not both"))
        }
        (None, None) => return Err(anyhow!("provide a trace path or --path")),
        (Some(trace_path), None) => vec![trace_path.to_path_buf()],
        (None, Some(dir)) => collect_traces(dir, glob)?,
    };

    let mut writer: Box<dyn Write> = if let Some(path) = out {
        Box::new(
            fs::File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?,
        )
    } else {
        Box::new(std::io::stdout())
    };

    if format == "csv" {
        let mut header = String::from("path,label");
        for name in dataset::COUNTER_COLUMNS {
            header.push(',');
            header.push_str(name);
        }
        for name in FEATURE_NAMES {
            header.push(',');
            header.push_str(name);
        }
        header.push('\n');
        writer.write_all(header.as_bytes())?;
    }

    for path in paths {
        check_trace_size(&path)?;
        let summary = trace::summarize_path(&path, ExtractOptions::default())
            .with_context(|| format!("failed to read trace {}", path.display()))?;
        let features = FeatureVector::from_counters(&summary.counters);
        match format {
            "jsonl" => {
                let record = serde_json::json!({
                    "path": path.display().to_string(),
                    "label": label,
                    "counters": summary.counters,
                    "features": features,
                    "indicators": summary.indicators,
                });
                writer.write_all(serde_json::to_string(&record)?.as_bytes())?;
                writer.write_all(b"\n")?;
            }
            "csv" => {
                let mut row = String::new();
                row.push_str(&path.display().to_string());
                row.push(',');
                row.push_str(label.unwrap_or(""));
                for value in dataset::counter_values(&summary.counters) {
                    row.push(',');
                    row.push_str(&value.to_string());
                }
                for value in features.as_vec() {
                    row.push(',');
                    row.push_str(&format!("{:.6}", value));
                }
                row.push('\n');
                writer.write_all(row.as_bytes())?;
            }
            _ => return Err(anyhow!("unsupported format: {}", format)),
        }
    }
    Ok(())
}

fn collect_traces(dir: &Path, glob: &str) -> Result<Vec<PathBuf>> {
    let matcher = Glob::new(glob)
        .with_context(|| format!("invalid glob pattern {}", glob))?
        .compile_matcher();
    let root = if dir.is_file() {
        dir.parent().unwrap_or(dir)
    } else {
        dir
    };
    let mut paths = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(false)
        .max_depth(MAX_WALK_DEPTH)
        .into_iter()
        .filter_map(std::result::Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if !matcher.is_match(path) {
            continue;
        }
        paths.push(path.to_path_buf());
        if paths.len() > MAX_BATCH_FILES {
            return Err(anyhow!(
                "batch file count exceeds limit ({})",
                MAX_BATCH_FILES
            ));
        }
    }
    if paths.is_empty() {
        return Err(anyhow!("no files matched {} in {}", glob, dir.display()));
    }
    paths.sort();
    Ok(paths)
}

fn check_trace_size(path: &Path) -> Result<()> {
    let meta = fs::metadata(path)
        .with_context(|| format!("failed to stat trace {}", path.display()))?;
    if meta.len() > MAX_TRACE_BYTES {
        return Err(anyhow!(
            "trace {} is {} bytes, over the {} byte limit",
            path.display(),
            meta.len(),
            MAX_TRACE_BYTES
        ));
    }
    Ok(())
}
