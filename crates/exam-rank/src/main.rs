use std::path::PathBuf;

use anyhow::bail;
use clap::Parser;

use exam_rank::config::{RankConfig, ResolvedOutputs};
use exam_rank::loader::FileSource;
use exam_rank::logging::init_logging;
use exam_rank::pipeline::ExamPipeline;
use exam_rank::report::write_outputs;

/// Difficulty-weighted exam scorer and ranker.
#[derive(Debug, Parser)]
#[command(
    name = "exam-rank",
    author,
    version,
    about = "Scores exam responses across a worker group and publishes ranked lists"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "exam.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the number of workers in the group.
    #[arg(short, long, value_name = "N")]
    workers: Option<usize>,

    /// Override the exam variant kept from the responses file.
    #[arg(long, value_name = "CODE")]
    variant: Option<u32>,

    /// Override the classification cutoff (top K).
    #[arg(long, value_name = "K")]
    cutoff: Option<usize>,

    /// Override the reassignment cut score.
    #[arg(long, value_name = "SCORE")]
    cut_score: Option<f64>,

    /// Exit after validating the configuration (nothing is scored).
    #[arg(long)]
    validate_only: bool,

    /// Echo the general ranking to stdout.
    #[arg(long)]
    print: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = RankConfig::from_path(&cli.config)?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }

    if let Some(workers) = cli.workers {
        config.workers = workers;
    }

    if let Some(variant) = cli.variant {
        config.exam.variant = variant;
    }

    if let Some(cutoff) = cli.cutoff {
        config.ranking.classification_cutoff = cutoff;
    }

    if let Some(cut_score) = cli.cut_score {
        config.ranking.reassignment_cut_score = cut_score;
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let run_id = config.run_id.clone();
    let variant = config.exam.variant;
    let workers = config.workers;

    println!(
        "Loaded configuration '{run_id}': variant {variant}, {} questions, {workers} worker{}",
        config.exam.questions,
        if workers == 1 { "" } else { "s" }
    );

    if cli.validate_only {
        println!("Validation-only mode: scoring skipped.");
        return Ok(());
    }

    let logging_guard = init_logging(&config.logging, &outputs)?;
    let pipeline = ExamPipeline::new(&config)?;
    let source = FileSource::new(&config.inputs.answer_key, &config.inputs.responses);
    let outcome = pipeline.run(&source)?;

    if cli.print {
        for entry in &outcome.standings.general {
            println!(
                "{} - Variant {} | {} | Score: {:.1}",
                entry.position, variant, entry.id, entry.score
            );
        }
    }

    let summary = write_outputs(&run_id, variant, pipeline.policy(), &outcome, &outputs);

    println!(
        "Ranking complete for '{run_id}': {} candidates, {} classified, {} eligible for reassignment",
        outcome.pool_size(),
        outcome.standings.classified.len(),
        outcome.standings.reassignment.len()
    );
    for written in &summary.lists {
        match &written.outcome {
            Ok(rows) => println!(
                "{} list: {} ({rows} rows)",
                written.artifact,
                written.path.display()
            ),
            Err(err) => eprintln!("ERROR: {err}"),
        }
    }
    for result in [&summary.summary_md, &summary.summary_json] {
        match result {
            Ok(path) => println!("Summary: {}", path.display()),
            Err(err) => eprintln!("ERROR: {err}"),
        }
    }
    if let Some(plot_path) = summary.plot_path.as_ref() {
        println!("Point value plot: {}", plot_path.display());
    }
    if let Some(telemetry_path) = logging_guard.telemetry_path.as_ref() {
        println!("Telemetry log: {}", telemetry_path.display());
    }

    let failures = summary.failures();
    if failures > 0 {
        bail!("{failures} output artifact(s) could not be written");
    }
    Ok(())
}
