//! Lead scoring CLI
//!
//! Trains and compiles models, scores leads against a compiled artifact
//! (falling back to rules when it is unusable), explains predictions of a
//! fitted model, and records sales feedback.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use leadscore_core::{
    FeedbackRecord, FeedbackSink, JsonLinesFeedbackSink, LeadAssessment, RawLead, ScoringConfig,
    ScoringEngine,
};
use leadscore_trainer::{
    train_from_csv, FittedModel, ForestConfig, MaxFeatures, TrainingOptions, TreeConfig,
};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "leadscore")]
#[command(author = "LeadScore Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Lead scoring model trainer and portable scorer", long_about = None)]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train a forest from a CSV export and compile it
    Train(TrainArgs),
    /// Score leads with a compiled artifact, or the fallback rules
    Score(ScoreArgs),
    /// Explain a lead's score exactly from a fitted model
    Explain(ExplainArgs),
    /// Append a feedback record to a JSON-lines file
    Feedback(FeedbackArgs),
}

#[derive(Args, Debug)]
struct TrainArgs {
    /// Input CSV dataset path (header row, `Converted` target column)
    #[arg(short, long)]
    input: PathBuf,

    /// Output directory for artifact, hash, fitted model and report
    #[arg(short, long, default_value = "models/lead_scoring")]
    output: PathBuf,

    /// Number of trees
    #[arg(long, default_value = "100")]
    trees: usize,

    /// Maximum tree depth (unlimited when omitted)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Minimum samples required to split a node
    #[arg(long, default_value = "2")]
    min_samples_split: usize,

    /// Minimum samples per leaf
    #[arg(long, default_value = "1")]
    min_samples_leaf: usize,

    /// Features considered per split: all, sqrt, log2 or a count
    #[arg(long, default_value = "sqrt")]
    max_features: MaxFeatures,

    /// Random seed for shuffling, splitting and tree fitting
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Share of rows held out for testing
    #[arg(long, default_value = "0.2")]
    test_fraction: f64,

    /// Cross-validation folds (0 disables)
    #[arg(long, default_value = "5")]
    cv_folds: usize,

    /// Skip dataset shuffling
    #[arg(long)]
    no_shuffle: bool,

    /// Fit trees on a single thread
    #[arg(long)]
    sequential: bool,
}

#[derive(Args, Debug)]
struct ScoreArgs {
    /// JSON file holding one lead object or an array of leads
    #[arg(short, long)]
    lead: PathBuf,

    /// Compiled artifact; overrides the configuration file
    #[arg(short, long)]
    artifact: Option<PathBuf>,

    /// Scoring configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Include intent tier, insights and recommended action
    #[arg(long)]
    assess: bool,
}

#[derive(Args, Debug)]
struct ExplainArgs {
    /// Fitted model written by `train`
    #[arg(short, long)]
    model: PathBuf,

    /// JSON file holding one lead object
    #[arg(short, long)]
    lead: PathBuf,

    /// Number of features to report; defaults to `explanation.top_k`
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Scoring configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct FeedbackArgs {
    /// JSON-lines file to append to
    #[arg(short, long, default_value = "feedback.jsonl")]
    sink: PathBuf,

    /// Feedback payload as a JSON object
    payload: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging; RUST_LOG takes precedence over the verbosity flag
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    match cli.command {
        Command::Train(args) => train(args),
        Command::Score(args) => score(args),
        Command::Explain(args) => explain(args),
        Command::Feedback(args) => feedback(args),
    }
}

fn train(args: TrainArgs) -> Result<()> {
    info!("LeadScore trainer v{}", env!("CARGO_PKG_VERSION"));

    let options = TrainingOptions {
        forest: ForestConfig {
            n_trees: args.trees,
            tree: TreeConfig {
                max_depth: args.max_depth,
                min_samples_split: args.min_samples_split,
                min_samples_leaf: args.min_samples_leaf,
                max_features: args.max_features,
            },
            bootstrap: true,
            seed: args.seed,
            parallel: !args.sequential,
        },
        test_fraction: args.test_fraction,
        cv_folds: args.cv_folds,
        shuffle: !args.no_shuffle,
        ..TrainingOptions::default()
    };

    info!(input = %args.input.display(), "loading dataset");
    let outcome = train_from_csv(&args.input, &options).context("Training failed")?;

    std::fs::create_dir_all(&args.output).context("Failed to create output directory")?;

    let artifact_path = args.output.join("artifact.json");
    outcome
        .artifact
        .save_json(&artifact_path)
        .context("Failed to write artifact")?;

    let hash_path = args.output.join("artifact.hash");
    std::fs::write(&hash_path, &outcome.report.artifact_hash).context("Failed to write hash file")?;

    write_json(&args.output.join("fitted_model.json"), &outcome.model)?;
    write_json(&args.output.join("training_report.json"), &outcome.report)?;

    info!(
        artifact = %artifact_path.display(),
        hash = %outcome.report.artifact_hash,
        trees = outcome.artifact.tree_count(),
        train_accuracy = outcome.report.train_accuracy,
        test_accuracy = ?outcome.report.test_accuracy,
        "training completed"
    );
    for (rank, entry) in outcome.report.top_features.iter().enumerate() {
        info!("  {:2}. {}: {:.4}", rank + 1, entry.feature, entry.importance);
    }
    Ok(())
}

#[derive(Serialize)]
struct ScoredLead {
    #[serde(flatten)]
    result: leadscore_core::ExplanationResult,
    source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    assessment: Option<LeadAssessment>,
}

fn load_config(path: Option<&PathBuf>) -> Result<ScoringConfig> {
    match path {
        Some(path) => ScoringConfig::load(path)
            .with_context(|| format!("Failed to load configuration {}", path.display())),
        None => Ok(ScoringConfig::default()),
    }
}

fn score(args: ScoreArgs) -> Result<()> {
    let config = load_config(args.config.as_ref())?;

    let engine = match args.artifact.as_ref().or(config.artifact.path.as_ref()) {
        Some(path) => ScoringEngine::load(path),
        None => ScoringEngine::without_model(),
    };

    let leads = read_leads(&args.lead)?;
    let scored: Vec<ScoredLead> = leads
        .iter()
        .map(|lead| {
            let (result, source) = engine.score_with_source(lead);
            let assessment = args
                .assess
                .then(|| LeadAssessment::build(lead, &result, &config.tiers));
            ScoredLead {
                result,
                source: match source {
                    leadscore_core::ScoreSource::Model => "model",
                    leadscore_core::ScoreSource::Fallback => "fallback",
                },
                assessment,
            }
        })
        .collect();

    if scored.len() == 1 {
        println!("{}", serde_json::to_string_pretty(&scored[0])?);
    } else {
        println!("{}", serde_json::to_string_pretty(&scored)?);
    }
    Ok(())
}

fn explain(args: ExplainArgs) -> Result<()> {
    let text = std::fs::read_to_string(&args.model)
        .with_context(|| format!("Failed to read fitted model {}", args.model.display()))?;
    let model: FittedModel = serde_json::from_str(&text).context("Failed to parse fitted model")?;
    let top_k = match args.top_k {
        Some(k) => k,
        None => load_config(args.config.as_ref())?.explanation.top_k,
    };
    let explainer = model.explainer(top_k).context("Fitted model is malformed")?;

    let leads = read_leads(&args.lead)?;
    let [lead] = leads.as_slice() else {
        bail!("explain expects exactly one lead, got {}", leads.len());
    };

    println!("{}", serde_json::to_string_pretty(&explainer.explain(lead))?);
    Ok(())
}

fn feedback(args: FeedbackArgs) -> Result<()> {
    let payload: Value = serde_json::from_str(&args.payload).context("Feedback payload is not JSON")?;
    if !payload.is_object() {
        bail!("feedback payload must be a JSON object");
    }
    let sink = JsonLinesFeedbackSink::new(&args.sink);
    sink.record(&FeedbackRecord::now(payload))
        .context("Failed to record feedback")?;
    info!(sink = %sink.path().display(), "feedback recorded");
    Ok(())
}

fn read_leads(path: &Path) -> Result<Vec<RawLead>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read lead file {}", path.display()))?;
    let value: Value = serde_json::from_str(&text).context("Lead file is not valid JSON")?;
    Ok(match value {
        Value::Array(items) => items.into_iter().map(RawLead::from_value).collect(),
        other => vec![RawLead::from_value(other)],
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}
