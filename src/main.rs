use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use prognos_chain::{ChainConfig, ModelBundle, StageTrainingSummary, TierThresholds, train_chain};
use prognos_cost::{CostModel, CostModelConfig};
use prognos_forest::{MaxFeatures, RandomForestConfig, SplitMethod};
use prognos_io::{
    CostReader, DatasetReader, ExperimentName, PatientEncoding, PatientOutcome, PatientReader,
    ResultWriter, score_patients,
};

#[derive(Parser)]
#[command(name = "prognos")]
#[command(about = "Classifier-chain patient risk stratification with preventive-care cost estimates")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Shared random forest parameters.
#[derive(Args, Debug, Clone)]
struct ForestArgs {
    /// Number of trees per forest
    #[arg(long, default_value_t = 100)]
    n_trees: usize,

    /// Maximum tree depth (unlimited if not set)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Minimum samples per leaf
    #[arg(long, default_value_t = 1)]
    min_samples_leaf: usize,

    /// Split-finding strategy: "exact" or "extra-trees"
    #[arg(long, default_value = "exact")]
    split_method: String,
}

#[derive(Subcommand)]
enum Command {
    /// Train one classifier per outcome column as a chain
    TrainChain {
        /// Path to the multilabel training CSV
        #[arg(long)]
        data: PathBuf,

        /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Identifier column
        #[arg(long, default_value = "DESYNPUF_ID")]
        id_column: String,

        /// Prefix marking outcome columns
        #[arg(long, default_value = "HAD_")]
        target_prefix: String,

        /// Features considered per split: "sqrt", "log2", or "all"
        #[arg(long, default_value = "sqrt")]
        max_features: String,

        #[command(flatten)]
        forest: ForestArgs,
    },

    /// Train the proactive and reactive cost regressors
    TrainCost {
        /// Path to the age,condition,proactive_cost,reactive_cost CSV
        #[arg(long)]
        data: PathBuf,

        /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Share of rows held out to score the regressors before the final fit
        #[arg(long, default_value_t = 0.2)]
        holdout: f64,

        /// Skip the holdout evaluation
        #[arg(long, default_value_t = false)]
        no_holdout: bool,

        #[command(flatten)]
        forest: ForestArgs,
    },

    /// Stratify patients and, given a cost model, estimate savings
    Predict {
        /// Path to the trained chain binary
        #[arg(long)]
        chain_model: PathBuf,

        /// Path to the trained cost model binary
        #[arg(long)]
        cost_model: Option<PathBuf>,

        /// JSON file with one patient object or an array of them
        #[arg(long)]
        patients: PathBuf,

        /// Experiment name for output files
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Number of key risk factors reported per condition
        #[arg(long, default_value_t = 3)]
        top_k: usize,

        /// Lower bound of the low-risk tier
        #[arg(long, default_value_t = 0.25)]
        low: f64,

        /// Lower bound of the moderate-risk tier
        #[arg(long, default_value_t = 0.5)]
        moderate: f64,

        /// Lower bound of the high-risk tier
        #[arg(long, default_value_t = 0.75)]
        high: f64,
    },
}

// --- JSON output structs ---

#[derive(Serialize)]
struct ChainTrainingArtifact<'a> {
    experiment: &'a str,
    n_patients: usize,
    n_features: usize,
    n_trees: usize,
    stages: &'a [StageTrainingSummary],
}

#[derive(Serialize)]
struct TrainChainOutput {
    experiment: String,
    n_patients: usize,
    n_features: usize,
    targets: Vec<String>,
    model_path: PathBuf,
}

#[derive(Serialize)]
struct TrainCostOutput {
    experiment: String,
    n_observations: usize,
    n_conditions: usize,
    holdout_proactive_r2: Option<f64>,
    holdout_reactive_r2: Option<f64>,
    model_path: PathBuf,
}

#[derive(Serialize)]
struct PredictOutput {
    experiment: String,
    n_patients: usize,
    n_failed: usize,
    n_targets: usize,
    total_potential_savings: Option<f64>,
}

fn parse_split_method(s: &str) -> Result<SplitMethod> {
    match s {
        "exact" => Ok(SplitMethod::Exact),
        "extra-trees" => Ok(SplitMethod::ExtraTrees),
        other => anyhow::bail!("unknown split method: {other} (expected exact or extra-trees)"),
    }
}

fn parse_max_features(s: &str) -> Result<MaxFeatures> {
    match s {
        "sqrt" => Ok(MaxFeatures::Sqrt),
        "log2" => Ok(MaxFeatures::Log2),
        "all" => Ok(MaxFeatures::All),
        other => anyhow::bail!("unknown max features: {other} (expected sqrt, log2, or all)"),
    }
}

fn forest_config(args: &ForestArgs, max_features: MaxFeatures, seed: u64) -> Result<RandomForestConfig> {
    Ok(RandomForestConfig::new(args.n_trees)?
        .with_max_features(max_features)
        .with_max_depth(args.max_depth)
        .with_min_samples_leaf(args.min_samples_leaf)
        .with_split_method(parse_split_method(&args.split_method)?)
        .with_seed(seed))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::TrainChain {
            data,
            experiment,
            output_dir,
            id_column,
            target_prefix,
            max_features,
            forest,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;

            // 1. Read the multilabel table
            let dataset = DatasetReader::new(&data)
                .with_id_column(id_column)
                .with_target_prefix(target_prefix)
                .read()
                .context("failed to read training CSV")?;

            // 2. Fit one forest per target in column order
            let rf_config = forest_config(&forest, parse_max_features(&max_features)?, cli.seed)?;
            let trained = train_chain(
                dataset.schema(),
                dataset.features(),
                dataset.targets(),
                &rf_config,
            )
            .context("chain training failed")?;

            // 3. Save the chain and its training summary
            let writer = ResultWriter::new(&output_dir, experiment_name)?;
            let model_path = writer.chain_model_path();
            trained
                .artifact
                .save(&model_path)
                .context("failed to save chain model")?;
            info!(path = %model_path.display(), "chain model saved");

            writer.write_json(
                "chain_training",
                &ChainTrainingArtifact {
                    experiment: &experiment,
                    n_patients: dataset.n_samples(),
                    n_features: dataset.n_features(),
                    n_trees: forest.n_trees,
                    stages: &trained.summaries,
                },
            )?;

            let output = TrainChainOutput {
                experiment,
                n_patients: dataset.n_samples(),
                n_features: dataset.n_features(),
                targets: trained.summaries.iter().map(|s| s.target.clone()).collect(),
                model_path,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::TrainCost {
            data,
            experiment,
            output_dir,
            holdout,
            no_holdout,
            forest,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;

            // 1. Read observations
            let observations = CostReader::new(&data)
                .read()
                .context("failed to read cost CSV")?;

            // 2. Evaluate on a holdout, then fit on everything
            let config = CostModelConfig::new(forest_config(&forest, MaxFeatures::All, cli.seed)?)
                .with_holdout_fraction((!no_holdout).then_some(holdout))
                .with_seed(cli.seed);
            let (model, report) =
                CostModel::train(&observations, &config).context("cost model training failed")?;

            // 3. Save the model and its report
            let writer = ResultWriter::new(&output_dir, experiment_name)?;
            let model_path = writer.cost_model_path();
            model.save(&model_path).context("failed to save cost model")?;
            info!(path = %model_path.display(), "cost model saved");
            writer.write_json("cost_training", &report)?;

            let output = TrainCostOutput {
                experiment,
                n_observations: report.n_observations,
                n_conditions: model.schema().conditions().len(),
                holdout_proactive_r2: report.holdout.map(|h| h.proactive.r2),
                holdout_reactive_r2: report.holdout.map(|h| h.reactive.r2),
                model_path,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Predict {
            chain_model,
            cost_model,
            patients,
            experiment,
            output_dir,
            top_k,
            low,
            moderate,
            high,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;

            // 1. Load models; any failure here stops before scoring anyone
            let config = ChainConfig::new()
                .with_top_k(top_k)
                .with_thresholds(TierThresholds::new(low, moderate, high)?);
            let bundle =
                ModelBundle::load(&chain_model, config).context("failed to load chain model")?;
            let cost_model = cost_model
                .map(|path| CostModel::load(&path).context("failed to load cost model"))
                .transpose()?;

            // 2. Read raw patient records
            let records = PatientReader::new(&patients)
                .read()
                .context("failed to read patients JSON")?;

            // 3. Score patients in parallel; failures stay per patient
            let encoding = PatientEncoding::default();
            let outcomes = score_patients(&records, &encoding, &bundle, cost_model.as_ref());

            let n_failed = outcomes.iter().filter(|o| o.is_failed()).count();
            let total_potential_savings = cost_model.as_ref().map(|_| {
                outcomes
                    .iter()
                    .filter_map(PatientOutcome::potential_savings)
                    .sum::<f64>()
            });
            info!(n_patients = outcomes.len(), n_failed, "patients scored");

            // 4. Write predictions
            let writer = ResultWriter::new(&output_dir, experiment_name)?;
            writer.write_json("predictions", &outcomes)?;

            let output = PredictOutput {
                experiment,
                n_patients: outcomes.len(),
                n_failed,
                n_targets: bundle.chain().targets().count(),
                total_potential_savings,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
