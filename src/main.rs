use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueHint};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use trail_effort::{
    analyze_folder, classify, read_trails_csv, write_classified_csv, write_trails_csv,
    BatchOutcome, ClassificationReport, FeatureSet, PipelineConfig,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Hiking trail effort metrics and difficulty classes from GPX", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    options: PipelineOptions,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze every GPX file in a folder and write the trail table
    Analyze {
        #[arg(value_hint = ValueHint::DirPath)]
        folder: PathBuf,
        #[arg(short, long, default_value = "analise_trilhas.csv", value_hint = ValueHint::FilePath)]
        output: PathBuf,
    },
    /// Classify the trails of a previously written trail table
    Classify {
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
        #[arg(short, long, default_value = "trilhas_classificadas.csv", value_hint = ValueHint::FilePath)]
        output: PathBuf,
    },
    /// Analyze a folder and classify it in one go
    Run {
        #[arg(value_hint = ValueHint::DirPath)]
        folder: PathBuf,
        #[arg(short, long, default_value = "trilhas_classificadas.csv", value_hint = ValueHint::FilePath)]
        output: PathBuf,
        /// Also write the unclassified trail table here
        #[arg(long, value_hint = ValueHint::FilePath)]
        trails_output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct PipelineOptions {
    /// JSON file with analysis/classifier settings
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Worker threads for GPX analysis
    #[arg(long, global = true)]
    workers: Option<usize>,

    /// Number of difficulty classes (3, 4 or 5)
    #[arg(short = 'k', long, global = true)]
    clusters: Option<usize>,

    /// K-Means random seed
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Feature set: per_km, multi_day or intensity
    #[arg(long, global = true)]
    features: Option<FeatureSet>,
}

impl PipelineOptions {
    fn load(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => PipelineConfig::default(),
        };

        if let Some(workers) = self.workers {
            config.analysis.workers = workers;
        }
        if let Some(clusters) = self.clusters {
            config.classifier.clusters = clusters;
        }
        if let Some(seed) = self.seed {
            config.classifier.seed = seed;
        }
        if let Some(features) = self.features {
            config.classifier.features = features;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = cli.options.load()?;

    match cli.command {
        Command::Analyze { folder, output } => {
            let outcome = run_analysis(&folder, &config)?;
            write_trails_csv(&output, &outcome.batch)
                .with_context(|| format!("writing {}", output.display()))?;
        }
        Command::Classify { input, output } => {
            let batch = read_trails_csv(&input).with_context(|| format!("reading {}", input.display()))?;
            let report = classify(&batch, &config.classifier)?;
            finish_classification(&report, &output)?;
        }
        Command::Run {
            folder,
            output,
            trails_output,
        } => {
            let outcome = run_analysis(&folder, &config)?;
            if let Some(path) = trails_output {
                write_trails_csv(&path, &outcome.batch)
                    .with_context(|| format!("writing {}", path.display()))?;
            }
            let report = classify(&outcome.batch, &config.classifier)?;
            finish_classification(&report, &output)?;
        }
    }

    Ok(())
}

fn run_analysis(folder: &Path, config: &PipelineConfig) -> Result<BatchOutcome> {
    let outcome = analyze_folder(folder, &config.analysis)
        .with_context(|| format!("analyzing {}", folder.display()))?;

    for failure in &outcome.failures {
        warn!("Skipped {}: {}", failure.path.display(), failure.reason);
    }
    Ok(outcome)
}

fn finish_classification(report: &ClassificationReport, output: &Path) -> Result<()> {
    write_classified_csv(output, report).with_context(|| format!("writing {}", output.display()))?;

    let unclassified = report.trails.iter().filter(|t| t.assignment.is_none()).count();
    for summary in &report.clusters {
        info!("{}: {} trails", summary.difficulty, summary.size);
    }
    if unclassified > 0 {
        info!("Unclassified: {} trails", unclassified);
    }
    Ok(())
}
