use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use boja_dataset::{
    validate_summary, BojaDataset, DatasetConfig, ValidationOutcome, ValidationThresholds,
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "inspect_dataset",
    about = "Filter a boja manifest, report rejected lines, and optionally dump one sample target"
)]
struct Args {
    /// TOML dataset config. Defaults to $BOJA_DATASET_CONFIG or ./boja-dataset.toml
    /// when no directory flags are given.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Image directory (overrides the config).
    #[arg(long)]
    images: Option<PathBuf>,
    /// Annotation directory (overrides the config).
    #[arg(long)]
    annotations: Option<PathBuf>,
    /// Manifest file (overrides the config).
    #[arg(long)]
    manifest: Option<PathBuf>,
    /// Label vocabulary in id order; repeat the flag per label (overrides the config).
    #[arg(long = "label")]
    labels: Vec<String>,
    /// Use the training pipeline (random horizontal flip).
    #[arg(long, default_value_t = false)]
    training: bool,
    /// Use the evaluation pipeline even when the config sets `training = true`.
    #[arg(long, default_value_t = false, conflicts_with = "training")]
    eval: bool,
    /// Seed for reproducible augmentation.
    #[arg(long)]
    seed: Option<u64>,
    /// Load this sample index and print its target as JSON.
    #[arg(long)]
    sample: Option<usize>,
    /// Exit non-zero when the validation report fails its thresholds.
    #[arg(long, default_value_t = false)]
    strict: bool,
}

fn resolve_config(args: &Args) -> Result<DatasetConfig> {
    let flags_only = args.images.is_some()
        && args.annotations.is_some()
        && args.manifest.is_some()
        && !args.labels.is_empty();
    let mut cfg = match &args.config {
        Some(path) => DatasetConfig::from_path(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None if flags_only => DatasetConfig::default(),
        None => DatasetConfig::load().context("load dataset config")?,
    };
    if let Some(p) = &args.images {
        cfg.image_dir = p.clone();
    }
    if let Some(p) = &args.annotations {
        cfg.annotation_dir = p.clone();
    }
    if let Some(p) = &args.manifest {
        cfg.manifest_path = p.clone();
    }
    if !args.labels.is_empty() {
        cfg.labels = args.labels.clone();
    }
    if args.training {
        cfg.training = true;
    } else if args.eval {
        cfg.training = false;
    }
    if args.seed.is_some() {
        cfg.seed = args.seed;
    }
    Ok(cfg)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let cfg = resolve_config(&args)?;
    let dataset = BojaDataset::new(&cfg).context("build dataset")?;

    let report = validate_summary(*dataset.summary(), &ValidationThresholds::from_env());
    for reason in &report.reasons {
        tracing::warn!(outcome = %report.outcome, "{reason}");
    }
    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(idx) = args.sample {
        let sample = dataset
            .get_item(idx)
            .with_context(|| format!("load sample {idx}"))?;
        tracing::info!(
            index = idx,
            image = %dataset.image_path(idx).map(|p| p.display().to_string()).unwrap_or_default(),
            shape = ?sample.image.shape(),
            "loaded sample"
        );
        println!("{}", serde_json::to_string_pretty(&sample.target)?);
    }

    if args.strict && report.outcome == ValidationOutcome::Fail {
        bail!("manifest validation failed: {}", report.reasons.join("; "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_training(dir: &std::path::Path) -> anyhow::Result<PathBuf> {
        let path = dir.join("boja-dataset.toml");
        std::fs::write(&path, "labels = [\"apple\"]\ntraining = true\n")?;
        Ok(path)
    }

    fn resolve(argv: &[&str]) -> Result<DatasetConfig> {
        resolve_config(&Args::try_parse_from(argv.iter().copied())?)
    }

    #[test]
    fn eval_flag_overrides_training_config() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = config_with_training(tmp.path())?;
        let path = path.to_str().context("utf-8 path")?;

        assert!(resolve(&["inspect_dataset", "--config", path])?.training);
        assert!(!resolve(&["inspect_dataset", "--config", path, "--eval"])?.training);
        Ok(())
    }

    #[test]
    fn training_flag_enables_augmentation() -> Result<()> {
        let cfg = resolve(&[
            "inspect_dataset",
            "--images",
            "i",
            "--annotations",
            "a",
            "--manifest",
            "m.csv",
            "--label",
            "apple",
            "--training",
        ])?;
        assert!(cfg.training);
        Ok(())
    }

    #[test]
    fn training_and_eval_conflict() {
        assert!(Args::try_parse_from(["inspect_dataset", "--training", "--eval"]).is_err());
    }
}
