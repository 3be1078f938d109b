use image_classifier::{Classification, Classifier, ClassifierError, ModelManager, RuntimeConfig};
use image_classifier::model_manager::ensure_file_hash;
use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::{error, info};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// `path,rank,label,confidence` per line
    Csv,
    /// One JSON object per image
    Json,
}

#[derive(Parser)]
#[command(author, version, about = "Classify images with a pretrained model", long_about = None)]
struct Args {
    /// Image files to classify
    images: Vec<PathBuf>,

    /// Model file (.onnx or .ort); overrides --model-dir/--name
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Label dictionary, one class per line; overrides --model-dir/--name
    #[arg(short, long)]
    labels: Option<PathBuf>,

    /// Directory holding named models (defaults to the user cache directory)
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Name of the model directory to use under --model-dir
    #[arg(short, long, default_value = "default")]
    name: String,

    /// Drop results from the first one below this confidence
    #[arg(long, default_value_t = 0.01)]
    min_confidence: f32,

    /// Keep every class regardless of confidence
    #[arg(long, conflicts_with = "min_confidence")]
    all: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,

    /// Print the sorted class names and exit
    #[arg(long)]
    list_classes: bool,

    /// Expected SHA-256 of the model file, checked before loading
    #[arg(long)]
    sha256: Option<String>,

    /// Intra-op threads for the runtime (0 lets it decide)
    #[arg(long, default_value_t = 0)]
    threads: usize,
}

#[derive(Serialize)]
struct ImageReport<'a> {
    path: String,
    classifications: &'a [Classification],
}

fn resolve_paths(args: &Args) -> Result<(PathBuf, PathBuf)> {
    if let (Some(model), Some(labels)) = (&args.model, &args.labels) {
        return Ok((model.clone(), labels.clone()));
    }

    let manager = match &args.model_dir {
        Some(dir) => ModelManager::new(dir),
        None => ModelManager::new_default(),
    }
    .context("Failed to open models directory")?;
    info!("Using models directory {:?}", manager.models_dir());

    let model = args.model.clone().unwrap_or_else(|| manager.get_model_path(&args.name));
    let labels = args.labels.clone().unwrap_or_else(|| manager.get_labels_path(&args.name));
    Ok((model, labels))
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let (model_path, label_path) = resolve_paths(&args)?;
    if let Some(expected) = &args.sha256 {
        ensure_file_hash(&model_path, expected, "model")?;
        info!("Model file hash verified");
    }

    let start_time = Instant::now();
    info!("Loading classifier from {:?} and {:?}", model_path, label_path);
    let classifier = Classifier::builder()
        .with_runtime_config(RuntimeConfig::with_threads(args.threads))
        .with_model(&model_path)?
        .with_labels(&label_path)?
        .build()?;
    info!("Classifier loaded (took {:.2?}): {:?}", start_time.elapsed(), classifier.info());

    if args.list_classes {
        for label in classifier.labels().sorted() {
            println!("{}", label);
        }
        return Ok(());
    }

    if args.images.is_empty() {
        bail!("No images given");
    }

    let min_confidence = if args.all { None } else { Some(args.min_confidence) };
    let classify_start = Instant::now();
    let mut failures = 0usize;

    for path in &args.images {
        match classifier.classify_file(path, min_confidence) {
            Ok(results) => print_results(path, &results, args.format)?,
            Err(e @ ClassifierError::ImageDecodeError(_)) => {
                error!("Skipping {}: {}", path.display(), e);
                eprintln!("{}: {}", path.display(), e);
                failures += 1;
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("Failed to classify {}", path.display())));
            }
        }
    }

    info!(
        "Classified {} images in {:.2?} ({} failed)",
        args.images.len(),
        classify_start.elapsed(),
        failures
    );

    if failures > 0 {
        bail!("{} of {} images could not be classified", failures, args.images.len());
    }
    Ok(())
}

fn print_results(
    path: &std::path::Path,
    results: &[Classification],
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Csv => {
            for (rank, result) in results.iter().enumerate() {
                println!(
                    "{},{},{},{}",
                    path.display(),
                    rank + 1,
                    result.label,
                    result.formatted_confidence()
                );
            }
        }
        OutputFormat::Json => {
            let report = ImageReport {
                path: path.display().to_string(),
                classifications: results,
            };
            println!("{}", serde_json::to_string(&report)?);
        }
    }
    Ok(())
}
