//! vision_cnn CLI
//!
//! Entry point for training, evaluating and running the bird / not-bird and
//! crop classifiers.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use burn::data::dataset::Dataset;
use burn::module::{AutodiffModule, Module};
use burn::tensor::{ElementConversion, Tensor};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{info, warn};

use vision_cnn::backend::{backend_name, default_device, DefaultBackend, TrainingBackend};
use vision_cnn::dataset::archive::POSITIVE_LABEL;
use vision_cnn::dataset::{load_splits, ImageFolder};
use vision_cnn::inference::{ConfidenceLevel, PredictionResult, Predictor, DEFAULT_TOP_K};
use vision_cnn::model::{ClassifierCnn, PipelineConfig, Task};
use vision_cnn::training::checkpoint::metadata_path_for;
use vision_cnn::training::{
    evaluate, load_model, write_class_list, CheckpointManager, CheckpointMetadata, Evaluation,
    Trainer, TrainingHistory, DEFAULT_BINARY_THRESHOLD,
};
use vision_cnn::utils::charts::{plot_combined_curves, plot_training_curves};
use vision_cnn::utils::logging::{init_logging, LogConfig};
use vision_cnn::utils::{format_duration, format_number};

/// CNN image classification with Burn
///
/// Trains and runs a shared convolutional classifier on two tasks:
/// bird / not-bird (32x32) and agricultural crops (224x224, 30 classes).
#[derive(Parser, Debug)]
#[command(name = "vision_cnn")]
#[command(version)]
#[command(about = "CNN image classification pipelines with Burn", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load data, train, evaluate and save every artifact of a run
    Train {
        /// Task preset: birds or crops
        #[arg(short, long, default_value = "birds")]
        task: String,

        /// JSON config file (overrides the preset)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Crops: root directory with one folder per class
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Birds: zip archive or directory of bird images
        #[arg(long)]
        positive: Option<PathBuf>,

        /// Birds: zip archive or directory of other images
        #[arg(long)]
        negative: Option<PathBuf>,

        /// Number of training epochs
        #[arg(short, long)]
        epochs: Option<usize>,

        /// Batch size for training
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Learning rate
        #[arg(short, long)]
        learning_rate: Option<f64>,

        /// Output directory for checkpoints, history and charts
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Random seed for splits and shuffling
        #[arg(long)]
        seed: Option<u64>,

        /// Birds: maximum images read per class
        #[arg(long)]
        max_images: Option<usize>,
    },

    /// Classify a single image or every image in a directory
    Classify {
        /// Image file or directory
        #[arg(short, long)]
        input: PathBuf,

        /// Saved model weights (.mpk)
        #[arg(short, long)]
        model: PathBuf,

        /// Checkpoint metadata (defaults to the .json next to the model)
        #[arg(long)]
        metadata: Option<PathBuf>,

        /// Class list file ("index: name" per line)
        #[arg(long)]
        classes: Option<PathBuf>,

        /// Number of ranked classes to show
        #[arg(short = 'k', long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
    },

    /// Rebuild the validation split and report metrics for a saved model
    Evaluate {
        /// Task preset: birds or crops
        #[arg(short, long, default_value = "birds")]
        task: String,

        /// JSON config file (overrides the preset)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Saved model weights (.mpk)
        #[arg(short, long)]
        model: PathBuf,

        /// Checkpoint metadata (defaults to the .json next to the model)
        #[arg(long)]
        metadata: Option<PathBuf>,
    },

    /// Regenerate training charts from a saved history
    Plot {
        /// history.json written by `train`
        #[arg(long)]
        history: PathBuf,

        /// Directory for the charts (defaults to the history's directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Show the class distribution of a class-folder dataset
    Stats {
        /// Root directory with one folder per class
        #[arg(short, long, default_value = "Agricultural-crops")]
        data_dir: PathBuf,
    },

    /// Check that the backend and both model presets work
    Doctor {
        /// Optional class-folder dataset to probe
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
    },

    /// Write a preset configuration to a JSON file
    InitConfig {
        /// Task preset: birds or crops
        #[arg(short, long, default_value = "birds")]
        task: String,

        /// Output file
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };

    let _ = init_logging(&log_config);

    print_banner();

    match cli.command {
        Commands::Train {
            task,
            config,
            data_dir,
            positive,
            negative,
            epochs,
            batch_size,
            learning_rate,
            output_dir,
            seed,
            max_images,
        } => {
            let mut config = resolve_config(&task, config.as_deref())?;

            if let Some(dir) = data_dir {
                config.data.data_dir = dir;
            }
            if let Some(path) = positive {
                config.data.positive_source = path;
            }
            if let Some(path) = negative {
                config.data.negative_source = path;
            }
            if let Some(n) = epochs {
                config.training.epochs = n;
            }
            if let Some(n) = batch_size {
                config.training.batch_size = n;
            }
            if let Some(lr) = learning_rate {
                config.training.learning_rate = lr;
            }
            if let Some(dir) = output_dir {
                config.training.output_dir = dir;
            }
            if let Some(s) = seed {
                config.data.seed = s;
            }
            if let Some(n) = max_images {
                config.data.max_images_per_class = n;
            }

            cmd_train(config)?;
        }

        Commands::Classify {
            input,
            model,
            metadata,
            classes,
            top_k,
        } => {
            cmd_classify(&input, &model, metadata.as_deref(), classes.as_deref(), top_k)?;
        }

        Commands::Evaluate {
            task,
            config,
            model,
            metadata,
        } => {
            let config = resolve_config(&task, config.as_deref())?;
            cmd_evaluate(config, &model, metadata.as_deref())?;
        }

        Commands::Plot {
            history,
            output_dir,
        } => {
            cmd_plot(&history, output_dir.as_deref())?;
        }

        Commands::Stats { data_dir } => {
            cmd_stats(&data_dir)?;
        }

        Commands::Doctor { data_dir } => {
            cmd_doctor(data_dir.as_deref())?;
        }

        Commands::InitConfig { task, output } => {
            let task: Task = task.parse()?;
            PipelineConfig::for_task(task).save(&output)?;
            println!(
                "{} Wrote {} preset to {}",
                "✅".green(),
                task.display_name(),
                output.display()
            );
        }
    }

    Ok(())
}

fn print_banner() {
    println!(
        "{}",
        r#"
 ╔══════════════════════════════════════════════════════════════╗
 ║   🧠 vision_cnn                                              ║
 ║   Bird / not-bird and crop classification with Burn + Rust   ║
 ╚══════════════════════════════════════════════════════════════╝
  "#
        .green()
    );
}

/// Preset for `task`, or the config file when one is given
fn resolve_config(task: &str, config_path: Option<&Path>) -> Result<PipelineConfig> {
    match config_path {
        Some(path) => {
            let config = PipelineConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?;
            info!("Loaded {} config from {}", config.task, path.display());
            Ok(config)
        }
        None => Ok(PipelineConfig::for_task(task.parse()?)),
    }
}

fn cmd_train(mut config: PipelineConfig) -> Result<()> {
    let run_start = Instant::now();

    println!("{}", "Loading data...".cyan());
    let splits = load_splits(&config)?;

    if config.task == Task::Crops && config.model.num_classes != splits.num_classes() {
        warn!(
            "Preset expects {} crop classes, found {}; using the dataset count",
            config.model.num_classes,
            splits.num_classes()
        );
        config.model.num_classes = splits.num_classes();
    }
    config.validate()?;

    let output_dir = config.training.output_dir.clone();
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;
    config.save(&output_dir.join("config.json"))?;

    let device = default_device();
    let trainer = Trainer::<TrainingBackend>::new(
        config.clone(),
        splits.class_names.clone(),
        device.clone(),
    )?;

    println!("{}", "Training Configuration:".cyan().bold());
    println!("  🎯 Task:            {}", config.task.display_name());
    println!("  🏷️  Classes:         {}", splits.num_classes());
    println!("  📷 Train images:    {}", format_number(splits.train.len()));
    println!("  ✅ Validation:      {}", format_number(splits.validation.len()));
    println!("  🧠 Parameters:      {}", format_number(trainer.model.num_params()));
    println!("  🔁 Epochs:          {}", config.training.epochs);
    println!("  📦 Batch size:      {}", config.training.batch_size);
    println!("  📈 Learning rate:   {}", config.training.learning_rate);
    println!("  💾 Output:          {}", output_dir.display());
    println!("  🖥️  Backend:         {}", backend_name());
    println!();

    let outcome = trainer.fit(&splits.train, &splits.validation)?;
    let model = outcome.model.valid();

    println!();
    println!("{}", "Evaluating on the validation set...".cyan());
    let evaluation = evaluate(
        &model,
        &splits.validation,
        config.training.batch_size,
        config.data.normalize,
        config.data.image_size,
        &device,
    )?;
    print_report(config.task, &evaluation, &splits.class_names);

    let history = &outcome.history;
    history.save_json(&output_dir.join("history.json"))?;
    plot_training_curves(history, &output_dir.join("training_curves.svg"))?;
    plot_combined_curves(history, &output_dir.join("combined_curves.svg"))?;

    if config.task == Task::Crops {
        let csv = output_dir.join("confusion_matrix.csv");
        evaluation
            .metrics
            .confusion_matrix
            .save_csv(&csv, Some(splits.class_names.as_slice()))
            .with_context(|| format!("failed to write {}", csv.display()))?;
    }

    let epoch = history
        .best_epoch
        .unwrap_or_else(|| history.epochs().saturating_sub(1));
    let metadata = CheckpointMetadata::new(
        config.task,
        epoch,
        evaluation.accuracy_percent(),
        splits.class_names.clone(),
        config.model.clone(),
        config.data.normalize,
    );
    let final_path = CheckpointManager::new(&output_dir).save_final(&model, &metadata)?;
    write_class_list(&output_dir.join("classes.txt"), &splits.class_names)?;

    println!();
    println!("{}", "Run Summary:".green().bold());
    println!(
        "  🏆 Best validation accuracy: {:.2}%{}",
        history.best_val_accuracy,
        history
            .best_epoch
            .map(|e| format!(" (epoch {})", e + 1))
            .unwrap_or_default()
    );
    if let Some(best) = &outcome.best_checkpoint {
        println!("  💾 Best model:  {}", best.display());
    }
    println!("  💾 Final model: {}", final_path.display());
    println!("  ⏱️  Total time:  {}", format_duration(run_start.elapsed().as_secs_f64()));

    Ok(())
}

fn print_report(task: Task, evaluation: &Evaluation, class_names: &[String]) {
    match task {
        Task::Birds => {
            let report = evaluation.binary_report(POSITIVE_LABEL, DEFAULT_BINARY_THRESHOLD);
            let negative = class_names.first().map(String::as_str).unwrap_or("negative");
            let positive = class_names.get(1).map(String::as_str).unwrap_or("positive");
            println!("{}", report.display(negative, positive));
        }
        Task::Crops => {
            let metrics = evaluation.metrics.clone().with_class_names(class_names);
            println!("{}", metrics.display());
            println!("{}", metrics.class_report());
            println!("{}", metrics.confusion_matrix.display(Some(class_names)));
        }
    }
}

fn cmd_classify(
    input: &Path,
    model: &Path,
    metadata: Option<&Path>,
    classes: Option<&Path>,
    top_k: usize,
) -> Result<()> {
    println!("{}", "Inference Configuration:".cyan().bold());
    println!("  📷 Input:   {}", input.display());
    println!("  🧠 Model:   {}", model.display());
    println!("  🖥️  Backend: {}", backend_name());
    println!();

    if !input.exists() {
        bail!("input path not found: {}", input.display());
    }

    let predictor =
        Predictor::<DefaultBackend>::from_checkpoint(model, metadata, classes, default_device())
            .with_context(|| format!("failed to load model {}", model.display()))?;

    let results = if input.is_dir() {
        predictor.predict_dir(input, top_k)?
    } else {
        vec![predictor.predict_file(input, top_k)?]
    };

    if results.is_empty() {
        println!("{} No images found in {}", "Note:".yellow(), input.display());
        return Ok(());
    }

    for result in &results {
        print_prediction(result);
    }

    if results.len() > 1 {
        let mut counts = vec![0usize; predictor.num_classes()];
        for result in &results {
            counts[result.predicted_class] += 1;
        }
        println!("{}", "Summary:".green().bold());
        for (name, count) in predictor.class_names().iter().zip(counts.iter()) {
            if *count > 0 {
                println!("  {:30} {:>5}", name, count);
            }
        }
    }

    Ok(())
}

fn print_prediction(result: &PredictionResult) {
    let file_name = result
        .image_path
        .as_ref()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let level = match result.confidence_level() {
        ConfidenceLevel::High => "high".green(),
        ConfidenceLevel::Moderate => "moderate".yellow(),
        ConfidenceLevel::Low => "low".red(),
    };

    println!("📷 {}", file_name);
    println!("  Predicted:  {}", result.class_name.bold());
    println!("  Confidence: {:.1}% ({})", result.confidence * 100.0, level);
    println!("  Time:       {:.2}ms", result.inference_time_ms);
    println!("  Top-{}:", result.top_k.len());
    for (i, (_, name, prob)) in result.top_k.iter().enumerate() {
        println!("    {}. {} ({:.1}%)", i + 1, name, prob * 100.0);
    }
    println!();
}

fn cmd_evaluate(config: PipelineConfig, model_path: &Path, metadata: Option<&Path>) -> Result<()> {
    let metadata_path = metadata
        .map(Path::to_path_buf)
        .unwrap_or_else(|| metadata_path_for(model_path));
    let metadata = CheckpointMetadata::load(&metadata_path)
        .with_context(|| format!("failed to read {}", metadata_path.display()))?;

    if metadata.task != config.task {
        warn!(
            "Model was trained for {} but evaluating on {}",
            metadata.task, config.task
        );
    }

    println!("{}", "Loading data...".cyan());
    let splits = load_splits(&config)?;
    if splits.num_classes() != metadata.model_config.num_classes {
        bail!(
            "model has {} classes but the dataset has {}",
            metadata.model_config.num_classes,
            splits.num_classes()
        );
    }
    if config.data.image_size != metadata.model_config.image_size {
        bail!(
            "model expects {}px images but the config loads {}px",
            metadata.model_config.image_size,
            config.data.image_size
        );
    }

    let device = default_device();
    let model: ClassifierCnn<DefaultBackend> =
        load_model(model_path, &metadata.model_config, &device)?;

    let evaluation = evaluate(
        &model,
        &splits.validation,
        config.training.batch_size,
        metadata.normalize,
        metadata.model_config.image_size,
        &device,
    )?;

    println!(
        "{} {} validation images, stored accuracy {:.2}%",
        "Evaluated".green().bold(),
        splits.validation.len(),
        metadata.val_accuracy
    );
    print_report(config.task, &evaluation, &splits.class_names);

    Ok(())
}

fn cmd_plot(history_path: &Path, output_dir: Option<&Path>) -> Result<()> {
    let history = TrainingHistory::load_json(history_path)
        .with_context(|| format!("failed to read {}", history_path.display()))?;

    let dir = output_dir
        .map(Path::to_path_buf)
        .or_else(|| history_path.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));

    let curves = dir.join("training_curves.svg");
    let combined = dir.join("combined_curves.svg");
    plot_training_curves(&history, &curves)?;
    plot_combined_curves(&history, &combined)?;

    println!("{} Charts for {} epochs:", "✅".green(), history.epochs());
    println!("  {}", curves.display());
    println!("  {}", combined.display());
    Ok(())
}

fn cmd_stats(data_dir: &Path) -> Result<()> {
    info!("Computing dataset statistics for: {}", data_dir.display());

    if !data_dir.exists() {
        println!(
            "{} Dataset directory not found: {}",
            "Error:".red(),
            data_dir.display()
        );
        return Ok(());
    }

    let folder = ImageFolder::scan(data_dir)?;
    let stats = folder.stats();
    stats.print();

    let empty = stats.empty_classes();
    if !empty.is_empty() {
        println!();
        println!(
            "{} {} classes have no images: {}",
            "Warning:".yellow(),
            empty.len(),
            empty.join(", ")
        );
    }

    Ok(())
}

fn cmd_doctor(data_dir: Option<&Path>) -> Result<()> {
    println!("{}", "Environment Check:".cyan().bold());
    println!("  🖥️  Backend: {}", backend_name());
    println!("  📦 Version: {}", vision_cnn::VERSION);
    println!();

    let device = default_device();
    let mut failures = 0usize;

    let ones = Tensor::<DefaultBackend, 2>::ones([2, 2], &device);
    let sum: f32 = ones.clone().matmul(ones).sum().into_scalar().elem();
    failures += report_check("tensor matmul", (sum - 8.0).abs() < 1e-4, &format!("sum = {}", sum));

    for task in [Task::Birds, Task::Crops] {
        let config = PipelineConfig::for_task(task);
        let size = config.model.image_size;
        let model: ClassifierCnn<DefaultBackend> = config.model.init(&device);
        let input = Tensor::<DefaultBackend, 4>::zeros([1, 3, size, size], &device);
        let dims = model.forward(input).dims();
        let ok = dims == [1, config.model.num_classes];
        failures += report_check(
            &format!("{} model", task.display_name()),
            ok,
            &format!(
                "{} parameters, output {:?}",
                format_number(model.num_params()),
                dims
            ),
        );
    }

    if let Some(dir) = data_dir {
        match ImageFolder::scan(dir) {
            Ok(folder) => {
                let ok = folder.num_classes() > 0 && !folder.is_empty();
                failures += report_check(
                    "dataset",
                    ok,
                    &format!("{} classes, {} images", folder.num_classes(), folder.len()),
                );
            }
            Err(e) => failures += report_check("dataset", false, &e.to_string()),
        }
    }

    println!();
    if failures == 0 {
        println!("{}", "All checks passed".green().bold());
        Ok(())
    } else {
        bail!("{} check(s) failed", failures)
    }
}

/// Print one doctor line; returns 1 on failure
fn report_check(name: &str, ok: bool, detail: &str) -> usize {
    if ok {
        println!("  ✅ {:20} {}", name, detail);
        0
    } else {
        println!("  ❌ {:20} {}", name.red(), detail);
        1
    }
}
