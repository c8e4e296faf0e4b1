use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::info;

use identifruit::{
    reference_link, ClassLabels, Classifier, ContentStore, DecisionPolicy, JsonContentStore, ModelInfo,
    ModelManager, ResizeStrategy, RuntimeConfig, ScoreActivation,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ResizeArg {
    /// Resize straight to 224x224
    Direct,
    /// Resize to 256x256 and take the central 224x224
    CenterCrop,
}

impl From<ResizeArg> for ResizeStrategy {
    fn from(arg: ResizeArg) -> Self {
        match arg {
            ResizeArg::Direct => ResizeStrategy::Direct,
            ResizeArg::CenterCrop => ResizeStrategy::CenterCrop,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ActivationArg {
    /// Model emits logits
    Softmax,
    /// Model emits probabilities
    Identity,
}

impl From<ActivationArg> for ScoreActivation {
    fn from(arg: ActivationArg) -> Self {
        match arg {
            ActivationArg::Softmax => ScoreActivation::Softmax,
            ActivationArg::Identity => ScoreActivation::Identity,
        }
    }
}

/// Identify the fruit or vegetable in a photo
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Image to classify
    #[arg(long, value_name = "FILE")]
    image: PathBuf,

    /// Local ONNX model file
    #[arg(long, value_name = "FILE", conflicts_with = "model_url")]
    model: Option<PathBuf>,

    /// Download the model from this URL into the cache
    #[arg(long, value_name = "URL", requires = "model_sha256")]
    model_url: Option<String>,

    /// Expected SHA-256 of the downloaded model
    #[arg(long, value_name = "HEX")]
    model_sha256: Option<String>,

    /// Cache name for a downloaded model
    #[arg(long, default_value = "identifruit", value_name = "NAME")]
    model_name: String,

    /// Labels file, one class per line in model output order (defaults to the 20 fruit classes)
    #[arg(long, value_name = "FILE")]
    labels: Option<PathBuf>,

    /// JSON document with nutritional facts and health benefits per fruit
    #[arg(long, value_name = "FILE")]
    content: Option<PathBuf>,

    /// Minimum confidence (0.0 - 1.0) for a label to be reported
    #[arg(long, default_value = "0.5", value_name = "THRESHOLD")]
    min_confidence: f32,

    #[arg(long, value_enum, default_value = "center-crop")]
    resize: ResizeArg,

    #[arg(long, value_enum, default_value = "softmax")]
    activation: ActivationArg,

    /// Intra-op threads for ONNX Runtime (0 lets the runtime decide)
    #[arg(long, default_value = "0")]
    threads: usize,

    /// Print the prediction as JSON
    #[arg(long)]
    json: bool,
}

async fn resolve_model(args: &Args) -> Result<PathBuf> {
    if let Some(path) = &args.model {
        return Ok(path.clone());
    }
    let (Some(url), Some(hash)) = (&args.model_url, &args.model_sha256) else {
        bail!("either --model or --model-url with --model-sha256 is required");
    };

    let manager = ModelManager::new_default()?;
    let info = ModelInfo::new(&args.model_name, url, hash);
    let path = manager.ensure_model_downloaded(&info).await?;
    Ok(path)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let model_path = resolve_model(&args).await?;

    let start_time = Instant::now();
    info!("Building classifier...");

    let mut builder = Classifier::builder()
        .with_runtime_config(RuntimeConfig {
            intra_threads: args.threads,
            ..RuntimeConfig::default()
        })
        .with_model_path(model_path)?
        .with_resize_strategy(args.resize.into())
        .with_decision_policy(DecisionPolicy::new(args.min_confidence, args.activation.into())?)?;
    if let Some(labels) = &args.labels {
        builder = builder.with_labels(ClassLabels::from_file(labels)?);
    }
    let classifier = builder.build()?;
    info!("Classifier built in {:.2?}", start_time.elapsed());

    let classify_start = Instant::now();
    let prediction = classifier
        .classify_file(&args.image)
        .with_context(|| format!("failed to classify {:?}", args.image))?;
    info!("Classification took {:.2?}", classify_start.elapsed());

    let content = match (&args.content, prediction.decision.lookup_key()) {
        (Some(path), Some(key)) => JsonContentStore::from_file(path)?.lookup(&key)?,
        _ => None,
    };

    if args.json {
        let output = serde_json::json!({
            "prediction": prediction,
            "reference": reference_link(prediction.label()),
            "content": content,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Predicted fruit: {}", prediction.label());
    println!("Confidence: {:.1}%", prediction.confidence * 100.0);
    println!("Top scores:");
    for (label, score) in prediction.top_k(classifier.labels(), 3) {
        println!("  {}: {:.1}%", label, score * 100.0);
    }

    if !prediction.decision.is_unknown() {
        match reference_link(prediction.label()) {
            Some(link) => println!("Reference: {}", link),
            None => println!("No available reference link for this image"),
        }
    }

    match content {
        Some(content) => {
            println!("\nNutritional facts:");
            for fact in &content.nutritional_facts {
                println!("  - {}", fact);
            }
            println!("\nHealth benefits:");
            for benefit in &content.health_benefits {
                println!("  - {}", benefit);
            }
        }
        None if args.content.is_some() && !prediction.decision.is_unknown() => {
            println!("No data found for {}", prediction.label());
        }
        None => {}
    }

    Ok(())
}
