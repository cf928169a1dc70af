use std::path::PathBuf;
use std::time::Duration;
use anyhow::Context;
use clap::{Parser, Subcommand};
use log::info;
use ondevice_intent::{
    AssetDir, ClassifierService, HostPlatform, RuntimeConfig, SharedClassifier, StaticPlatform,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding model.onnx, vocab.txt and labels.txt
    #[arg(short, long, env = "INTENT_ASSETS")]
    assets: Option<PathBuf>,

    /// Platform used to pick a hardware delegate (android, ios, ...);
    /// defaults to the host OS
    #[arg(short, long)]
    platform: Option<String>,

    /// Run on CPU only
    #[arg(long)]
    no_delegate: bool,

    /// Expected SHA-256 of the model file
    #[arg(long)]
    model_sha256: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify one or more phrases
    Classify {
        texts: Vec<String>,
        /// Give up on a phrase after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Print the loaded model's description
    Info,
    /// Measure classification latency over the sample phrases
    Benchmark {
        #[arg(short = 'n', long, default_value_t = 100)]
        iterations: usize,
    },
}

fn build_service(args: &Args) -> anyhow::Result<ClassifierService> {
    let resources = match &args.assets {
        Some(dir) => AssetDir::new(dir),
        None => AssetDir::new_default(),
    };
    info!("Reading assets from {:?}", resources.root());

    let runtime_config = RuntimeConfig {
        use_delegate: !args.no_delegate,
        ..RuntimeConfig::default()
    };
    let mut builder = ClassifierService::builder()
        .with_resources(resources)
        .with_runtime_config(runtime_config);
    builder = match &args.platform {
        Some(platform) => builder.with_platform(StaticPlatform(platform.clone())),
        None => builder.with_platform(HostPlatform),
    };
    if let Some(hash) = &args.model_sha256 {
        builder = builder.with_model_hash(hash.clone());
    }
    Ok(builder.build()?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let classifier = SharedClassifier::new(build_service(&args)?);
    classifier
        .initialize()
        .await
        .context("failed to initialize the classifier")?;

    match args.command {
        Command::Classify { texts, timeout_ms } => {
            let labels = classifier.intent_labels().await?;
            for text in texts {
                let result = match timeout_ms {
                    Some(ms) => classifier.classify_within(text.clone(), Duration::from_millis(ms)).await,
                    None => classifier.classify(text.clone()).await,
                };
                match result {
                    Ok(result) => {
                        println!("\n{}", text);
                        println!("  Intent: {} ({:.1}%)", result.intent, result.confidence * 100.0);
                        println!("  Time: {}ms", result.inference_time_ms);
                        for (label, score) in result.ranked(&labels) {
                            println!("    {:<16} {:.4}", label, score);
                        }
                    }
                    Err(e) if e.is_per_call() => {
                        eprintln!("\n{}\n  {}", text, e.user_message());
                        info!("Classification of '{}' failed: {}", text, e);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Command::Info => {
            let info = classifier.model_info().await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Command::Benchmark { iterations } => {
            let stats = classifier.benchmark(iterations).await?;
            println!("Iterations:         {}", stats.iterations);
            println!("Median:             {}ms", stats.median_ms);
            println!("Average:            {:.2}ms", stats.average_ms);
            println!("Min / Max:          {}ms / {}ms", stats.min_ms, stats.max_ms);
            println!("95th percentile:    {}ms", stats.p95_ms);
            println!("Average confidence: {:.1}%", stats.average_confidence * 100.0);
        }
    }

    classifier.dispose().await;
    Ok(())
}
