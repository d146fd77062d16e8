use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rand::Rng;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

use artifact_loader::{ArtifactCache, DEFAULT_CLASSIFIER_PATH, DEFAULT_ENCODER_PATH};
use pipeline::{
    Field, ImageCatalog, ImagePreview, SoilWeatherSample, DEFAULT_IMAGE_DIR, FEATURE_ORDER,
};
use server::config::{DEFAULT_BIND_ADDR, ENV_BIND_ADDR, ENV_ENCODER_PATH, ENV_IMAGE_DIR, ENV_MODEL_PATH};
use server::{CropRecommendation, RecommendationOrchestrator, ServerConfig};

/// Crop Recs - recommend a crop from soil and weather conditions
#[derive(Parser)]
#[command(name = "crop-recs")]
#[command(about = "Crop recommendation from soil nutrients and weather", long_about = None)]
struct Cli {
    /// Path to the classifier artifact
    #[arg(long, global = true, env = ENV_MODEL_PATH, default_value = DEFAULT_CLASSIFIER_PATH)]
    model: PathBuf,

    /// Path to the label encoder artifact
    #[arg(long, global = true, env = ENV_ENCODER_PATH, default_value = DEFAULT_ENCODER_PATH)]
    encoder: PathBuf,

    /// Directory holding <crop>.jpg images
    #[arg(long, global = true, env = ENV_IMAGE_DIR, default_value = DEFAULT_IMAGE_DIR)]
    image_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the web form and JSON API
    Serve {
        /// Address to listen on
        #[arg(long, env = ENV_BIND_ADDR, default_value = DEFAULT_BIND_ADDR)]
        bind: SocketAddr,
    },

    /// Recommend a crop for one set of conditions
    Recommend {
        #[command(flatten)]
        sample: SampleArgs,

        /// Show what the recommendation was based on
        #[arg(long)]
        explain: bool,
    },

    /// Show what the loaded artifacts contain
    Inspect,

    /// Run benchmark to test performance
    Benchmark {
        /// Number of requests to make
        #[arg(long, default_value = "1000")]
        requests: usize,

        /// Number of concurrent requests
        #[arg(long, default_value = "10")]
        concurrent: usize,
    },
}

/// One flag per field, defaulting to the form defaults
#[derive(Args, Debug, Clone, Copy)]
struct SampleArgs {
    /// Nitrogen (kg/ha)
    #[arg(long, short = 'n', default_value_t = Field::Nitrogen.bounds().default)]
    nitrogen: f64,

    /// Phosphorus (kg/ha)
    #[arg(long, short = 'p', default_value_t = Field::Phosphorus.bounds().default)]
    phosphorus: f64,

    /// Potassium (kg/ha)
    #[arg(long, short = 'k', default_value_t = Field::Potassium.bounds().default)]
    potassium: f64,

    /// Soil pH
    #[arg(long, default_value_t = Field::Ph.bounds().default)]
    ph: f64,

    /// Temperature (°C)
    #[arg(long, short = 't', default_value_t = Field::Temperature.bounds().default)]
    temperature: f64,

    /// Relative humidity (%)
    #[arg(long, default_value_t = Field::Humidity.bounds().default)]
    humidity: f64,

    /// Rainfall (mm)
    #[arg(long, short = 'r', default_value_t = Field::Rainfall.bounds().default)]
    rainfall: f64,
}

impl From<SampleArgs> for SoilWeatherSample {
    fn from(args: SampleArgs) -> Self {
        SoilWeatherSample {
            nitrogen: args.nitrogen,
            phosphorus: args.phosphorus,
            potassium: args.potassium,
            ph: args.ph,
            temperature: args.temperature,
            humidity: args.humidity,
            rainfall: args.rainfall,
        }
    }
}

impl Cli {
    fn server_config(&self, bind: SocketAddr) -> ServerConfig {
        ServerConfig::new(bind, &self.model, &self.encoder, &self.image_dir)
    }

    /// Cache over the artifact flags; nothing is read until first use
    fn artifact_cache(&self) -> Result<Arc<ArtifactCache>> {
        let config = self.server_config(DEFAULT_BIND_ADDR.parse()?);
        Ok(Arc::new(ArtifactCache::new(config.artifacts)))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cache = cli.artifact_cache()?;

    // Dispatch to appropriate command handler
    match &cli.command {
        Commands::Serve { bind } => server::serve(cli.server_config(*bind)).await?,
        Commands::Recommend { sample, explain } => {
            let orchestrator = load_orchestrator(&cli, cache).await?;
            handle_recommend(&orchestrator, (*sample).into(), *explain)?
        }
        Commands::Inspect => handle_inspect(&cache)?,
        Commands::Benchmark {
            requests,
            concurrent,
        } => {
            let orchestrator = load_orchestrator(&cli, cache).await?;
            handle_benchmark(Arc::new(orchestrator), *requests, *concurrent).await?
        }
    }

    Ok(())
}

async fn load_orchestrator(
    cli: &Cli,
    cache: Arc<ArtifactCache>,
) -> Result<RecommendationOrchestrator> {
    println!(
        "Loading model from {} and {}...",
        cli.model.display(),
        cli.encoder.display()
    );
    let start = Instant::now();
    let images = ImageCatalog::new(cli.image_dir.clone());
    let orchestrator = tokio::task::spawn_blocking(move || {
        RecommendationOrchestrator::from_cache(&cache, images)
    })
    .await
    .context("Artifact loading task failed")??;
    println!("{} Loaded model in {:?}", "✓".green(), start.elapsed());
    Ok(orchestrator)
}

/// Handle the 'recommend' command
fn handle_recommend(
    orchestrator: &RecommendationOrchestrator,
    sample: SoilWeatherSample,
    explain: bool,
) -> Result<()> {
    let rec = orchestrator
        .recommend(sample)
        .map_err(|err| anyhow!(err.user_message()))?;

    print_recommendation(&rec, explain);
    Ok(())
}

/// Handle the 'inspect' command
fn handle_inspect(cache: &ArtifactCache) -> Result<()> {
    let bundle = cache
        .get_or_load()
        .context("Failed to load model artifacts")?;
    let classifier = bundle.classifier();

    println!("{}", "Classifier:".bold().blue());
    println!("{}Kind: {}", "• ".green(), classifier.kind());
    println!("{}Trees: {}", "• ".green(), classifier.trees().len());
    let max_depth = classifier.trees().iter().map(|t| t.depth()).max().unwrap_or(0);
    let nodes: usize = classifier.trees().iter().map(|t| t.node_count()).sum();
    println!("{}Max depth: {}", "• ".green(), max_depth);
    println!("{}Total nodes: {}", "• ".green(), nodes);

    println!("{}", "Feature order:".bold().blue());
    for (i, field) in FEATURE_ORDER.iter().enumerate() {
        let bounds = field.bounds();
        println!(
            "  {}. {} [{} to {}]",
            i,
            field.label(),
            bounds.min,
            bounds.max
        );
    }

    let labels = bundle.encoder().labels();
    println!("{}", format!("Crops ({}):", labels.len()).bold().blue());
    for (i, label) in labels.iter().enumerate() {
        println!("  {:>2}: {}", i, label);
    }
    Ok(())
}

/// Handle the 'benchmark' command
async fn handle_benchmark(
    orchestrator: Arc<RecommendationOrchestrator>,
    requests: usize,
    concurrent: usize,
) -> Result<()> {
    if requests == 0 || concurrent == 0 {
        bail!("--requests and --concurrent must both be at least 1");
    }

    let samples: Vec<SoilWeatherSample> = {
        let mut rng = rand::rng();
        (0..requests).map(|_| random_sample(&mut rng)).collect()
    };

    let permits = Arc::new(Semaphore::new(concurrent));
    let wall_clock = Instant::now();

    let mut handles = Vec::with_capacity(requests);
    for sample in samples {
        let orchestrator = Arc::clone(&orchestrator);
        let permits = Arc::clone(&permits);
        handles.push(tokio::spawn(async move {
            let _permit = permits.acquire_owned().await?;
            tokio::task::spawn_blocking(move || {
                let start = Instant::now();
                let ok = orchestrator.recommend(sample).is_ok();
                (start.elapsed(), ok)
            })
            .await
            .map_err(anyhow::Error::from)
        }));
    }

    let mut timings = Vec::with_capacity(requests);
    let mut failures = 0;
    for handle in handles {
        let (elapsed, ok) = handle.await??;
        timings.push(elapsed);
        if !ok {
            failures += 1;
        }
    }
    let total_time = wall_clock.elapsed();

    timings.sort();
    let avg_latency = timings.iter().sum::<Duration>() / timings.len() as u32;
    let throughput = requests as f64 / total_time.as_secs_f64();

    println!("{}", "Benchmark results:".bold().blue());
    println!("Requests: {} ({} concurrent)", requests, concurrent);
    println!("Total time: {:?}", total_time);
    println!("Average latency: {:?}", avg_latency);
    println!("P50 latency: {:?}", percentile(&timings, 0.50));
    println!("P95 latency: {:?}", percentile(&timings, 0.95));
    println!("P99 latency: {:?}", percentile(&timings, 0.99));
    println!("Throughput: {:.2} requests/second", throughput);
    if failures > 0 {
        println!("{} {} requests failed", "!".red(), failures);
    }

    Ok(())
}

/// Uniform sample inside every field's bounds
fn random_sample<R: Rng>(rng: &mut R) -> SoilWeatherSample {
    let mut sample = SoilWeatherSample::default();
    for field in FEATURE_ORDER {
        let bounds = field.bounds();
        sample.set(field, rng.random_range(bounds.min..=bounds.max));
    }
    sample
}

/// Nearest-rank percentile of sorted timings
fn percentile(sorted: &[Duration], q: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let rank = (sorted.len() as f64 * q).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

/// Helper function to format and print a recommendation
fn print_recommendation(rec: &CropRecommendation, explain: bool) {
    println!("{}", "Recommended Crop:".bold().blue());
    println!("{}", rec.headline.green().bold());

    match &rec.preview {
        ImagePreview::Available { path, .. } => println!("Image: {}", path.display()),
        ImagePreview::Unavailable { message } => println!("{}", message.dimmed()),
        ImagePreview::Unreadable { message } => println!("{}", message.yellow()),
    }

    if explain {
        println!();
        println!("{}", "About this recommendation".bold());
        println!("{}", rec.explanation);
    }
}
