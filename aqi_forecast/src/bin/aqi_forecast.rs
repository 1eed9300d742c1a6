//! # aqi-forecast
//!
//! Command-line front end: forecast the next hour for monitoring stations,
//! or score the forecaster on a CSV series.

use anyhow::{bail, Context, Result};
use aqi_forecast::metrics::holdout_split;
use aqi_forecast::synthetic::{daily_profile, generate_historical_aqi, HOURS_PER_YEAR};
use aqi_forecast::{
    AqiForecaster, FileModelStore, ForecasterConfig, ForecasterRegistry, ModelStore,
    MonitoringStation, SeriesLoader, TimeSeries,
};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "aqi-forecast")]
#[command(about = "One-step-ahead AQI forecasting", version)]
struct Cli {
    /// TOML file with forecaster settings
    #[arg(short, long, global = true, env = "AQI_FORECAST_CONFIG")]
    config: Option<PathBuf>,

    /// Seed for weight initialization, shuffling and synthetic data
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Override the number of training epochs
    #[arg(long, global = true)]
    epochs: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train on synthetic history and forecast the next hour per station
    Stations {
        /// Stations to forecast (default: all)
        #[arg(short, long, value_delimiter = ',')]
        stations: Vec<String>,

        /// Most recent hours of synthetic history to train on
        #[arg(long, default_value = "720")]
        hours: usize,

        /// Directory for stored models
        #[arg(long, env = "AQI_MODEL_DIR")]
        model_dir: Option<PathBuf>,

        /// Reuse stored models instead of training when available
        #[arg(long, requires = "model_dir")]
        restore: bool,
    },

    /// Train on the head of a CSV series and score forecasts on its tail
    Evaluate {
        /// CSV file with a header row
        #[arg(short, long)]
        input: PathBuf,

        /// Column holding the readings (default: first aqi/value column)
        #[arg(long)]
        column: Option<String>,

        /// Fraction of the series held out for scoring
        #[arg(long, default_value = "0.2")]
        holdout: f64,
    },
}

fn load_config(cli: &Cli) -> Result<ForecasterConfig> {
    let mut config = match &cli.config {
        Some(path) => ForecasterConfig::from_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => ForecasterConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config = config.with_seed(seed);
    }
    if let Some(epochs) = cli.epochs {
        config = config.with_epochs(epochs);
    }
    config.validate()?;
    Ok(config)
}

async fn run_stations(
    config: ForecasterConfig,
    names: &[String],
    hours: usize,
    model_dir: Option<PathBuf>,
    restore: bool,
) -> Result<()> {
    if hours == 0 || hours > HOURS_PER_YEAR {
        bail!("--hours must be between 1 and {}", HOURS_PER_YEAR);
    }

    let stations = MonitoringStation::resolve(names);

    let store = match model_dir {
        Some(dir) => Some(Arc::new(FileModelStore::new(dir)?)),
        None => None,
    };
    let seed = config.seed;
    let registry = Arc::new(ForecasterRegistry::new(config)?);

    let mut tasks = Vec::with_capacity(stations.len());
    for (offset, station) in stations.into_iter().enumerate() {
        let registry = Arc::clone(&registry);
        let store = store.clone();
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(offset as u64)),
            None => StdRng::from_entropy(),
        };

        tasks.push(tokio::spawn(async move {
            let key = station.id();
            let restored = match &store {
                Some(store) if restore && store.contains(key) => {
                    registry.restore(key, &**store).await?;
                    true
                }
                _ => false,
            };

            if !restored {
                let year = TimeSeries::new(key, generate_historical_aqi(station.base_aqi(), &mut rng))?;
                registry.create(key).await?;
                registry.train(key, year.tail(hours).to_vec()).await?;
                if let Some(store) = &store {
                    registry.save(key, &**store).await?;
                }
            }

            let today = daily_profile(&mut rng);
            let prediction = registry.predict(key, &today).await?;
            registry.dispose(key).await;
            Ok::<_, aqi_forecast::ForecastError>((station, restored, prediction))
        }));
    }

    for task in tasks {
        let (station, restored, prediction) = task.await.context("station task panicked")??;
        info!(station = station.id(), restored, "forecast ready");
        let line = serde_json::json!({
            "station": station.id(),
            "category": prediction.category().label(),
            "prediction": prediction,
        });
        println!("{}", line);
    }

    Ok(())
}

fn run_evaluate(
    config: ForecasterConfig,
    input: PathBuf,
    column: Option<String>,
    holdout: f64,
) -> Result<()> {
    if !(holdout > 0.0 && holdout < 1.0) {
        bail!("--holdout must be in (0, 1)");
    }

    let series = SeriesLoader::from_csv(&input, column.as_deref())
        .with_context(|| format!("loading {}", input.display()))?;
    let (train, test) = holdout_split(series.values(), holdout);
    if test.is_empty() {
        bail!("holdout leaves no readings to score");
    }

    info!(
        series = series.name(),
        train = train.len(),
        test = test.len(),
        "evaluating forecaster"
    );

    let mut forecaster = AqiForecaster::new(config)?;
    let history = forecaster.train(train)?;
    let accuracy = forecaster.backtest(series.values(), test.len())?;

    eprintln!("{}", accuracy);
    let line = serde_json::json!({
        "series": series.name(),
        "trainSamples": train.len(),
        "testSamples": test.len(),
        "finalLoss": history.final_loss(),
        "accuracy": accuracy,
    });
    println!("{}", line);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Stations {
            stations,
            hours,
            model_dir,
            restore,
        } => run_stations(config, &stations, hours, model_dir, restore).await,
        Commands::Evaluate {
            input,
            column,
            holdout,
        } => tokio::task::spawn_blocking(move || run_evaluate(config, input, column, holdout))
            .await
            .context("evaluation task panicked")?,
    }
}
