// Walks through the forecasting workflow on synthetic station data
use city_pulse::aqi_forecast::metrics::forecast_accuracy;
use city_pulse::aqi_math::{dispersion_confidence, sliding_windows, MinMaxRange};
use city_pulse::{forecast_station, ForecasterConfig, MonitoringStation};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    println!("Exploring City Pulse forecasting\n");

    println!("=== Series math ===");
    show_series_math()?;

    println!("\n=== Station forecasts ===");
    let config = ForecasterConfig {
        lstm_units: 16,
        dense_units: 8,
        epochs: 5,
        ..ForecasterConfig::default()
    }
    .with_seed(2024);

    let mut forecasts = Vec::new();
    let mut observed = Vec::new();
    for station in MonitoringStation::ALL {
        let (forecaster, prediction) = forecast_station(station, config.clone(), 24 * 14)?;
        let trained_on = forecaster
            .training_range()
            .map(|r| format!("[{:.0}, {:.0}]", r.min(), r.max()))
            .unwrap_or_default();
        println!("{:<9} trained on {:<11} -> {}", station, trained_on, prediction);

        forecasts.push(prediction.predicted_value as f64);
        observed.push(station.base_aqi());
    }

    println!("\nForecasts against station base levels:");
    println!("{}", forecast_accuracy(&forecasts, &observed)?);

    println!("Done exploring");
    Ok(())
}

fn show_series_math() -> Result<(), Box<dyn std::error::Error>> {
    let readings = [88.0, 95.0, 120.0, 150.0, 140.0, 118.0, 104.0, 97.0];

    let range = MinMaxRange::from_values(&readings)?;
    println!("range {:?}, 120 scales to {:.3}", range, range.normalize(120.0));

    let normalized = range.normalize_all(&readings);
    let windows = sliding_windows(&normalized, 4, 1)?;
    println!("{} windows of 4 from {} readings", windows.len(), readings.len());

    let confidence = dispersion_confidence(&readings[2..], 0.5)?;
    println!("confidence over the last 6 readings: {:.3}", confidence);
    Ok(())
}
