//! # City Pulse
//!
//! `city_pulse` bundles the air-quality forecasting crates of the workspace:
//! [`aqi_math`] for normalization, dispersion and windowing, and
//! [`aqi_forecast`] for the LSTM forecaster, its registry and model stores.
//!
//! ## Example
//!
//! ```no_run
//! use city_pulse::{forecast_station, ForecasterConfig, MonitoringStation};
//!
//! let config = ForecasterConfig::default().with_seed(42).with_epochs(5);
//! let (_, prediction) = forecast_station(MonitoringStation::Thane, config, 24 * 14)?;
//! println!("{}", prediction);
//! # Ok::<(), city_pulse::ForecastError>(())
//! ```

pub use aqi_forecast;
pub use aqi_math;

pub use aqi_forecast::{
    AqiCategory, AqiForecaster, AqiPrediction, ForecastError, ForecasterConfig,
    ForecasterRegistry, MonitoringStation, Result,
};

use aqi_forecast::synthetic::{daily_profile, generate_historical_aqi, HOURS_PER_YEAR};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Trains a forecaster on the last `hours` of a synthetic year for `station`
/// and forecasts the hour after a synthetic day.
///
/// The configured seed drives both the network and the synthetic data.
pub fn forecast_station(
    station: MonitoringStation,
    config: ForecasterConfig,
    hours: usize,
) -> Result<(AqiForecaster, AqiPrediction)> {
    if hours == 0 || hours > HOURS_PER_YEAR {
        return Err(ForecastError::InvalidParameter(format!(
            "History must cover 1 to {} hours, got {}",
            HOURS_PER_YEAR, hours
        )));
    }

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let year = generate_historical_aqi(station.base_aqi(), &mut rng);

    let mut forecaster = AqiForecaster::new(config)?;
    forecaster.train(&year[year.len() - hours..])?;

    let prediction = forecaster.predict(&daily_profile(&mut rng))?;
    Ok((forecaster, prediction))
}
