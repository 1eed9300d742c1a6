//! Synthetic AQI history for the monitored stations
//!
//! Forecasters are trained on a generated year of hourly readings per
//! station: a base level shaped by a yearly cycle, rush-hour peaks, a quiet
//! early morning and ±20% noise.

use rand::Rng;
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Hours in a non-leap year
pub const HOURS_PER_YEAR: usize = 24 * 365;

/// Upper bound of the AQI scale
pub const AQI_CEILING: f64 = 500.0;

/// Typical AQI by hour of day, midnight first
pub const DAILY_AQI_PATTERN: [f64; 24] = [
    70.0, 60.0, 55.0, 50.0, 65.0, 90.0, 120.0, 150.0, 140.0, 120.0, 110.0, 100.0, 95.0, 100.0,
    105.0, 110.0, 120.0, 135.0, 140.0, 130.0, 120.0, 110.0, 90.0, 80.0,
];

/// Monitored locations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonitoringStation {
    Thane,
    Kalyan,
    Andheri,
    Borivali,
    Virar,
    Dadar,
    Khargar,
}

impl MonitoringStation {
    pub const ALL: [MonitoringStation; 7] = [
        MonitoringStation::Thane,
        MonitoringStation::Kalyan,
        MonitoringStation::Andheri,
        MonitoringStation::Borivali,
        MonitoringStation::Virar,
        MonitoringStation::Dadar,
        MonitoringStation::Khargar,
    ];

    /// Lower-case identifier used as registry and store key
    pub fn id(&self) -> &'static str {
        match self {
            MonitoringStation::Thane => "thane",
            MonitoringStation::Kalyan => "kalyan",
            MonitoringStation::Andheri => "andheri",
            MonitoringStation::Borivali => "borivali",
            MonitoringStation::Virar => "virar",
            MonitoringStation::Dadar => "dadar",
            MonitoringStation::Khargar => "khargar",
        }
    }

    /// Reference AQI the synthetic history is built around
    pub fn base_aqi(&self) -> f64 {
        match self {
            MonitoringStation::Thane => 145.0,
            MonitoringStation::Kalyan => 155.0,
            MonitoringStation::Andheri => 135.0,
            MonitoringStation::Borivali => 125.0,
            MonitoringStation::Virar => 115.0,
            MonitoringStation::Dadar => 165.0,
            MonitoringStation::Khargar => 130.0,
        }
    }

    /// Resolve a free-form name, falling back to Kalyan when unknown
    pub fn normalize(name: &str) -> Self {
        name.parse().unwrap_or(MonitoringStation::Kalyan)
    }

    /// Normalize every name, keeping the first occurrence of each station.
    /// An empty list selects every station.
    pub fn resolve<S: AsRef<str>>(names: &[S]) -> Vec<Self> {
        if names.is_empty() {
            return MonitoringStation::ALL.to_vec();
        }

        let mut stations = Vec::with_capacity(names.len());
        for name in names {
            let station = Self::normalize(name.as_ref());
            if !stations.contains(&station) {
                stations.push(station);
            }
        }
        stations
    }
}

impl FromStr for MonitoringStation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        MonitoringStation::ALL
            .into_iter()
            .find(|station| station.id() == wanted)
            .ok_or_else(|| format!("Unknown station: {}", s))
    }
}

impl fmt::Display for MonitoringStation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.id())
    }
}

/// Multiplier for the hour of day
fn hourly_factor(hour_of_day: usize) -> f64 {
    match hour_of_day {
        7..=10 => 1.3,
        17..=20 => 1.4,
        1..=4 => 0.7,
        _ => 1.0,
    }
}

/// Multiplier for the day of year: 0.7 on the first day, 1.3 at mid-year
fn seasonal_factor(day_of_year: usize) -> f64 {
    ((day_of_year as f64 / 365.0) * 2.0 * PI - PI / 2.0).sin() * 0.3 + 1.0
}

/// A year of hourly readings around `base_aqi`, rounded and clamped to
/// `[0, 500]`
pub fn generate_historical_aqi<R: Rng>(base_aqi: f64, rng: &mut R) -> Vec<f64> {
    (0..HOURS_PER_YEAR)
        .map(|hour| {
            let noise = 0.8 + rng.gen::<f64>() * 0.4;
            let aqi = (base_aqi * seasonal_factor(hour / 24) * hourly_factor(hour % 24) * noise)
                .round();
            aqi.clamp(0.0, AQI_CEILING)
        })
        .collect()
}

/// Today's 24 hourly readings: [`DAILY_AQI_PATTERN`] with ±5 jitter, rounded
pub fn daily_profile<R: Rng>(rng: &mut R) -> Vec<f64> {
    DAILY_AQI_PATTERN
        .iter()
        .map(|&base| (base + rng.gen::<f64>() * 10.0 - 5.0).round())
        .collect()
}
