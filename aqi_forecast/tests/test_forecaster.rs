use aqi_forecast::{AqiForecaster, ForecastError, ForecasterConfig, NormalizationMode};
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use rstest::rstest;

// Hourly-looking series: a daily sine around 120 with a slow drift
fn hourly_series(len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| {
            let hour = i as f64;
            (120.0 + 35.0 * (hour * std::f64::consts::PI / 12.0).sin() + hour * 0.2).round()
        })
        .collect()
}

fn quick_config(seed: u64) -> ForecasterConfig {
    ForecasterConfig {
        lstm_units: 12,
        dense_units: 6,
        epochs: 4,
        batch_size: 16,
        ..ForecasterConfig::default()
    }
    .with_seed(seed)
}

fn trained(seed: u64, series: &[f64]) -> AqiForecaster {
    let mut forecaster = AqiForecaster::new(quick_config(seed)).unwrap();
    forecaster.train(series).unwrap();
    forecaster
}

#[rstest]
#[case(49)]
#[case(72)]
#[case(150)]
fn test_prediction_stays_within_observed_range(#[case] len: usize) {
    let series = hourly_series(len);
    let forecaster = trained(5, &series);

    let min = series.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = series.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    let prediction = forecaster.predict(&series[len - 24..]).unwrap();
    let value = prediction.predicted_value as f64;
    assert!(value >= min && value <= max, "{} outside [{}, {}]", value, min, max);
}

#[test]
fn test_training_range_mode_stays_within_training_range() {
    let series = hourly_series(96);
    let config = quick_config(8).with_normalization(NormalizationMode::TrainingRange);
    let mut forecaster = AqiForecaster::new(config).unwrap();
    forecaster.train(&series).unwrap();

    let range = forecaster.training_range().unwrap();
    let spike = vec![900.0; 24];
    let value = forecaster.predict(&spike).unwrap().predicted_value as f64;
    assert!(range.contains(value), "{} outside {:?}", value, range);
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(23)]
fn test_short_window_is_rejected(#[case] len: usize) {
    let forecaster = trained(5, &hourly_series(60));
    let recent = hourly_series(len);

    match forecaster.predict(&recent) {
        Err(ForecastError::InsufficientHistory { required, actual }) => {
            assert_eq!(required, 24);
            assert_eq!(actual, len);
        }
        other => panic!("expected InsufficientHistory, got {:?}", other),
    }
}

#[test]
fn test_untrained_forecaster_is_rejected() {
    let forecaster = AqiForecaster::new(quick_config(1)).unwrap();
    assert!(matches!(
        forecaster.predict(&hourly_series(24)),
        Err(ForecastError::UninitializedModel)
    ));
}

#[rstest]
#[case(hourly_series(24))]
#[case((0..24).map(|i| if i % 2 == 0 { 5.0 } else { 480.0 }).collect())]
#[case((0..30).map(|i| 100.0 + i as f64).collect())]
#[case(vec![0.0; 24])]
fn test_confidence_bounds(#[case] recent: Vec<f64>) {
    let forecaster = trained(3, &hourly_series(60));
    let confidence = forecaster.predict(&recent).unwrap().confidence;
    assert!((0.5..=1.0).contains(&confidence), "confidence {}", confidence);
}

#[test]
fn test_volatile_window_hits_confidence_floor() {
    let forecaster = trained(3, &hourly_series(60));
    let recent: Vec<f64> = (0..24).map(|i| if i % 2 == 0 { 5.0 } else { 480.0 }).collect();
    assert_eq!(forecaster.predict(&recent).unwrap().confidence, 0.5);
}

#[rstest]
#[case(42.0)]
#[case(137.0)]
#[case(0.0)]
fn test_constant_window(#[case] level: f64) {
    let forecaster = trained(4, &hourly_series(60));
    let prediction = forecaster.predict(&[level; 24]).unwrap();

    assert_eq!(prediction.predicted_value, level as i64);
    assert_eq!(prediction.confidence, 1.0);
}

#[rstest]
#[case(NormalizationMode::RecentWindow)]
#[case(NormalizationMode::TrainingRange)]
fn test_increasing_series_keeps_rising(#[case] normalization: NormalizationMode) {
    let series: Vec<f64> = (0..100).map(f64::from).collect();
    let config = ForecasterConfig {
        lstm_units: 16,
        dense_units: 8,
        learning_rate: 0.01,
        epochs: 150,
        batch_size: 16,
        validation_split: 0.0,
        normalization,
        ..ForecasterConfig::default()
    }
    .with_seed(11);

    let mut forecaster = AqiForecaster::new(config).unwrap();
    let history = forecaster.train(&series).unwrap();
    assert!(history.final_loss().unwrap() < history.loss[0]);

    let tail = &series[76..];
    let window_mean = tail.iter().sum::<f64>() / tail.len() as f64;
    let predicted = forecaster.predict(tail).unwrap().predicted_value as f64;
    assert!(
        predicted > window_mean,
        "{:?}: predicted {} should exceed the window mean {}",
        normalization,
        predicted,
        window_mean
    );
}

#[test]
fn test_repeated_predictions_are_identical() {
    let series = hourly_series(80);
    let forecaster = trained(21, &series);
    let at = Utc.with_ymd_and_hms(2024, 11, 5, 18, 0, 0).unwrap();

    let first = forecaster.predict_at(&series[56..], at).unwrap();
    for _ in 0..3 {
        assert_eq!(forecaster.predict_at(&series[56..], at).unwrap(), first);
    }
}

#[test]
fn test_same_seed_trains_same_model() {
    let series = hourly_series(80);
    let a = trained(21, &series);
    let b = trained(21, &series);
    let at = Utc.with_ymd_and_hms(2024, 11, 5, 18, 0, 0).unwrap();

    assert_eq!(
        a.predict_at(&series[56..], at).unwrap(),
        b.predict_at(&series[56..], at).unwrap()
    );
}

#[test]
fn test_retraining_replaces_training_range() {
    let mut forecaster = trained(2, &hourly_series(60));
    let shifted: Vec<f64> = hourly_series(60).iter().map(|v| v + 200.0).collect();
    forecaster.train(&shifted).unwrap();

    let range = forecaster.training_range().unwrap();
    assert!(range.min() >= 280.0);
}
