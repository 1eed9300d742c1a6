//! Sliding-window example construction
//!
//! Turns an ordered series into `(window, target)` pairs where each window
//! holds `lookback` consecutive samples and the target is the sample
//! `horizon` steps after the window ends.

use crate::{MathError, Result};

/// Supervised examples built from a series
#[derive(Debug, Clone, PartialEq)]
pub struct WindowedExamples {
    /// Input windows, each `lookback` samples long
    pub inputs: Vec<Vec<f64>>,
    /// One target per window
    pub targets: Vec<f64>,
}

impl WindowedExamples {
    /// Number of examples
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Check whether no example could be built
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Number of complete examples a series of `len` samples yields
pub fn example_count(len: usize, lookback: usize, horizon: usize) -> usize {
    (len + 1).saturating_sub(lookback + horizon)
}

/// Build every complete `(window, target)` pair from `data`
pub fn sliding_windows(data: &[f64], lookback: usize, horizon: usize) -> Result<WindowedExamples> {
    if lookback == 0 {
        return Err(MathError::InvalidInput(
            "Lookback must be greater than zero".to_string(),
        ));
    }
    if horizon == 0 {
        return Err(MathError::InvalidInput(
            "Horizon must be greater than zero".to_string(),
        ));
    }

    let count = example_count(data.len(), lookback, horizon);
    if count == 0 {
        return Err(MathError::InsufficientData(format!(
            "Need at least {} samples to build one example, have {}",
            lookback + horizon,
            data.len()
        )));
    }

    let mut inputs = Vec::with_capacity(count);
    let mut targets = Vec::with_capacity(count);
    for start in 0..count {
        inputs.push(data[start..start + lookback].to_vec());
        targets.push(data[start + lookback + horizon - 1]);
    }

    Ok(WindowedExamples { inputs, targets })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_windows_and_targets() {
        let data: Vec<f64> = (0..10).map(f64::from).collect();
        let examples = sliding_windows(&data, 3, 1).unwrap();

        assert_eq!(examples.len(), 7);
        assert_eq!(examples.inputs[0], vec![0.0, 1.0, 2.0]);
        assert_eq!(examples.targets[0], 3.0);
        assert_eq!(examples.inputs[6], vec![6.0, 7.0, 8.0]);
        assert_eq!(examples.targets[6], 9.0);
    }

    #[test]
    fn test_longer_horizon() {
        let data: Vec<f64> = (0..10).map(f64::from).collect();
        let examples = sliding_windows(&data, 3, 2).unwrap();

        assert_eq!(examples.len(), 6);
        assert_eq!(examples.targets[0], 4.0);
    }

    #[rstest]
    #[case(49, 24, 1, 25)]
    #[case(25, 24, 1, 1)]
    #[case(24, 24, 1, 0)]
    #[case(30, 24, 3, 4)]
    fn test_example_count(
        #[case] len: usize,
        #[case] lookback: usize,
        #[case] horizon: usize,
        #[case] expected: usize,
    ) {
        assert_eq!(example_count(len, lookback, horizon), expected);
    }

    #[test]
    fn test_too_short_series() {
        let result = sliding_windows(&[1.0; 10], 24, 1);
        assert!(matches!(result, Err(MathError::InsufficientData(_))));
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(sliding_windows(&[1.0; 10], 0, 1).is_err());
        assert!(sliding_windows(&[1.0; 10], 3, 0).is_err());
    }
}
