//! Adam optimizer

use serde::{Deserialize, Serialize};

const BETA1: f64 = 0.9;
const BETA2: f64 = 0.999;
const EPSILON: f64 = 1e-7;

/// First and second moment estimates for one parameter tensor
#[derive(Debug, Clone, Default)]
struct Moments {
    first: Vec<f64>,
    second: Vec<f64>,
}

/// Adaptive moment estimation over a fixed, ordered set of parameter tensors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adam {
    learning_rate: f64,
    #[serde(skip)]
    moments: Vec<Moments>,
    #[serde(skip)]
    step: i32,
}

impl Adam {
    /// Create an optimizer with the given learning rate
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            moments: Vec::new(),
            step: 0,
        }
    }

    /// Learning rate
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Number of updates applied so far
    pub fn steps(&self) -> i32 {
        self.step
    }

    /// Apply one update. `params` and `grads` must list the same tensors in
    /// the same order on every call.
    pub fn step(&mut self, params: Vec<&mut [f64]>, grads: Vec<&[f64]>) {
        debug_assert_eq!(params.len(), grads.len());

        if self.moments.len() != params.len() {
            self.moments = params
                .iter()
                .map(|p| Moments {
                    first: vec![0.0; p.len()],
                    second: vec![0.0; p.len()],
                })
                .collect();
        }

        self.step += 1;
        let bias1 = 1.0 - BETA1.powi(self.step);
        let bias2 = 1.0 - BETA2.powi(self.step);

        for ((param, grad), moments) in params.into_iter().zip(grads).zip(&mut self.moments) {
            for i in 0..param.len() {
                let g = grad[i];
                moments.first[i] = BETA1 * moments.first[i] + (1.0 - BETA1) * g;
                moments.second[i] = BETA2 * moments.second[i] + (1.0 - BETA2) * g * g;
                let m_hat = moments.first[i] / bias1;
                let v_hat = moments.second[i] / bias2;
                param[i] -= self.learning_rate * m_hat / (v_hat.sqrt() + EPSILON);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimizes_quadratic() {
        // f(x) = (x - 3)^2
        let mut x = vec![0.0];
        let mut adam = Adam::new(0.1);
        for _ in 0..500 {
            let grad = vec![2.0 * (x[0] - 3.0)];
            adam.step(vec![x.as_mut_slice()], vec![grad.as_slice()]);
        }
        assert!((x[0] - 3.0).abs() < 0.05);
        assert_eq!(adam.steps(), 500);
    }

    #[test]
    fn test_first_step_moves_by_learning_rate() {
        let mut x = vec![1.0, -1.0];
        let mut adam = Adam::new(0.01);
        let grad = [4.0, -0.5];
        adam.step(vec![x.as_mut_slice()], vec![&grad[..]]);

        assert!((x[0] - 0.99).abs() < 1e-6);
        assert!((x[1] + 0.99).abs() < 1e-6);
    }
}
