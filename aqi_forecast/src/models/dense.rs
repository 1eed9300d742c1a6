//! Fully connected layer

use crate::error::{ForecastError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Check one parameter tensor's length and values
pub(crate) fn check_tensor(name: &str, values: &[f64], expected: usize) -> Result<()> {
    if values.len() != expected {
        return Err(ForecastError::InvalidParameter(format!(
            "{} holds {} values, expected {}",
            name,
            values.len(),
            expected
        )));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(ForecastError::InvalidParameter(format!(
            "{} contains non-finite values",
            name
        )));
    }
    Ok(())
}

/// Element-wise activation applied after the affine transform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Linear,
    Relu,
}

impl Activation {
    fn apply(self, z: f64) -> f64 {
        match self {
            Activation::Linear => z,
            Activation::Relu => z.max(0.0),
        }
    }

    fn derivative(self, z: f64) -> f64 {
        match self {
            Activation::Linear => 1.0,
            Activation::Relu => {
                if z > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

/// Dense layer computing `activation(W x + b)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseLayer {
    inputs: usize,
    units: usize,
    activation: Activation,
    /// Row-major `units x inputs`
    weights: Vec<f64>,
    bias: Vec<f64>,
}

/// Gradients matching a [`DenseLayer`]'s parameters
#[derive(Debug, Clone)]
pub struct DenseGradients {
    pub weights: Vec<f64>,
    pub bias: Vec<f64>,
}

/// Values kept from the forward pass for backpropagation
#[derive(Debug, Clone)]
pub struct DenseCache {
    input: Vec<f64>,
    pre_activation: Vec<f64>,
}

impl DenseLayer {
    /// Glorot-uniform weights, zero bias
    pub fn new<R: Rng>(
        inputs: usize,
        units: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Self {
        let limit = (6.0 / (inputs + units) as f64).sqrt();
        let weights = (0..inputs * units)
            .map(|_| rng.gen_range(-limit..limit))
            .collect();

        Self {
            inputs,
            units,
            activation,
            weights,
            bias: vec![0.0; units],
        }
    }

    pub fn inputs(&self) -> usize {
        self.inputs
    }

    pub fn units(&self) -> usize {
        self.units
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    /// Check that the stored tensors match the declared sizes
    pub fn validate(&self) -> Result<()> {
        if self.inputs == 0 || self.units == 0 {
            return Err(ForecastError::InvalidParameter(
                "Dense layer sizes must be greater than zero".to_string(),
            ));
        }
        check_tensor("dense weights", &self.weights, self.units * self.inputs)?;
        check_tensor("dense bias", &self.bias, self.units)
    }

    fn affine(&self, input: &[f64]) -> Vec<f64> {
        (0..self.units)
            .map(|u| {
                let row = &self.weights[u * self.inputs..(u + 1) * self.inputs];
                row.iter().zip(input).map(|(w, x)| w * x).sum::<f64>() + self.bias[u]
            })
            .collect()
    }

    /// Forward pass without keeping intermediate values
    pub fn infer(&self, input: &[f64]) -> Vec<f64> {
        self.affine(input)
            .into_iter()
            .map(|z| self.activation.apply(z))
            .collect()
    }

    /// Forward pass that records what backpropagation needs
    pub fn forward(&self, input: &[f64]) -> (Vec<f64>, DenseCache) {
        let pre_activation = self.affine(input);
        let output = pre_activation
            .iter()
            .map(|&z| self.activation.apply(z))
            .collect();

        (
            output,
            DenseCache {
                input: input.to_vec(),
                pre_activation,
            },
        )
    }

    /// Accumulate parameter gradients into `grads` and return the gradient
    /// with respect to the layer input
    pub fn backward(
        &self,
        cache: &DenseCache,
        d_output: &[f64],
        grads: &mut DenseGradients,
    ) -> Vec<f64> {
        let mut d_input = vec![0.0; self.inputs];

        for u in 0..self.units {
            let dz = d_output[u] * self.activation.derivative(cache.pre_activation[u]);
            if dz == 0.0 {
                continue;
            }
            grads.bias[u] += dz;
            let offset = u * self.inputs;
            for i in 0..self.inputs {
                grads.weights[offset + i] += dz * cache.input[i];
                d_input[i] += dz * self.weights[offset + i];
            }
        }

        d_input
    }

    /// Zeroed gradient buffers shaped like this layer
    pub fn zero_gradients(&self) -> DenseGradients {
        DenseGradients {
            weights: vec![0.0; self.weights.len()],
            bias: vec![0.0; self.bias.len()],
        }
    }

    /// Mutable parameter tensors, in the order used by the optimizer
    pub fn parameters_mut(&mut self) -> [&mut [f64]; 2] {
        [self.weights.as_mut_slice(), self.bias.as_mut_slice()]
    }
}

impl DenseGradients {
    /// Gradient tensors, in the same order as [`DenseLayer::parameters_mut`]
    pub fn tensors(&self) -> [&[f64]; 2] {
        [self.weights.as_slice(), self.bias.as_slice()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn layer(activation: Activation) -> DenseLayer {
        DenseLayer {
            inputs: 2,
            units: 2,
            activation,
            weights: vec![1.0, -1.0, 0.5, 0.5],
            bias: vec![0.0, 1.0],
        }
    }

    #[test]
    fn test_forward_linear_and_relu() {
        let input = [1.0, 3.0];
        assert_eq!(layer(Activation::Linear).infer(&input), vec![-2.0, 3.0]);
        assert_eq!(layer(Activation::Relu).infer(&input), vec![0.0, 3.0]);
    }

    #[test]
    fn test_backward_matches_finite_difference() {
        let mut rng = StdRng::seed_from_u64(3);
        let dense = DenseLayer::new(3, 2, Activation::Linear, &mut rng);
        let input = [0.2, -0.4, 0.9];

        // loss = sum(outputs)
        let (_, cache) = dense.forward(&input);
        let mut grads = dense.zero_gradients();
        let d_input = dense.backward(&cache, &[1.0, 1.0], &mut grads);

        let eps = 1e-6;
        for i in 0..3 {
            let mut shifted = input;
            shifted[i] += eps;
            let numeric = (dense.infer(&shifted).iter().sum::<f64>()
                - dense.infer(&input).iter().sum::<f64>())
                / eps;
            assert!((numeric - d_input[i]).abs() < 1e-5);
        }
        assert_eq!(grads.bias, vec![1.0, 1.0]);
    }
}
