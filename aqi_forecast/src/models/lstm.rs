//! Long short-term memory layer
//!
//! A single recurrent layer that consumes a whole window and returns only
//! its final hidden state. Gate rows are laid out input, forget, cell,
//! output, each `units` long.

use crate::error::{ForecastError, Result};
use crate::models::dense::check_tensor;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// LSTM layer parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmLayer {
    input_size: usize,
    units: usize,
    /// Row-major `4*units x input_size`
    kernel: Vec<f64>,
    /// Row-major `4*units x units`
    recurrent: Vec<f64>,
    bias: Vec<f64>,
}

/// Gradients matching an [`LstmLayer`]'s parameters
#[derive(Debug, Clone)]
pub struct LstmGradients {
    pub kernel: Vec<f64>,
    pub recurrent: Vec<f64>,
    pub bias: Vec<f64>,
}

#[derive(Debug, Clone)]
struct LstmStep {
    h_prev: Vec<f64>,
    c_prev: Vec<f64>,
    input_gate: Vec<f64>,
    forget_gate: Vec<f64>,
    candidate: Vec<f64>,
    output_gate: Vec<f64>,
    tanh_cell: Vec<f64>,
}

/// Per-timestep activations kept for backpropagation through time
#[derive(Debug, Clone)]
pub struct LstmCache {
    sequence: Vec<f64>,
    steps: Vec<LstmStep>,
}

impl LstmLayer {
    /// Glorot-uniform kernel, orthogonal recurrent weights, zero bias with
    /// the forget gate bias set to one.
    pub fn new<R: Rng>(input_size: usize, units: usize, rng: &mut R) -> Self {
        let rows = 4 * units;

        let limit = (6.0 / (input_size + rows) as f64).sqrt();
        let kernel = (0..rows * input_size)
            .map(|_| rng.gen_range(-limit..limit))
            .collect();

        let mut bias = vec![0.0; rows];
        bias[units..2 * units].iter_mut().for_each(|b| *b = 1.0);

        Self {
            input_size,
            units,
            kernel,
            recurrent: orthogonal_columns(rows, units, rng),
            bias,
        }
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn units(&self) -> usize {
        self.units
    }

    /// Check that the stored tensors match the declared sizes
    pub fn validate(&self) -> Result<()> {
        if self.input_size == 0 || self.units == 0 {
            return Err(ForecastError::InvalidParameter(
                "LSTM sizes must be greater than zero".to_string(),
            ));
        }
        let rows = 4 * self.units;
        check_tensor("lstm kernel", &self.kernel, rows * self.input_size)?;
        check_tensor("lstm recurrent", &self.recurrent, rows * self.units)?;
        check_tensor("lstm bias", &self.bias, rows)
    }

    fn gate_preactivations(&self, x: &[f64], h_prev: &[f64]) -> Vec<f64> {
        let rows = 4 * self.units;
        let mut z = self.bias.clone();
        for (r, zr) in z.iter_mut().enumerate().take(rows) {
            let k = &self.kernel[r * self.input_size..(r + 1) * self.input_size];
            let u = &self.recurrent[r * self.units..(r + 1) * self.units];
            *zr += k.iter().zip(x).map(|(w, v)| w * v).sum::<f64>()
                + u.iter().zip(h_prev).map(|(w, v)| w * v).sum::<f64>();
        }
        z
    }

    fn run(&self, sequence: &[f64], mut record: Option<&mut Vec<LstmStep>>) -> Vec<f64> {
        let h = self.units;
        let mut hidden = vec![0.0; h];
        let mut cell = vec![0.0; h];

        for x in sequence.chunks(self.input_size) {
            let z = self.gate_preactivations(x, &hidden);
            let input_gate: Vec<f64> = z[..h].iter().map(|&v| sigmoid(v)).collect();
            let forget_gate: Vec<f64> = z[h..2 * h].iter().map(|&v| sigmoid(v)).collect();
            let candidate: Vec<f64> = z[2 * h..3 * h].iter().map(|&v| v.tanh()).collect();
            let output_gate: Vec<f64> = z[3 * h..].iter().map(|&v| sigmoid(v)).collect();

            let next_cell: Vec<f64> = (0..h)
                .map(|j| forget_gate[j] * cell[j] + input_gate[j] * candidate[j])
                .collect();
            let tanh_cell: Vec<f64> = next_cell.iter().map(|c| c.tanh()).collect();
            let next_hidden: Vec<f64> = (0..h).map(|j| output_gate[j] * tanh_cell[j]).collect();

            if let Some(steps) = record.as_mut() {
                steps.push(LstmStep {
                    h_prev: std::mem::replace(&mut hidden, next_hidden),
                    c_prev: std::mem::replace(&mut cell, next_cell),
                    input_gate,
                    forget_gate,
                    candidate,
                    output_gate,
                    tanh_cell,
                });
            } else {
                hidden = next_hidden;
                cell = next_cell;
            }
        }

        hidden
    }

    /// Final hidden state for a flattened `timesteps x input_size` sequence
    pub fn infer(&self, sequence: &[f64]) -> Vec<f64> {
        self.run(sequence, None)
    }

    /// Final hidden state plus the activations needed by [`Self::backward`]
    pub fn forward(&self, sequence: &[f64]) -> (Vec<f64>, LstmCache) {
        let mut steps = Vec::with_capacity(sequence.len() / self.input_size.max(1));
        let hidden = self.run(sequence, Some(&mut steps));
        (
            hidden,
            LstmCache {
                sequence: sequence.to_vec(),
                steps,
            },
        )
    }

    /// Backpropagation through time from a gradient on the final hidden state
    pub fn backward(&self, cache: &LstmCache, d_hidden: &[f64], grads: &mut LstmGradients) {
        let h = self.units;
        let mut dh = d_hidden.to_vec();
        let mut dc = vec![0.0; h];
        let mut dz = vec![0.0; 4 * h];

        for (t, step) in cache.steps.iter().enumerate().rev() {
            let x = &cache.sequence[t * self.input_size..(t + 1) * self.input_size];

            for j in 0..h {
                let i = step.input_gate[j];
                let f = step.forget_gate[j];
                let g = step.candidate[j];
                let o = step.output_gate[j];
                let tc = step.tanh_cell[j];

                let d_out = dh[j] * tc;
                let d_cell = dc[j] + dh[j] * o * (1.0 - tc * tc);

                dz[j] = d_cell * g * i * (1.0 - i);
                dz[h + j] = d_cell * step.c_prev[j] * f * (1.0 - f);
                dz[2 * h + j] = d_cell * i * (1.0 - g * g);
                dz[3 * h + j] = d_out * o * (1.0 - o);

                dc[j] = d_cell * f;
            }

            dh.iter_mut().for_each(|v| *v = 0.0);
            for (r, &dzr) in dz.iter().enumerate() {
                if dzr == 0.0 {
                    continue;
                }
                grads.bias[r] += dzr;

                let k_off = r * self.input_size;
                for (k, &xk) in x.iter().enumerate() {
                    grads.kernel[k_off + k] += dzr * xk;
                }

                let u_off = r * h;
                for j in 0..h {
                    grads.recurrent[u_off + j] += dzr * step.h_prev[j];
                    dh[j] += dzr * self.recurrent[u_off + j];
                }
            }
        }
    }

    /// Zeroed gradient buffers shaped like this layer
    pub fn zero_gradients(&self) -> LstmGradients {
        LstmGradients {
            kernel: vec![0.0; self.kernel.len()],
            recurrent: vec![0.0; self.recurrent.len()],
            bias: vec![0.0; self.bias.len()],
        }
    }

    /// Mutable parameter tensors, in the order used by the optimizer
    pub fn parameters_mut(&mut self) -> [&mut [f64]; 3] {
        [
            self.kernel.as_mut_slice(),
            self.recurrent.as_mut_slice(),
            self.bias.as_mut_slice(),
        ]
    }
}

impl LstmGradients {
    /// Gradient tensors, in the same order as [`LstmLayer::parameters_mut`]
    pub fn tensors(&self) -> [&[f64]; 3] {
        [
            self.kernel.as_slice(),
            self.recurrent.as_slice(),
            self.bias.as_slice(),
        ]
    }
}

/// Row-major `rows x cols` matrix whose columns are orthonormal
/// (Gram-Schmidt over Gaussian samples). Requires `rows >= cols`.
fn orthogonal_columns<R: Rng>(rows: usize, cols: usize, rng: &mut R) -> Vec<f64> {
    let mut basis: Vec<Vec<f64>> = Vec::with_capacity(cols);

    while basis.len() < cols {
        let mut v: Vec<f64> = (0..rows).map(|_| rng.sample(StandardNormal)).collect();
        for q in &basis {
            let dot: f64 = v.iter().zip(q).map(|(a, b)| a * b).sum();
            v.iter_mut().zip(q).for_each(|(a, b)| *a -= dot * b);
        }
        let norm = v.iter().map(|a| a * a).sum::<f64>().sqrt();
        if norm > 1e-8 {
            v.iter_mut().for_each(|a| *a /= norm);
            basis.push(v);
        }
    }

    let mut matrix = vec![0.0; rows * cols];
    for (c, column) in basis.iter().enumerate() {
        for (r, &value) in column.iter().enumerate() {
            matrix[r * cols + c] = value;
        }
    }
    matrix
}
