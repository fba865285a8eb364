//! Fixed-topology feed-forward policy network.
//!
//! A [`PolicyNetwork`] maps the 11-value sensory vector of an
//! [`Environment`](rocketry_engine::Environment) to three engine commands
//! (`top`, `bottom`, `main`), each in `(-1, 1)`.
//!
//! # Layout
//!
//! The network is a sequence of dense layers. A layer with `n` inputs and `m`
//! outputs is an `(n + 1) × m` row-major matrix: every input vector is
//! prepended with a constant `1`, so row 0 holds the biases. Every layer,
//! including the last, applies `tanh`.
//!
//! ```text
//! [1, obs_0..obs_10] · W0 -> tanh -> [1, h_0..h_11] · W1 -> tanh -> ... -> [top, bottom, main]
//! ```
//!
//! # Genetic operators
//!
//! Networks are immutable from the evolver's point of view: every operator
//! ([`mutate_full_layer`](PolicyNetwork::mutate_full_layer),
//! [`mutate_partial`](PolicyNetwork::mutate_partial),
//! [`blend`](PolicyNetwork::blend)) returns a new network and leaves its
//! inputs untouched.
//!
//! # Weight export
//!
//! [`serialize`] / [`deserialize`] convert to and from nested arrays (one
//! matrix per layer, one inner array per row). Serde uses the same format, so a
//! network serializes to JSON as `[[[w, ...], ...], ...]`.

use rand::Rng;
use rocketry_engine::{OBSERVATION_SIZE, Observation, PowerCommand};
use serde::{Deserialize, Serialize};

use crate::{ShapeMismatchError, WeightFormatError};

/// Network input width (the sensory vector).
pub const INPUT_SIZE: usize = OBSERVATION_SIZE;
/// Network output width: top, bottom and main engine power.
pub const OUTPUT_SIZE: usize = 3;
/// Hidden layer widths used when none are configured.
pub const DEFAULT_HIDDEN_LAYERS: [usize; 4] = [12, 15, 9, 6];

/// Weights of a network as nested arrays: `layers[layer][row][column]`.
pub type LayerArrays = Vec<Vec<Vec<f64>>>;

/// A dense layer stored row-major; row 0 is the bias row.
#[derive(Debug, Clone, PartialEq)]
struct Layer {
    rows: usize,
    cols: usize,
    weights: Vec<f64>,
}

impl Layer {
    fn from_fn<F>(rows: usize, cols: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> f64,
    {
        let mut weights = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                weights.push(f(r, c));
            }
        }
        Self {
            rows,
            cols,
            weights,
        }
    }

    fn random<R>(rows: usize, cols: usize, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        Self::from_fn(rows, cols, |_, _| rng.random_range(-1.0..=1.0))
    }

    fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    fn row_mut(&mut self, row: usize) -> &mut [f64] {
        &mut self.weights[row * self.cols..(row + 1) * self.cols]
    }

    fn forward(&self, input: &[f64]) -> Vec<f64> {
        assert_eq!(
            input.len() + 1,
            self.rows,
            "layer expects {} inputs",
            self.rows - 1
        );
        (0..self.cols)
            .map(|c| {
                let mut sum = self.weights[c];
                for (r, x) in input.iter().enumerate() {
                    sum += x * self.weights[(r + 1) * self.cols + c];
                }
                sum.tanh()
            })
            .collect()
    }
}

/// Feed-forward controller mapping observations to engine commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "LayerArrays", try_from = "LayerArrays")]
pub struct PolicyNetwork {
    layers: Vec<Layer>,
}

impl PolicyNetwork {
    /// Creates a network with the given hidden layer widths and weights drawn
    /// uniformly from `[-1, 1]`.
    pub fn random<R>(hidden_layers: &[usize], rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let layers = layer_shapes(hidden_layers)
            .map(|(rows, cols)| Layer::random(rows, cols, rng))
            .collect();
        Self { layers }
    }

    /// Creates a network whose weights are all produced by `f(layer, row, column)`.
    pub fn from_fn<F>(hidden_layers: &[usize], mut f: F) -> Self
    where
        F: FnMut(usize, usize, usize) -> f64,
    {
        let layers = layer_shapes(hidden_layers)
            .enumerate()
            .map(|(l, (rows, cols))| Layer::from_fn(rows, cols, |r, c| f(l, r, c)))
            .collect();
        Self { layers }
    }

    /// Widths of the hidden layers (the configurable part of the topology).
    #[must_use]
    pub fn hidden_layers(&self) -> Vec<usize> {
        self.layers[..self.layers.len() - 1]
            .iter()
            .map(|l| l.cols)
            .collect()
    }

    /// `(rows, columns)` of every weight matrix.
    #[must_use]
    pub fn shapes(&self) -> Vec<(usize, usize)> {
        self.layers.iter().map(Layer::shape).collect()
    }

    /// Runs the network on an observation.
    ///
    /// # Panics
    ///
    /// Panics if `input` does not have [`INPUT_SIZE`] elements.
    #[must_use]
    pub fn forward(&self, input: &[f64]) -> [f64; OUTPUT_SIZE] {
        let mut activations = input.to_vec();
        for layer in &self.layers {
            activations = layer.forward(&activations);
        }
        let mut output = [0.0; OUTPUT_SIZE];
        output.copy_from_slice(&activations);
        output
    }

    /// Converts the network's decision for `observation` into an engine command.
    ///
    /// All three powers are set; the main engine value is remapped by the rocket.
    #[must_use]
    pub fn command(&self, observation: &Observation) -> PowerCommand {
        let [top, bottom, main] = self.forward(observation);
        PowerCommand::all(top, bottom, main)
    }

    /// Returns a copy in which each layer is, with probability `aggressiveness`,
    /// replaced by a fresh random layer of the same shape.
    #[must_use]
    pub fn mutate_full_layer<R>(&self, aggressiveness: f64, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let mut mutated = self.clone();
        for layer in &mut mutated.layers {
            if rng.random_bool(aggressiveness) {
                *layer = Layer::random(layer.rows, layer.cols, rng);
            }
        }
        mutated
    }

    /// Returns a copy in which each row of each layer is, with probability
    /// `aggressiveness`, pulled towards fresh noise:
    /// `w' = w * (1 - magnitude) + r * magnitude` with `r ~ U[-1, 1]` per weight.
    #[must_use]
    pub fn mutate_partial<R>(&self, aggressiveness: f64, magnitude: f64, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let mut mutated = self.clone();
        for layer in &mut mutated.layers {
            for row in 0..layer.rows {
                if !rng.random_bool(aggressiveness) {
                    continue;
                }
                for w in layer.row_mut(row) {
                    let r: f64 = rng.random_range(-1.0..=1.0);
                    *w = *w * (1.0 - magnitude) + r * magnitude;
                }
            }
        }
        mutated
    }

    /// Weighted average of two networks:
    /// `self_weight * self + (1 - self_weight) * other`, elementwise.
    pub fn blend(&self, other: &Self, self_weight: f64) -> Result<Self, ShapeMismatchError> {
        if self.shapes() != other.shapes() {
            return Err(ShapeMismatchError {
                left: self.shapes(),
                right: other.shapes(),
            });
        }
        let layers = self
            .layers
            .iter()
            .zip(&other.layers)
            .map(|(a, b)| Layer {
                rows: a.rows,
                cols: a.cols,
                weights: a
                    .weights
                    .iter()
                    .zip(&b.weights)
                    .map(|(x, y)| self_weight * x + (1.0 - self_weight) * y)
                    .collect(),
            })
            .collect();
        Ok(Self { layers })
    }

    /// Sum of all weights.
    ///
    /// A cheap fingerprint for spotting duplicate networks; distinct networks
    /// may collide.
    #[must_use]
    pub fn signature(&self) -> f64 {
        self.layers
            .iter()
            .map(|l| l.weights.iter().sum::<f64>())
            .sum()
    }
}

impl From<PolicyNetwork> for LayerArrays {
    fn from(network: PolicyNetwork) -> Self {
        serialize(&network)
    }
}

impl TryFrom<LayerArrays> for PolicyNetwork {
    type Error = WeightFormatError;

    fn try_from(layers: LayerArrays) -> Result<Self, Self::Error> {
        deserialize(&layers)
    }
}

/// Exports the weights as nested arrays, one row-major matrix per layer.
#[must_use]
pub fn serialize(network: &PolicyNetwork) -> LayerArrays {
    network
        .layers
        .iter()
        .map(|l| l.weights.chunks(l.cols).map(<[f64]>::to_vec).collect())
        .collect()
}

/// Rebuilds a network from nested arrays produced by [`serialize`].
///
/// The matrices must be rectangular and chain into a valid topology: the first
/// takes [`INPUT_SIZE`] inputs, each next layer takes the previous layer's
/// outputs, and the last produces [`OUTPUT_SIZE`] outputs.
pub fn deserialize(arrays: &[Vec<Vec<f64>>]) -> Result<PolicyNetwork, WeightFormatError> {
    if arrays.is_empty() {
        return Err(WeightFormatError::NoLayers);
    }
    let mut layers = Vec::with_capacity(arrays.len());
    let mut expected_inputs = INPUT_SIZE;
    for (index, matrix) in arrays.iter().enumerate() {
        let rows = matrix.len();
        let cols = matrix.first().map_or(0, Vec::len);
        if cols == 0 {
            return Err(WeightFormatError::EmptyLayer { layer: index });
        }
        if let Some(row) = matrix.iter().position(|r| r.len() != cols) {
            return Err(WeightFormatError::Ragged { layer: index, row });
        }
        if rows != expected_inputs + 1 {
            return Err(WeightFormatError::RowCount {
                layer: index,
                expected: expected_inputs + 1,
                actual: rows,
            });
        }
        layers.push(Layer {
            rows,
            cols,
            weights: matrix.concat(),
        });
        expected_inputs = cols;
    }
    if expected_inputs != OUTPUT_SIZE {
        return Err(WeightFormatError::OutputSize {
            expected: OUTPUT_SIZE,
            actual: expected_inputs,
        });
    }
    Ok(PolicyNetwork { layers })
}

/// Matrix shapes of a network with the given hidden layer widths.
fn layer_shapes(hidden_layers: &[usize]) -> impl Iterator<Item = (usize, usize)> + '_ {
    let inputs = std::iter::once(INPUT_SIZE).chain(hidden_layers.iter().copied());
    let outputs = hidden_layers
        .iter()
        .copied()
        .chain(std::iter::once(OUTPUT_SIZE));
    inputs.zip(outputs).map(|(i, o)| (i + 1, o))
}
