//! Evolutionary training of rocket controllers.
//!
//! This crate trains [`PolicyNetwork`](network::PolicyNetwork) controllers for
//! the rockets simulated by `rocketry-engine`. It uses no gradients: a
//! population of networks flies in lock-step, survival time is the fitness,
//! and the next generation is bred from the best third of the population.
//!
//! # How Training Works
//!
//! 1. **Population** - N individuals, each a network paired with its own environment
//! 2. **Episode** - Every individual flies until its rocket leaves the screen
//! 3. **Ranking** - Individuals are ranked by time survived (ties keep population order)
//! 4. **Breeding** - Tiers below the best are replaced by mutated or blended copies of the best
//! 5. **Uniqueness** - Networks with duplicate signatures are nudged until unique
//! 6. **Reset** - Every environment is reset and the next epoch starts
//!
//! # Architecture
//!
//! ```text
//! Environment (rocketry-engine)
//!     ↓ observation
//! PolicyNetwork
//!     ↓ engine command
//! Environment
//!     ↓ survival time
//! EvolutionEngine ── ranks, breeds ──> next generation of PolicyNetworks
//!     ↓ events
//! EvolutionObserver (host: logging, rendering, export)
//! ```
//!
//! # Example
//!
//! ```
//! use rocketry_training::{config::TrainingConfig, genetic::EvolutionEngine};
//!
//! let config = TrainingConfig {
//!     population_size: 6,
//!     ..TrainingConfig::default()
//! };
//! let mut engine = EvolutionEngine::from_seed(config, 7).unwrap();
//! for _ in 0..2 {
//!     // cap episodes at 60 simulated seconds
//!     engine.run_epoch_with_limit(&mut (), 60.0).unwrap();
//!     let summary = engine.next_generation(&mut ()).unwrap();
//!     assert!(summary.best_fitness > 0.0);
//! }
//! assert_eq!(engine.epoch(), 3);
//! ```
//!
//! # Current Limitations
//!
//! - **Unbounded episodes**: an episode only ends when the rocket leaves the
//!   screen, so a controller that hovers forever never finishes its epoch.
//!   Hosts that need bounded runtime use
//!   [`run_epoch_with_limit`](genetic::EvolutionEngine::run_epoch_with_limit)
//!   or call [`terminate_active`](genetic::EvolutionEngine::terminate_active) themselves.
//! - **Single-threaded**: individuals are advanced sequentially within a round.
//! - **Coarse de-duplication**: signatures are weight sums and may collide.

use rocketry_engine::ConfigError;

pub mod config;
pub mod genetic;
pub mod network;
pub mod observer;
pub mod stats;

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum TrainingConfigError {
    #[display("invalid simulation config: {_0}")]
    #[from]
    Simulation(ConfigError),
    #[display("population size must be positive")]
    EmptyPopulation,
    #[display("hidden layer {index} has zero width")]
    ZeroLayerWidth { index: usize },
    #[display("{name} must be within [0, 1], got {value}")]
    Probability { name: &'static str, value: f64 },
    #[display("{name} must be positive so duplicates can be mutated apart, got {value}")]
    NonPositiveRate { name: &'static str, value: f64 },
    #[display("expected {expected} networks, got {actual}")]
    PopulationMismatch { expected: usize, actual: usize },
    #[display("network {index} does not match the configured hidden layers")]
    ArchitectureMismatch { index: usize },
}

/// Two networks with different layer shapes cannot be blended.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("cannot blend networks of shapes {left:?} and {right:?}")]
pub struct ShapeMismatchError {
    pub left: Vec<(usize, usize)>,
    pub right: Vec<(usize, usize)>,
}

/// Nested weight arrays that do not describe a valid policy network.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum WeightFormatError {
    #[display("network has no layers")]
    NoLayers,
    #[display("layer {layer} has no columns")]
    EmptyLayer { layer: usize },
    #[display("layer {layer} row {row} differs in length from row 0")]
    Ragged { layer: usize, row: usize },
    #[display("layer {layer} has {actual} rows, expected {expected}")]
    RowCount {
        layer: usize,
        expected: usize,
        actual: usize,
    },
    #[display("last layer has {actual} outputs, expected {expected}")]
    OutputSize { expected: usize, actual: usize },
}

/// Epoch time limit that is NaN or not positive.
#[derive(Debug, Clone, Copy, PartialEq, derive_more::Display, derive_more::Error)]
#[display("time limit must be positive, got {time_limit}")]
pub struct TimeLimitError {
    pub time_limit: f64,
}

/// Failure to produce the next generation.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum GenerationError {
    #[display("{active} episodes are still running")]
    EpochInProgress { active: usize },
    #[display("crossover failed: {_0}")]
    #[from]
    Crossover(ShapeMismatchError),
}
