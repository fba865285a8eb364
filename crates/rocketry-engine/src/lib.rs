//! Deterministic rocket flight simulation.
//!
//! This crate contains the physics half of the trainer:
//!
//! - [`RocketDynamics`] - planar rocket dynamics advanced by a fixed time step
//! - [`Environment`] - one rocket on a bounded screen with a fuel barrel to chase
//! - [`BarrelSchedule`] - the fixed cyclic sequence of barrel placements
//! - [`SimulationConfig`] / [`PhysicsConfig`] - immutable simulation parameters
//!
//! The simulation contains no randomness: the same commands always produce the
//! same trajectory, barrel positions, and fitness.
//!
//! # Example
//!
//! ```
//! use rocketry_engine::{Environment, PowerCommand, SimulationConfig};
//!
//! let mut env = Environment::new(SimulationConfig::default()).unwrap();
//! while !env.is_terminated() {
//!     env.apply_command(PowerCommand::new().main(-1.0));
//!     env.tick();
//! }
//! assert!(env.fitness().unwrap() > 0.0);
//! ```

pub use self::{barrel::*, config::*, environment::*, rocket::*};

mod barrel;
pub mod config;
mod environment;
mod rocket;

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum ConfigError {
    #[display("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },
    #[display("speed must be at least one step per round")]
    ZeroSpeed,
}
