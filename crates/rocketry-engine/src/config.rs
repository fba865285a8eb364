//! Immutable simulation parameters.
//!
//! Every knob the physics model and the per-individual environment read lives
//! here. Configurations are plain data: they are validated once with
//! [`SimulationConfig::validate`] and then passed by reference to constructors.
//! Nothing in the engine keeps module-level defaults.
//!
//! All structs deserialize with `#[serde(default)]`, so a partial JSON document
//! only overrides the fields it names:
//!
//! ```
//! use rocketry_engine::SimulationConfig;
//!
//! let config: SimulationConfig = serde_json::from_str(r#"{ "speed": 4 }"#).unwrap();
//! assert_eq!(config.speed, 4);
//! assert_eq!(config.width, 800.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Constants of the rocket's planar dynamics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Gravitational acceleration, always subtracted from the vertical acceleration.
    pub gravity: f64,
    /// Fuel burned per unit of time per unit of absolute engine power.
    pub fuel_consumption: f64,
    /// Divisor turning the top/bottom thrust difference into angular acceleration.
    pub rotation_inertia: f64,
    /// Divisor turning thrust into linear acceleration.
    pub move_inertia: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: 9.81,
            fuel_consumption: 0.008,
            rotation_inertia: 3.0,
            move_inertia: 0.04,
        }
    }
}

/// Parameters of one [`Environment`](crate::Environment).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Screen width; the rocket must stay within `[0, width]`.
    pub width: f64,
    /// Screen height; the rocket must stay within `[0, height]`.
    pub height: f64,
    /// Simulated seconds advanced by a single physics step.
    pub time_step: f64,
    /// Physics steps performed per lock-step round.
    pub speed: usize,
    /// Rocket-to-barrel distance below which the barrel is collected.
    pub barrel_pickup_radius: f64,
    pub physics: PhysicsConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            time_step: 0.06,
            speed: 1,
            barrel_pickup_radius: 40.0,
            physics: PhysicsConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Checks that every quantity the simulation divides by or steps with is positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
            if value.is_nan() || value <= 0.0 {
                return Err(ConfigError::NonPositive { name, value });
            }
            Ok(())
        }

        positive("width", self.width)?;
        positive("height", self.height)?;
        positive("time_step", self.time_step)?;
        positive("rotation_inertia", self.physics.rotation_inertia)?;
        positive("move_inertia", self.physics.move_inertia)?;
        if self.speed == 0 {
            return Err(ConfigError::ZeroSpeed);
        }
        Ok(())
    }
}
