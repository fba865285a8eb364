use std::f64::consts::TAU;

use crate::PhysicsConfig;

/// Complete dynamic state of a rocket.
///
/// Engine powers are stored as last commanded: `top` and `bottom` in `[-1, 1]`,
/// `main` already remapped into `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlightState {
    pub velocity_x: f64,
    pub velocity_y: f64,
    /// Radians, reduced with `%` after every step.
    ///
    /// The remainder keeps the sign of the dividend, so a rotation that went
    /// negative stays negative (in `(-2π, 0]`) rather than wrapping to `[0, 2π)`.
    pub rotation: f64,
    pub rotation_velocity: f64,
    /// Remaining fuel in `[0, 1]`.
    pub fuel_level: f64,
    pub top_engine_power: f64,
    pub bottom_engine_power: f64,
    pub main_engine_power: f64,
}

impl FlightState {
    /// Resting state: no motion, full tank, engines off.
    pub const INITIAL: Self = Self {
        velocity_x: 0.0,
        velocity_y: 0.0,
        rotation: 0.0,
        rotation_velocity: 0.0,
        fuel_level: 1.0,
        top_engine_power: 0.0,
        bottom_engine_power: 0.0,
        main_engine_power: 0.0,
    };
}

impl Default for FlightState {
    fn default() -> Self {
        Self::INITIAL
    }
}

/// A partial engine command.
///
/// Fields left as `None` keep the rocket's current power; `Some(0.0)` is a
/// real command that switches the engine off.
///
/// ```
/// use rocketry_engine::{PhysicsConfig, PowerCommand, RocketDynamics};
///
/// let mut rocket = RocketDynamics::new(PhysicsConfig::default());
/// rocket.set_command(PowerCommand::new().top(0.5).bottom(-0.5));
/// rocket.set_command(PowerCommand::new().bottom(1.0));
/// assert_eq!(rocket.state().top_engine_power, 0.5);
/// assert_eq!(rocket.state().bottom_engine_power, 1.0);
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PowerCommand {
    pub top: Option<f64>,
    pub bottom: Option<f64>,
    /// Main engine power in `[-1, 1]`, remapped to `[0, 1]` when applied.
    pub main: Option<f64>,
}

impl PowerCommand {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            top: None,
            bottom: None,
            main: None,
        }
    }

    /// Command setting all three engines, as produced by a controller.
    #[must_use]
    pub const fn all(top: f64, bottom: f64, main: f64) -> Self {
        Self {
            top: Some(top),
            bottom: Some(bottom),
            main: Some(main),
        }
    }

    #[must_use]
    pub const fn top(mut self, power: f64) -> Self {
        self.top = Some(power);
        self
    }

    #[must_use]
    pub const fn bottom(mut self, power: f64) -> Self {
        self.bottom = Some(power);
        self
    }

    #[must_use]
    pub const fn main(mut self, power: f64) -> Self {
        self.main = Some(power);
        self
    }
}

/// Planar rocket dynamics with a main engine and two lateral thrusters.
///
/// ```text
///     /|\
///    /   \
///   |-----|   <- top engine
///   |     |
///   |     |
///  <|-----|>  <- bottom engine
///   =======
///     VVV     <- main engine
/// ```
///
/// The top and bottom thrusters spin the rocket in opposite directions; when
/// they push the same way the weaker one also produces sideways thrust.
#[derive(Debug, Clone)]
pub struct RocketDynamics {
    physics: PhysicsConfig,
    state: FlightState,
}

impl RocketDynamics {
    #[must_use]
    pub fn new(physics: PhysicsConfig) -> Self {
        Self {
            physics,
            state: FlightState::INITIAL,
        }
    }

    #[must_use]
    pub fn state(&self) -> &FlightState {
        &self.state
    }

    #[must_use]
    pub fn physics(&self) -> &PhysicsConfig {
        &self.physics
    }

    pub fn reset(&mut self) {
        self.state = FlightState::INITIAL;
    }

    /// Fills the tank.
    pub fn refuel(&mut self) {
        self.state.fuel_level = 1.0;
    }

    /// Applies a partial command.
    ///
    /// An empty tank overrides whatever was requested: side engines are set to
    /// zero and the main engine to `-1` (zero after remapping). The override
    /// happens here, so a step already using the previous powers is unaffected.
    pub fn set_command(&mut self, command: PowerCommand) {
        let command = if self.state.fuel_level <= 0.0 {
            PowerCommand::all(0.0, 0.0, -1.0)
        } else {
            command
        };

        if let Some(top) = command.top {
            self.state.top_engine_power = top;
        }
        if let Some(bottom) = command.bottom {
            self.state.bottom_engine_power = bottom;
        }
        if let Some(main) = command.main {
            // [-1, 1] -> [0, 1]
            self.state.main_engine_power = (main + 1.0) / 2.0;
        }
    }

    /// Advances the state by `dt` using the current engine powers.
    ///
    /// Returns the updated `(velocity_x, velocity_y)`.
    pub fn step(&mut self, dt: f64) -> (f64, f64) {
        debug_assert!(dt > 0.0, "time step must be positive, got {dt}");
        let PhysicsConfig {
            gravity,
            fuel_consumption,
            rotation_inertia,
            move_inertia,
        } = self.physics;
        let s = &mut self.state;
        let (top, bottom, main) = (
            s.top_engine_power,
            s.bottom_engine_power,
            s.main_engine_power,
        );

        s.fuel_level -= fuel_consumption * dt * (top.abs() + bottom.abs() + main.abs());
        s.fuel_level = s.fuel_level.max(0.0);

        let mut rotation_acceleration = 0.0;
        let mut acceleration_x = 0.0;
        let mut acceleration_y = 0.0;
        if s.fuel_level > 0.0 {
            rotation_acceleration = (top - bottom) / rotation_inertia;
            let side = side_thrust(top, bottom);
            let rotation = s.rotation;
            acceleration_x = (main * (-rotation).sin() - side * rotation.cos()) / move_inertia;
            acceleration_y = (main * (-rotation).cos() - side * rotation.sin()) / move_inertia;
        }
        acceleration_y -= gravity;

        s.rotation_velocity += dt * rotation_acceleration;
        s.velocity_x += dt * acceleration_x;
        s.velocity_y += dt * acceleration_y;
        s.rotation += dt * s.rotation_velocity;
        s.rotation %= TAU;

        (s.velocity_x, s.velocity_y)
    }
}

/// Net sideways thrust of the two lateral engines.
///
/// Engines pushing the same way contribute the power closer to zero; engines
/// pushing opposite ways cancel out.
fn side_thrust(top: f64, bottom: f64) -> f64 {
    match (sign(top), sign(bottom)) {
        (Some(a), Some(b)) if a == b => {
            if a > 0 {
                top.min(bottom)
            } else {
                top.max(bottom)
            }
        }
        _ => 0.0,
    }
}

/// Sign of `value` as `-1`, `0` or `1`, treating `-0.0` as zero. `None` for NaN.
fn sign(value: f64) -> Option<i8> {
    if value.is_nan() {
        None
    } else if value > 0.0 {
        Some(1)
    } else if value < 0.0 {
        Some(-1)
    } else {
        Some(0)
    }
}
