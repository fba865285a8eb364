use crate::{BarrelSchedule, ConfigError, FlightState, PowerCommand, RocketDynamics, SimulationConfig};

/// Length of the sensory vector produced by [`Environment::observe`].
pub const OBSERVATION_SIZE: usize = 11;

/// Sensory vector, in this order:
///
/// | index | value                     |
/// |-------|---------------------------|
/// | 0     | `velocity_x`              |
/// | 1     | `velocity_y`              |
/// | 2     | `(width - x) / width`     |
/// | 3     | `(height - y) / height`   |
/// | 4     | `x / width`               |
/// | 5     | `y / height`              |
/// | 6     | `rotation_velocity`       |
/// | 7     | `rotation`                |
/// | 8     | `fuel_level`              |
/// | 9     | `(barrel_x - x) / width`  |
/// | 10    | `(barrel_y - y) / height` |
pub type Observation = [f64; OBSERVATION_SIZE];

/// Result of a single [`Environment::tick`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    /// Observation after the tick.
    pub observation: Observation,
    pub terminated: bool,
}

/// One rocket flying on a bounded screen while chasing fuel barrels.
///
/// Screen coordinates grow rightwards and downwards; the position moves
/// *against* the velocity (`position -= velocity * dt`), so positive
/// `velocity_y` means climbing.
///
/// The episode ends as soon as the rocket leaves `[0, width] × [0, height]`.
/// Its fitness is the simulated time survived, including the final step.
#[derive(Debug, Clone)]
pub struct Environment {
    config: SimulationConfig,
    rocket: RocketDynamics,
    position: (f64, f64),
    barrel: BarrelSchedule,
    elapsed: f64,
    fitness: Option<f64>,
}

impl Environment {
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            rocket: RocketDynamics::new(config.physics),
            position: (config.width / 2.0, config.height / 2.0),
            barrel: BarrelSchedule::new(config.width, config.height),
            elapsed: 0.0,
            fitness: None,
            config,
        })
    }

    /// Puts the rocket back at the screen center with a resting state, full tank,
    /// zero elapsed time and the barrel cycle restarted.
    pub fn reset(&mut self) {
        self.rocket.reset();
        self.position = (self.config.width / 2.0, self.config.height / 2.0);
        self.barrel.reset();
        self.elapsed = 0.0;
        self.fitness = None;
    }

    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    #[must_use]
    pub fn rocket(&self) -> &RocketDynamics {
        &self.rocket
    }

    #[must_use]
    pub fn flight_state(&self) -> &FlightState {
        self.rocket.state()
    }

    #[must_use]
    pub fn position(&self) -> (f64, f64) {
        self.position
    }

    #[must_use]
    pub fn barrel(&self) -> (f64, f64) {
        self.barrel.position()
    }

    #[must_use]
    pub fn barrels_collected(&self) -> usize {
        self.barrel.collected()
    }

    /// Simulated time since the last reset.
    #[must_use]
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.fitness.is_some()
    }

    /// Time survived, available once the episode has terminated.
    #[must_use]
    pub fn fitness(&self) -> Option<f64> {
        self.fitness
    }

    #[must_use]
    pub fn observe(&self) -> Observation {
        let SimulationConfig { width, height, .. } = self.config;
        let (x, y) = self.position;
        let (barrel_x, barrel_y) = self.barrel.position();
        let s = self.rocket.state();
        [
            s.velocity_x,
            s.velocity_y,
            (width - x) / width,
            (height - y) / height,
            x / width,
            y / height,
            s.rotation_velocity,
            s.rotation,
            s.fuel_level,
            (barrel_x - x) / width,
            (barrel_y - y) / height,
        ]
    }

    /// Forwards a partial command to the rocket. Ignored after termination.
    pub fn apply_command(&mut self, command: PowerCommand) {
        if self.is_terminated() {
            return;
        }
        self.rocket.set_command(command);
    }

    /// Advances the simulation by one time step.
    ///
    /// Once terminated, further ticks leave the environment untouched.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.is_terminated() {
            self.advance();
        }
        TickOutcome {
            observation: self.observe(),
            terminated: self.is_terminated(),
        }
    }

    /// Ends a still-running episode with the time survived so far.
    ///
    /// Returns `false` if the episode had already terminated.
    pub fn force_terminate(&mut self) -> bool {
        if self.is_terminated() {
            return false;
        }
        self.fitness = Some(self.elapsed);
        true
    }

    fn advance(&mut self) {
        let dt = self.config.time_step;
        self.elapsed += dt;

        let (velocity_x, velocity_y) = self.rocket.step(dt);
        self.position.0 -= dt * velocity_x;
        self.position.1 -= dt * velocity_y;

        let (x, y) = self.position;
        if x < 0.0 || x > self.config.width || y < 0.0 || y > self.config.height {
            self.fitness = Some(self.elapsed);
        }

        if self.touches_barrel() {
            self.barrel.advance();
            self.rocket.refuel();
        }
    }

    fn touches_barrel(&self) -> bool {
        let (x, y) = self.position;
        let (barrel_x, barrel_y) = self.barrel.position();
        f64::hypot(x - barrel_x, y - barrel_y) < self.config.barrel_pickup_radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> Environment {
        Environment::new(SimulationConfig::default()).unwrap()
    }

    fn fly_until_terminated(env: &mut Environment, command: PowerCommand) -> usize {
        let mut ticks = 0;
        while !env.is_terminated() {
            env.apply_command(command);
            env.tick();
            ticks += 1;
            assert!(ticks < 100_000, "episode did not terminate");
        }
        ticks
    }

    #[test]
    fn test_initial_observation() {
        let env = env();
        let obs = env.observe();
        assert_eq!(obs[0], 0.0);
        assert_eq!(obs[1], 0.0);
        assert_eq!(obs[2], 0.5);
        assert_eq!(obs[3], 0.5);
        assert_eq!(obs[4], 0.5);
        assert_eq!(obs[5], 0.5);
        assert_eq!(obs[6], 0.0);
        assert_eq!(obs[7], 0.0);
        assert_eq!(obs[8], 1.0);
        assert!((obs[9] - 0.0).abs() < 1e-12);
        assert!((obs[10] - 90.0 / 600.0).abs() < 1e-12);
    }

    #[test]
    fn test_position_moves_against_velocity() {
        let mut env = env();
        env.tick();
        let s = *env.flight_state();
        assert!(s.velocity_y < 0.0);
        let (_, y) = env.position();
        assert!((y - (300.0 - 0.06 * s.velocity_y)).abs() < 1e-12);
        assert!(y > 300.0);
    }

    #[test]
    fn test_free_fall_terminates_below_screen() {
        let mut env = env();
        let ticks = fly_until_terminated(&mut env, PowerCommand::new().main(-1.0));
        let (_, y) = env.position();
        assert!(y > 600.0);
        assert_eq!(ticks, 130);
        assert!((env.fitness().unwrap() - 130.0 * 0.06).abs() < 1e-9);
        // the rocket falls through the first barrel on its way down
        assert_eq!(env.barrels_collected(), 1);
    }

    #[test]
    fn test_ticks_after_termination_are_idempotent() {
        let mut env = env();
        fly_until_terminated(&mut env, PowerCommand::new());
        let before = (env.position(), *env.flight_state(), env.elapsed(), env.fitness());
        let outcome = env.tick();
        env.apply_command(PowerCommand::all(1.0, 1.0, 1.0));
        env.tick();
        assert!(outcome.terminated);
        assert_eq!(
            before,
            (env.position(), *env.flight_state(), env.elapsed(), env.fitness())
        );
    }

    #[test]
    fn test_barrel_pickup_refuels() {
        let mut env = env();
        env.apply_command(PowerCommand::all(0.0, 0.0, 1.0));
        for _ in 0..5 {
            env.tick();
        }
        assert!(env.flight_state().fuel_level < 1.0);
        let fuel_before = env.flight_state().fuel_level;
        let (barrel_x, barrel_y) = env.barrel();
        env.position = (barrel_x, barrel_y);
        env.apply_command(PowerCommand::all(0.0, 0.0, -1.0));
        env.tick();
        assert!(fuel_before < 1.0);
        assert_eq!(env.flight_state().fuel_level, 1.0);
        assert_eq!(env.barrels_collected(), 1);
        assert_ne!(env.barrel(), (barrel_x, barrel_y));
    }

    #[test]
    fn test_reset_restores_start() {
        let mut env = env();
        let initial = env.observe();
        fly_until_terminated(&mut env, PowerCommand::all(0.3, -0.2, 0.5));
        env.reset();
        assert!(!env.is_terminated());
        assert_eq!(env.elapsed(), 0.0);
        assert_eq!(env.barrels_collected(), 0);
        assert_eq!(env.observe(), initial);
    }

    #[test]
    fn test_force_terminate_uses_elapsed_time() {
        let mut env = env();
        env.tick();
        env.tick();
        assert!(env.force_terminate());
        assert!((env.fitness().unwrap() - 0.12).abs() < 1e-12);
        assert!(!env.force_terminate());
    }
}
