//! Hooks through which hosts watch training.
//!
//! The evolution engine never stores an observer; one is borrowed for each
//! call that can emit events. Observers only receive shared references, so
//! attaching or removing one cannot change simulation results.

use rocketry_engine::{FlightState, Observation};

use crate::genetic::{EpochSummary, IndividualId};

/// Receives training events. Every method defaults to a no-op.
pub trait EvolutionObserver {
    /// Called before every physics step of an active individual, with the
    /// observation its network is about to act on.
    fn on_render(&mut self, _id: IndividualId, _observation: &Observation, _state: &FlightState) {
    }

    /// Called once when an individual's episode terminates.
    fn on_episode_end(&mut self, _id: IndividualId, _fitness: f64) {}

    /// Called once per generation boundary, after breeding.
    fn on_epoch_end(&mut self, _summary: &EpochSummary) {}
}

/// Observer that ignores every event.
impl EvolutionObserver for () {}

impl<O> EvolutionObserver for &mut O
where
    O: EvolutionObserver + ?Sized,
{
    fn on_render(&mut self, id: IndividualId, observation: &Observation, state: &FlightState) {
        (**self).on_render(id, observation, state);
    }

    fn on_episode_end(&mut self, id: IndividualId, fitness: f64) {
        (**self).on_episode_end(id, fitness);
    }

    fn on_epoch_end(&mut self, summary: &EpochSummary) {
        (**self).on_epoch_end(summary);
    }
}
