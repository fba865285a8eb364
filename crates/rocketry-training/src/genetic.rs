//! Generational evolution of policy networks.
//!
//! [`EvolutionEngine`] owns a population of [`Individual`]s, each a
//! [`PolicyNetwork`] paired with its own [`Environment`]. One epoch runs as a
//! small state machine:
//!
//! ```text
//! RUNNING ──(every episode terminated)──> ALL_TERMINATED
//!    ^                                          │ rank
//!    │ reset, epoch + 1                         v
//! NEXT_GENERATION <──── breed, de-duplicate ── RANKED
//! ```
//!
//! # Lock-step evaluation
//!
//! [`step_round`](EvolutionEngine::step_round) advances every still-flying
//! individual by `speed` physics steps, one individual after the other. Rounds
//! repeat until every rocket has left the screen, so all fitness values are
//! measured under the same conditions and observers see a consistent frame.
//!
//! # Tiers
//!
//! After ranking (fitness descending, ties by population index), rank positions
//! are split by [`Tiers::new`]:
//!
//! | tier    | ranks                    | next generation                          |
//! |---------|--------------------------|------------------------------------------|
//! | `best`  | `[0, N/3)`               | kept unchanged                           |
//! | `mid1`  | `[N/3, 3N/4)`            | random best, partial mutation            |
//! | `mid2`  | `[3N/4, 2N/3)`           | random best, full layer mutation         |
//! | `worst` | `[2N/3, N)`              | blend of two random best                 |
//!
//! All bounds use integer division. Because `3N/4` is usually larger than
//! `2N/3`, `mid2` is typically empty and `mid1` overlaps `worst`; the tiers are
//! processed in the order `mid2`, `mid1`, `worst`, so the overlap ends up as
//! a blend.
//!
//! # Uniqueness
//!
//! After breeding, individuals are visited in rank order and any network whose
//! [`signature`](PolicyNetwork::signature) was already seen is partially
//! mutated until its signature is new.

use std::{collections::HashSet, ops::Range};

use rand::{Rng, SeedableRng as _};
use rand_pcg::Pcg32;
use rocketry_engine::Environment;

use crate::{
    GenerationError, TimeLimitError, TrainingConfigError,
    config::{BreedingParams, TrainingConfig},
    network::PolicyNetwork,
    observer::EvolutionObserver,
    stats::FitnessStats,
};

/// Index of an individual in the population.
///
/// Ranking never reorders the population, so an id stays valid across epochs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display, derive_more::From,
)]
pub struct IndividualId(pub usize);

/// A network together with the environment it is evaluated in.
#[derive(Debug, Clone)]
pub struct Individual {
    network: PolicyNetwork,
    environment: Environment,
}

impl Individual {
    #[must_use]
    pub fn network(&self) -> &PolicyNetwork {
        &self.network
    }

    #[must_use]
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Time survived in the current epoch, once the episode has terminated.
    #[must_use]
    pub fn fitness(&self) -> Option<f64> {
        self.environment.fitness()
    }
}

/// Rank-position ranges of the four breeding tiers.
///
/// Ranges are kept exactly as computed; a range whose start exceeds its end is
/// simply empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tiers {
    pub best: Range<usize>,
    pub mid1: Range<usize>,
    pub mid2: Range<usize>,
    pub worst: Range<usize>,
}

impl Tiers {
    #[must_use]
    pub fn new(population_size: usize) -> Self {
        let n = population_size;
        let b1 = n / 3;
        let b3 = 2 * n / 3;
        let b2 = 3 * n / 4;
        Self {
            best: 0..b1,
            mid1: b1..b2,
            mid2: b2..b3,
            worst: b3..n,
        }
    }
}

/// One ranked individual as it stood at the end of an epoch.
#[derive(Debug, Clone)]
pub struct RankedIndividual {
    pub id: IndividualId,
    pub fitness: f64,
    /// The network that earned `fitness`, captured before breeding.
    pub network: PolicyNetwork,
}

/// Outcome of one epoch.
#[derive(Debug, Clone)]
pub struct EpochSummary {
    /// Number of the epoch that just finished (the first epoch is 1).
    pub epoch: usize,
    pub best_fitness: f64,
    /// All individuals, best first.
    pub ranked: Vec<RankedIndividual>,
}

impl EpochSummary {
    #[must_use]
    pub fn best(&self) -> &RankedIndividual {
        &self.ranked[0]
    }

    #[must_use]
    pub fn fitness_stats(&self) -> Option<FitnessStats> {
        FitnessStats::new(self.ranked.iter().map(|r| r.fitness))
    }
}

/// Population-based trainer running every individual in lock-step.
#[derive(Debug, Clone)]
pub struct EvolutionEngine<R> {
    config: TrainingConfig,
    individuals: Vec<Individual>,
    epoch: usize,
    rng: R,
}

impl EvolutionEngine<Pcg32> {
    /// Creates a randomly initialized population driven by a seeded PCG generator.
    pub fn from_seed(config: TrainingConfig, seed: u64) -> Result<Self, TrainingConfigError> {
        Self::new(config, Pcg32::seed_from_u64(seed))
    }
}

impl<R> EvolutionEngine<R>
where
    R: Rng,
{
    /// Creates a population of `config.population_size` random networks.
    ///
    /// `rng` is the only source of randomness: it drives initialization,
    /// mutation, and donor selection.
    pub fn new(config: TrainingConfig, mut rng: R) -> Result<Self, TrainingConfigError> {
        config.validate()?;
        let networks = (0..config.population_size)
            .map(|_| PolicyNetwork::random(&config.hidden_layers, &mut rng))
            .collect();
        Self::with_networks(config, networks, rng)
    }

    /// Creates a population from existing networks, one per individual.
    pub fn with_networks(
        config: TrainingConfig,
        networks: Vec<PolicyNetwork>,
        rng: R,
    ) -> Result<Self, TrainingConfigError> {
        config.validate()?;
        if networks.len() != config.population_size {
            return Err(TrainingConfigError::PopulationMismatch {
                expected: config.population_size,
                actual: networks.len(),
            });
        }
        if let Some(index) = networks
            .iter()
            .position(|n| n.hidden_layers() != config.hidden_layers)
        {
            return Err(TrainingConfigError::ArchitectureMismatch { index });
        }

        let individuals = networks
            .into_iter()
            .map(|network| -> Result<_, TrainingConfigError> {
                Ok(Individual {
                    network,
                    environment: Environment::new(config.simulation)?,
                })
            })
            .collect::<Result<_, _>>()?;

        Ok(Self {
            config,
            individuals,
            epoch: 1,
            rng,
        })
    }

    #[must_use]
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Current epoch number, starting at 1.
    #[must_use]
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    #[must_use]
    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    /// Networks of the whole population, in population order.
    pub fn networks(&self) -> impl Iterator<Item = &PolicyNetwork> + '_ {
        self.individuals.iter().map(|ind| &ind.network)
    }

    /// Number of individuals whose episode is still running.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.individuals
            .iter()
            .filter(|ind| !ind.environment.is_terminated())
            .count()
    }

    /// Advances every active individual by `speed` physics steps.
    ///
    /// Before each step the observer sees the observation the network acts on.
    /// Returns the number of individuals still active afterwards.
    pub fn step_round<O>(&mut self, observer: &mut O) -> usize
    where
        O: EvolutionObserver + ?Sized,
    {
        let speed = self.config.simulation.speed;
        let mut active = 0;
        for (index, ind) in self.individuals.iter_mut().enumerate() {
            if ind.environment.is_terminated() {
                continue;
            }
            let id = IndividualId(index);
            for _ in 0..speed {
                let observation = ind.environment.observe();
                observer.on_render(id, &observation, ind.environment.flight_state());
                ind.environment
                    .apply_command(ind.network.command(&observation));
                if ind.environment.tick().terminated {
                    break;
                }
            }
            match ind.environment.fitness() {
                Some(fitness) => observer.on_episode_end(id, fitness),
                None => active += 1,
            }
        }
        active
    }

    /// Runs rounds until every episode has terminated.
    ///
    /// Never returns if some controller keeps its rocket on screen forever; see
    /// [`run_epoch_with_limit`](Self::run_epoch_with_limit).
    pub fn run_epoch<O>(&mut self, observer: &mut O)
    where
        O: EvolutionObserver + ?Sized,
    {
        while self.step_round(observer) > 0 {}
    }

    /// Runs rounds until every episode has terminated or reached `time_limit`
    /// simulated seconds; episodes still running then end with the time they
    /// survived.
    ///
    /// The limit is checked between rounds, so an episode may run up to
    /// `speed * time_step` seconds past it.
    pub fn run_epoch_with_limit<O>(
        &mut self,
        observer: &mut O,
        time_limit: f64,
    ) -> Result<(), TimeLimitError>
    where
        O: EvolutionObserver + ?Sized,
    {
        if time_limit.is_nan() || time_limit <= 0.0 {
            return Err(TimeLimitError { time_limit });
        }
        while self.step_round(observer) > 0 {
            let all_timed_out = self
                .individuals
                .iter()
                .filter(|ind| !ind.environment.is_terminated())
                .all(|ind| ind.environment.elapsed() >= time_limit);
            if all_timed_out {
                self.terminate_active(observer);
                break;
            }
        }
        Ok(())
    }

    /// Ends every running episode with the time survived so far.
    ///
    /// Intended for hosts that bound an epoch's wall-clock or simulated time.
    pub fn terminate_active<O>(&mut self, observer: &mut O)
    where
        O: EvolutionObserver + ?Sized,
    {
        for (index, ind) in self.individuals.iter_mut().enumerate() {
            if ind.environment.force_terminate()
                && let Some(fitness) = ind.environment.fitness()
            {
                observer.on_episode_end(IndividualId(index), fitness);
            }
        }
    }

    /// Ranks the finished epoch, breeds the next generation, and resets every
    /// environment.
    ///
    /// Fails without touching the population if any episode is still running.
    pub fn next_generation<O>(&mut self, observer: &mut O) -> Result<EpochSummary, GenerationError>
    where
        O: EvolutionObserver + ?Sized,
    {
        let active = self.active_count();
        if active > 0 {
            return Err(GenerationError::EpochInProgress { active });
        }

        let order = self.rank();
        let ranked: Vec<_> = order
            .iter()
            .map(|&i| RankedIndividual {
                id: IndividualId(i),
                fitness: self.individuals[i].fitness().unwrap_or_default(),
                network: self.individuals[i].network.clone(),
            })
            .collect();

        self.breed(&order)?;
        self.make_unique(&order);

        for ind in &mut self.individuals {
            ind.environment.reset();
        }

        let summary = EpochSummary {
            epoch: self.epoch,
            best_fitness: ranked[0].fitness,
            ranked,
        };
        tracing::debug!(
            epoch = summary.epoch,
            best_fitness = summary.best_fitness,
            "epoch completed"
        );
        self.epoch += 1;
        observer.on_epoch_end(&summary);
        Ok(summary)
    }

    /// Population indices sorted by fitness descending; ties keep index order.
    fn rank(&self) -> Vec<usize> {
        let fitness: Vec<f64> = self
            .individuals
            .iter()
            .map(|ind| ind.fitness().unwrap_or_default())
            .collect();
        let mut order: Vec<usize> = (0..self.individuals.len()).collect();
        // stable: equal fitness keeps ascending index
        order.sort_by(|&a, &b| fitness[b].total_cmp(&fitness[a]));
        order
    }

    /// Replaces the networks of every tier below `best`, addressed by rank.
    fn breed(&mut self, order: &[usize]) -> Result<(), GenerationError> {
        let tiers = Tiers::new(order.len());
        let donors: Vec<PolicyNetwork> = tiers
            .best
            .clone()
            .map(|rank| self.individuals[order[rank]].network.clone())
            .collect();
        if donors.is_empty() {
            tracing::warn!(
                population_size = order.len(),
                "population too small to have a best tier; skipping breeding"
            );
            return Ok(());
        }

        let BreedingParams {
            full_layer_aggressiveness,
            partial_aggressiveness,
            partial_magnitude,
            blend_self_weight,
        } = self.config.breeding;

        for rank in tiers.mid2 {
            let donor = &donors[self.rng.random_range(0..donors.len())];
            self.individuals[order[rank]].network =
                donor.mutate_full_layer(full_layer_aggressiveness, &mut self.rng);
        }
        for rank in tiers.mid1 {
            let donor = &donors[self.rng.random_range(0..donors.len())];
            self.individuals[order[rank]].network =
                donor.mutate_partial(partial_aggressiveness, partial_magnitude, &mut self.rng);
        }
        for rank in tiers.worst {
            let first = &donors[self.rng.random_range(0..donors.len())];
            let second = &donors[self.rng.random_range(0..donors.len())];
            self.individuals[order[rank]].network = first.blend(second, blend_self_weight)?;
        }
        Ok(())
    }

    /// Mutates networks, in rank order, until no two share a signature.
    fn make_unique(&mut self, order: &[usize]) {
        let BreedingParams {
            partial_aggressiveness,
            partial_magnitude,
            ..
        } = self.config.breeding;
        let mut seen = HashSet::new();
        for &i in order {
            let network = &mut self.individuals[i].network;
            while seen.contains(&signature_key(network.signature())) {
                *network =
                    network.mutate_partial(partial_aggressiveness, partial_magnitude, &mut self.rng);
            }
            seen.insert(signature_key(network.signature()));
        }
    }
}

/// Hashable form of a signature; `0.0` and `-0.0` match, as do all NaNs.
fn signature_key(signature: f64) -> u64 {
    if signature == 0.0 {
        0.0_f64.to_bits()
    } else if signature.is_nan() {
        f64::NAN.to_bits()
    } else {
        signature.to_bits()
    }
}
