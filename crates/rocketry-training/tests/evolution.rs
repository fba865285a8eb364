use std::collections::{HashMap, HashSet};

use rand::SeedableRng as _;
use rand_pcg::Pcg32;
use rocketry_engine::{FlightState, Observation};
use rocketry_training::{
    GenerationError, TimeLimitError, TrainingConfigError,
    config::TrainingConfig,
    genetic::{EpochSummary, EvolutionEngine, IndividualId, Tiers},
    network::{DEFAULT_HIDDEN_LAYERS, PolicyNetwork},
    observer::EvolutionObserver,
};

/// Network whose every output is `(top, bottom, main) = (0, 0, -1)`: engines off.
fn engines_off_network() -> PolicyNetwork {
    let last = DEFAULT_HIDDEN_LAYERS.len();
    PolicyNetwork::from_fn(&DEFAULT_HIDDEN_LAYERS, |l, r, c| {
        if l == last && r == 0 && c == 2 {
            -1000.0
        } else {
            0.0
        }
    })
}

fn config(population_size: usize) -> TrainingConfig {
    TrainingConfig {
        population_size,
        ..TrainingConfig::default()
    }
}

#[derive(Debug, Default)]
struct Recorder {
    renders: HashMap<IndividualId, usize>,
    episode_ends: Vec<(IndividualId, f64)>,
    epochs: Vec<(usize, f64, Vec<IndividualId>)>,
}

impl EvolutionObserver for Recorder {
    fn on_render(&mut self, id: IndividualId, observation: &Observation, state: &FlightState) {
        assert_eq!(observation[8], state.fuel_level);
        *self.renders.entry(id).or_default() += 1;
    }

    fn on_episode_end(&mut self, id: IndividualId, fitness: f64) {
        self.episode_ends.push((id, fitness));
    }

    fn on_epoch_end(&mut self, summary: &EpochSummary) {
        self.epochs.push((
            summary.epoch,
            summary.best_fitness,
            summary.ranked.iter().map(|r| r.id).collect(),
        ));
    }
}

#[test]
fn free_falling_population_scores_equally() {
    let networks = vec![engines_off_network(); 6];
    let mut engine =
        EvolutionEngine::with_networks(config(6), networks, Pcg32::seed_from_u64(2024)).unwrap();
    let mut recorder = Recorder::default();

    engine.run_epoch(&mut recorder);

    for ind in engine.individuals() {
        let env = ind.environment();
        assert!(env.position().1 > env.config().height);
        assert!((ind.fitness().unwrap() - 130.0 * 0.06).abs() < 1e-9);
    }
    assert_eq!(recorder.episode_ends.len(), 6);
    assert!(recorder.renders.values().all(|&count| count == 130));

    let summary = engine.next_generation(&mut recorder).unwrap();
    assert_eq!(summary.epoch, 1);
    assert!((summary.best_fitness - 7.8).abs() < 1e-9);
    // equal fitness keeps population order
    let ids: Vec<_> = summary.ranked.iter().map(|r| r.id.0).collect();
    assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(recorder.epochs.len(), 1);
    assert_eq!(engine.epoch(), 2);

    // identical networks were forced apart
    let signatures: HashSet<u64> = engine
        .networks()
        .map(|n| n.signature().to_bits())
        .collect();
    assert_eq!(signatures.len(), 6);
    // every environment is ready for the next epoch
    assert_eq!(engine.active_count(), 6);
    assert!(
        engine
            .individuals()
            .iter()
            .all(|ind| ind.environment().elapsed() == 0.0)
    );
}

#[test]
fn speed_multiplies_steps_per_round_only() {
    let mut config = config(3);
    config.simulation.speed = 4;
    let mut engine =
        EvolutionEngine::with_networks(config, vec![engines_off_network(); 3], Pcg32::seed_from_u64(1))
            .unwrap();
    let mut rounds = 0;
    while engine.step_round(&mut ()) > 0 {
        rounds += 1;
    }
    // 130 steps in rounds of 4: 32 full rounds, the 33rd terminates
    assert_eq!(rounds, 32);
    for ind in engine.individuals() {
        assert!((ind.fitness().unwrap() - 7.8).abs() < 1e-9);
    }
}

#[test]
fn breeding_requires_finished_epoch() {
    let mut engine = EvolutionEngine::from_seed(config(6), 5).unwrap();
    let before: Vec<_> = engine.networks().cloned().collect();
    engine.step_round(&mut ());
    let err = engine.next_generation(&mut ()).unwrap_err();
    assert!(matches!(err, GenerationError::EpochInProgress { active } if active > 0));
    assert!(engine.networks().eq(before.iter()));
    assert_eq!(engine.epoch(), 1);
}

#[test]
fn best_tier_survives_unchanged() {
    let mut engine = EvolutionEngine::from_seed(config(12), 99).unwrap();
    engine.run_epoch_with_limit(&mut (), 120.0).unwrap();
    let summary = engine.next_generation(&mut ()).unwrap();

    let tiers = Tiers::new(12);
    for ranked in &summary.ranked[tiers.best] {
        assert_eq!(engine.individuals()[ranked.id.0].network(), &ranked.network);
    }
    for pair in summary.ranked.windows(2) {
        assert!(pair[0].fitness >= pair[1].fitness);
    }
}

#[test]
fn time_limit_bounds_episodes() {
    let mut engine = EvolutionEngine::from_seed(config(8), 17).unwrap();
    let mut recorder = Recorder::default();
    engine.run_epoch_with_limit(&mut recorder, 0.5).unwrap();

    assert_eq!(engine.active_count(), 0);
    assert_eq!(recorder.episode_ends.len(), 8);
    let dt = engine.config().simulation.time_step;
    for ind in engine.individuals() {
        assert!(ind.fitness().unwrap() <= 0.5 + dt + 1e-9);
    }
}

#[test]
fn time_limit_is_checked_between_rounds() {
    let mut config = config(4);
    config.simulation.speed = 4;
    let networks = vec![engines_off_network(); 4];
    let mut engine =
        EvolutionEngine::with_networks(config, networks, Pcg32::seed_from_u64(3)).unwrap();
    engine.run_epoch_with_limit(&mut (), 0.5).unwrap();

    // rounds end at 0.24, 0.48, 0.72 seconds
    for ind in engine.individuals() {
        let fitness = ind.fitness().unwrap();
        assert!((fitness - 12.0 * 0.06).abs() < 1e-9);
        assert!(fitness <= 0.5 + 4.0 * 0.06 + 1e-9);
    }
}

#[test]
fn invalid_time_limits_are_rejected() {
    let mut engine = EvolutionEngine::from_seed(config(3), 4).unwrap();
    for time_limit in [f64::NAN, 0.0, -1.0] {
        let err = engine.run_epoch_with_limit(&mut (), time_limit).unwrap_err();
        assert!(err.time_limit.is_nan() || err.time_limit == time_limit);
    }
    assert_eq!(
        engine.run_epoch_with_limit(&mut (), -2.0),
        Err(TimeLimitError { time_limit: -2.0 })
    );
    // nothing was simulated
    assert!(
        engine
            .individuals()
            .iter()
            .all(|ind| ind.environment().elapsed() == 0.0)
    );
}

#[test]
fn breeding_that_cannot_separate_duplicates_is_rejected() {
    let mut config = config(3);
    config.breeding.partial_magnitude = 0.0;
    let err = EvolutionEngine::from_seed(config, 1).unwrap_err();
    assert!(matches!(
        err,
        TrainingConfigError::NonPositiveRate {
            name: "partial_magnitude",
            ..
        }
    ));
}

#[test]
fn seeded_training_is_reproducible() {
    fn train(seed: u64, observe: bool) -> Vec<(usize, f64)> {
        let mut engine = EvolutionEngine::from_seed(config(9), seed).unwrap();
        let mut recorder = Recorder::default();
        let mut results = vec![];
        for _ in 0..3 {
            let summary = if observe {
                engine.run_epoch_with_limit(&mut recorder, 60.0).unwrap();
                engine.next_generation(&mut recorder).unwrap()
            } else {
                engine.run_epoch_with_limit(&mut (), 60.0).unwrap();
                engine.next_generation(&mut ()).unwrap()
            };
            results.extend(summary.ranked.iter().map(|r| (r.id.0, r.fitness)));
        }
        results
    }

    let observed = train(123, true);
    let silent = train(123, false);
    assert_eq!(observed, silent);
}

#[test]
fn tiny_populations_do_not_fail() {
    for n in 1..=4 {
        let mut engine = EvolutionEngine::from_seed(config(n), 8).unwrap();
        for _ in 0..2 {
            engine.run_epoch_with_limit(&mut (), 30.0).unwrap();
            let summary = engine.next_generation(&mut ()).unwrap();
            assert_eq!(summary.ranked.len(), n);
        }
        assert_eq!(engine.epoch(), 3);
    }
}
