use std::path::PathBuf;

use anyhow::Context as _;
use chrono::Utc;
use rand::Rng as _;
use rocketry_engine::{FlightState, Observation};
use rocketry_training::{
    config::TrainingConfig,
    genetic::{EpochSummary, EvolutionEngine, IndividualId},
    observer::EvolutionObserver,
};
use tracing::{debug, info};

use crate::{
    model::policy_model::{PolicyModel, PopulationModel},
    util::{display_target, read_json_file, save_json},
};

const MODEL_NAME: &str = "rocketry";

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct TrainArg {
    /// Training config JSON; missing fields use defaults
    #[arg(long)]
    pub(super) config: Option<PathBuf>,
    /// Number of epochs to train
    #[arg(long, default_value_t = 100)]
    pub(super) epochs: usize,
    /// RNG seed; random when omitted
    #[arg(long)]
    pub(super) seed: Option<u64>,
    /// Override the population size
    #[arg(long)]
    pub(super) population: Option<usize>,
    /// Override the physics steps per round
    #[arg(long)]
    pub(super) speed: Option<usize>,
    /// End episodes still running after this many simulated seconds
    #[arg(long)]
    pub(super) max_episode_time: Option<f64>,
    /// Output file for the best model (stdout when omitted)
    #[arg(long)]
    pub(super) output: Option<PathBuf>,
    /// Output file for the next generation's networks
    #[arg(long)]
    pub(super) population_output: Option<PathBuf>,
}

/// Logs training progress.
#[derive(Debug, Default)]
struct ProgressLogger {
    steps: usize,
}

impl EvolutionObserver for ProgressLogger {
    fn on_render(&mut self, _id: IndividualId, _observation: &Observation, _state: &FlightState) {
        self.steps += 1;
    }

    fn on_episode_end(&mut self, id: IndividualId, fitness: f64) {
        debug!(id = id.0, fitness, "episode finished");
    }

    fn on_epoch_end(&mut self, summary: &EpochSummary) {
        if let Some(stats) = summary.fitness_stats() {
            info!(
                epoch = summary.epoch,
                best = format_args!("{:.3}", stats.max),
                mean = format_args!("{:.3}", stats.mean),
                median = format_args!("{:.3}", stats.median),
                min = format_args!("{:.3}", stats.min),
                best_id = summary.best().id.0,
                steps = self.steps,
                "epoch finished"
            );
        }
        self.steps = 0;
    }
}

pub(crate) fn run(arg: &TrainArg) -> anyhow::Result<()> {
    let config = build_config(arg)?;
    if arg.epochs == 0 {
        anyhow::bail!("--epochs must be positive");
    }

    let seed = arg.seed.unwrap_or_else(|| rand::rng().random());
    info!(
        seed,
        population = config.population_size,
        hidden_layers = ?config.hidden_layers,
        epochs = arg.epochs,
        "starting training"
    );

    let mut engine = EvolutionEngine::from_seed(config, seed)?;
    let mut progress = ProgressLogger::default();
    let mut last_summary = None;
    for _ in 0..arg.epochs {
        match arg.max_episode_time {
            Some(limit) => engine.run_epoch_with_limit(&mut progress, limit)?,
            None => engine.run_epoch(&mut progress),
        }
        last_summary = Some(engine.next_generation(&mut progress)?);
    }
    let summary = last_summary.context("no epoch was run")?;

    let simulation = engine.config().simulation;
    let model = PolicyModel::from_ranked(MODEL_NAME, summary.epoch, summary.best(), simulation);
    save_json(&model, arg.output.as_deref())?;
    info!(
        path = %display_target(arg.output.as_deref()),
        epoch = model.epoch,
        fitness = format_args!("{:.3}", model.fitness),
        "model saved"
    );

    if let Some(path) = &arg.population_output {
        let population = PopulationModel {
            trained_at: Utc::now(),
            epoch: engine.epoch(),
            simulation,
            networks: engine.networks().cloned().collect(),
        };
        save_json(&population, Some(path.as_path()))?;
        info!(
            path = %path.display(),
            networks = population.networks.len(),
            "population saved"
        );
    }

    Ok(())
}

fn build_config(arg: &TrainArg) -> anyhow::Result<TrainingConfig> {
    let mut config = match &arg.config {
        Some(path) => read_json_file::<TrainingConfig>("training config", path)?,
        None => TrainingConfig::default(),
    };
    if let Some(population) = arg.population {
        config.population_size = population;
    }
    if let Some(speed) = arg.speed {
        config.simulation.speed = speed;
    }
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arg() -> TrainArg {
        TrainArg {
            config: None,
            epochs: 1,
            seed: None,
            population: None,
            speed: None,
            max_episode_time: None,
            output: None,
            population_output: None,
        }
    }

    #[test]
    fn test_overrides_apply_to_defaults() {
        let config = build_config(&TrainArg {
            population: Some(9),
            speed: Some(5),
            ..arg()
        })
        .unwrap();
        assert_eq!(config.population_size, 9);
        assert_eq!(config.simulation.speed, 5);
        assert_eq!(config.hidden_layers, TrainingConfig::default().hidden_layers);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        assert!(
            build_config(&TrainArg {
                population: Some(0),
                ..arg()
            })
            .is_err()
        );
        assert!(
            build_config(&TrainArg {
                speed: Some(0),
                ..arg()
            })
            .is_err()
        );
    }

    #[test]
    fn test_missing_config_file() {
        let err = build_config(&TrainArg {
            config: Some(PathBuf::from("/nonexistent/rocketry-config.json")),
            ..arg()
        })
        .unwrap_err();
        assert!(err.to_string().contains("training config"));
    }
}
