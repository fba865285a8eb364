use std::path::PathBuf;

use anyhow::Context as _;
use rocketry_engine::{Environment, SimulationConfig};
use rocketry_training::network::PolicyNetwork;
use serde::Serialize;
use tracing::info;

use crate::util;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct EvaluateArg {
    /// Policy model JSON written by `train`
    pub(super) model: PathBuf,
    /// End the episode after this many simulated seconds
    #[arg(long, default_value_t = 300.0)]
    pub(super) max_episode_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct EpisodeReport {
    fitness: f64,
    barrels_collected: usize,
    timed_out: bool,
}

pub(crate) fn run(arg: &EvaluateArg) -> anyhow::Result<()> {
    let EvaluateArg {
        model,
        max_episode_time,
    } = arg;
    if max_episode_time.is_nan() || *max_episode_time <= 0.0 {
        anyhow::bail!("--max-episode-time must be positive, got {max_episode_time}");
    }

    let model = util::read_policy_model_file(model)?;
    let network = model.network()?;
    let report = fly(network, model.simulation, *max_episode_time)?;
    info!(
        name = %model.name,
        trained_fitness = format_args!("{:.3}", model.fitness),
        fitness = format_args!("{:.3}", report.fitness),
        barrels = report.barrels_collected,
        timed_out = report.timed_out,
        "episode finished"
    );
    util::save_json(&report, None)?;
    Ok(())
}

/// Flies one episode, one physics step per tick.
fn fly(
    network: &PolicyNetwork,
    simulation: SimulationConfig,
    time_limit: f64,
) -> anyhow::Result<EpisodeReport> {
    let mut env = Environment::new(simulation)?;
    let mut timed_out = false;
    while !env.is_terminated() {
        if env.elapsed() >= time_limit {
            timed_out = env.force_terminate();
            break;
        }
        env.apply_command(network.command(&env.observe()));
        env.tick();
    }
    Ok(EpisodeReport {
        fitness: env.fitness().context("episode did not terminate")?,
        barrels_collected: env.barrels_collected(),
        timed_out,
    })
}
