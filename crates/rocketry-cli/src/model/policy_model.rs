use chrono::{DateTime, Utc};
use rocketry_engine::SimulationConfig;
use rocketry_training::{genetic::RankedIndividual, network::PolicyNetwork};
use serde::{Deserialize, Serialize};

/// A trained controller together with the simulation it was trained in.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PolicyModel {
    pub name: String,
    pub trained_at: DateTime<Utc>,
    pub epoch: usize,
    pub fitness: f64,
    pub hidden_layers: Vec<usize>,
    pub simulation: SimulationConfig,
    /// One row-major matrix per layer.
    pub layers: PolicyNetwork,
}

impl PolicyModel {
    pub fn from_ranked(
        name: &str,
        epoch: usize,
        ranked: &RankedIndividual,
        simulation: SimulationConfig,
    ) -> Self {
        Self {
            name: name.to_owned(),
            trained_at: Utc::now(),
            epoch,
            fitness: ranked.fitness,
            hidden_layers: ranked.network.hidden_layers(),
            simulation,
            layers: ranked.network.clone(),
        }
    }

    pub fn network(&self) -> anyhow::Result<&PolicyNetwork> {
        if self.layers.hidden_layers() != self.hidden_layers {
            anyhow::bail!(
                "model {} declares hidden layers {:?} but its weights have {:?}",
                self.name,
                self.hidden_layers,
                self.layers.hidden_layers()
            );
        }
        Ok(&self.layers)
    }
}

/// Every network of a population, in population order.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PopulationModel {
    pub trained_at: DateTime<Utc>,
    pub epoch: usize,
    pub simulation: SimulationConfig,
    pub networks: Vec<PolicyNetwork>,
}
