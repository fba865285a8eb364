use rocketry_engine::SimulationConfig;
use serde::{Deserialize, Serialize};

use crate::{TrainingConfigError, network::DEFAULT_HIDDEN_LAYERS};

/// Everything an [`EvolutionEngine`](crate::genetic::EvolutionEngine) needs at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of individuals evaluated per epoch.
    pub population_size: usize,
    /// Hidden layer widths of every policy network.
    pub hidden_layers: Vec<usize>,
    pub simulation: SimulationConfig,
    pub breeding: BreedingParams,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            population_size: 30,
            hidden_layers: DEFAULT_HIDDEN_LAYERS.to_vec(),
            simulation: SimulationConfig::default(),
            breeding: BreedingParams::default(),
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<(), TrainingConfigError> {
        if self.population_size == 0 {
            return Err(TrainingConfigError::EmptyPopulation);
        }
        if let Some(index) = self.hidden_layers.iter().position(|w| *w == 0) {
            return Err(TrainingConfigError::ZeroLayerWidth { index });
        }
        self.simulation.validate()?;
        self.breeding.validate()
    }
}

/// Operator parameters used when producing the next generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreedingParams {
    /// Per-layer replacement probability for the `mid2` tier.
    pub full_layer_aggressiveness: f64,
    /// Per-row mutation probability for the `mid1` tier and de-duplication.
    pub partial_aggressiveness: f64,
    /// Blend factor towards fresh noise for mutated rows.
    pub partial_magnitude: f64,
    /// Share of the first donor when crossing two networks for the `worst` tier.
    pub blend_self_weight: f64,
}

impl Default for BreedingParams {
    fn default() -> Self {
        Self {
            full_layer_aggressiveness: 0.1,
            partial_aggressiveness: 0.1,
            partial_magnitude: 0.01,
            blend_self_weight: 0.5,
        }
    }
}

impl BreedingParams {
    pub fn validate(&self) -> Result<(), TrainingConfigError> {
        for (name, value) in [
            ("full_layer_aggressiveness", self.full_layer_aggressiveness),
            ("partial_aggressiveness", self.partial_aggressiveness),
            ("partial_magnitude", self.partial_magnitude),
            ("blend_self_weight", self.blend_self_weight),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(TrainingConfigError::Probability { name, value });
            }
        }
        // de-duplication repeats partial mutation until a signature changes
        for (name, value) in [
            ("partial_aggressiveness", self.partial_aggressiveness),
            ("partial_magnitude", self.partial_magnitude),
        ] {
            if value <= 0.0 {
                return Err(TrainingConfigError::NonPositiveRate { name, value });
            }
        }
        Ok(())
    }
}
