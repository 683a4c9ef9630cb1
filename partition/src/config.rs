//! Partitioner configuration.

use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};

use crate::atomics::AtomicMinStrategy;
use crate::group::MAX_LANES;

/// Settings for [`Partitioner`](crate::partitioner::Partitioner).
///
/// Deserialization fills missing fields from [`Default`], so a YAML file
/// only needs the values it changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionConfig {
    /// Relative tolerance of the same-component test. 0.2 groups boxes whose
    /// corners differ by up to a tenth of their summed smaller sides.
    pub eps: f32,
    /// Lanes per execution group, and therefore the maximum number of
    /// rectangles per launch.
    pub lanes: usize,
    pub min_strategy: AtomicMinStrategy,
    /// Upper bound on groups running at once in a batch.
    pub max_concurrent_groups: usize,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            eps: 0.2,
            lanes: 64,
            min_strategy: AtomicMinStrategy::Native,
            max_concurrent_groups: 4,
        }
    }
}

impl PartitionConfig {
    /// Checks every field, for configs that come from user input.
    pub fn check(&self) -> anyhow::Result<()> {
        ensure!(
            self.eps.is_finite() && self.eps >= 0.0,
            "eps must be finite and non-negative, got {}",
            self.eps
        );
        ensure!(
            self.lanes > 0 && self.lanes <= MAX_LANES,
            "lanes must be in 1..={MAX_LANES}, got {}",
            self.lanes
        );
        ensure!(
            self.max_concurrent_groups > 0,
            "max_concurrent_groups must be > 0"
        );
        Ok(())
    }

    /// # Panics
    /// Panics if any field is out of range, see [`Self::check`].
    pub fn validate(&self) {
        if let Err(err) = self.check() {
            panic!("{err}");
        }
    }

    pub fn from_yaml_file(path: &str) -> anyhow::Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read partition config {path}"))?;
        Self::from_yaml(&yaml)
    }

    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let config: Self =
            serde_yml::from_str(yaml).context("Failed to parse partition config")?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> String {
        serde_yml::to_string(self).expect("Failed to serialize partition config to YAML")
    }
}
