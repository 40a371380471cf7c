//! Run configuration.
//!
//! [`SimulationConfig`] can be assembled in code through its typed builder or
//! loaded from a JSON file; every field is optional in the file and falls back
//! to the same defaults the builder uses.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::{
    error::{BuildError, BuildResult},
    macros::record,
};

pub const DEFAULT_TARGET_HEIGHT: u32 = 30;
/// Cubic yards of ice per foot of one section.
pub const DEFAULT_FOOT_VOLUME: u64 = 195;
/// Price of one cubic yard of ice.
pub const DEFAULT_VOLUME_PRICE: u64 = 1900;
pub const DEFAULT_ROUND_TIMEOUT_MS: u64 = 30_000;

/// Which builder variant drives the run.
#[record]
#[derive(Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum BuildMode {
    /// Single-threaded reference path.
    Serial,
    /// Worker slots synchronized on a per-day barrier.
    #[default]
    Concurrent,
}

/// Unit conversions applied to raw ledger counts.
#[record]
#[derive(Copy)]
pub struct Pricing {
    pub foot_volume: u64,
    pub volume_price: u64,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            foot_volume: DEFAULT_FOOT_VOLUME,
            volume_price: DEFAULT_VOLUME_PRICE,
        }
    }
}

impl Pricing {
    /// Ice volume of `feet` built feet, saturating at `u64::MAX`.
    pub fn volume(&self, feet: u64) -> u64 {
        feet.saturating_mul(self.foot_volume)
    }

    /// Cost of `feet` built feet, saturating at `u64::MAX`.
    pub fn cost(&self, feet: u64) -> u64 {
        self.volume(feet).saturating_mul(self.volume_price)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(default)]
pub struct SimulationConfig {
    /// Wall profile file, one profile per line.
    #[builder(setter(into))]
    pub input: PathBuf,
    #[builder(default = DEFAULT_TARGET_HEIGHT)]
    pub target_height: u32,
    /// Number of worker slots; ignored in serial mode.
    #[builder(default = num_cpus::get())]
    pub workers: usize,
    #[builder(default)]
    pub mode: BuildMode,
    #[builder(default)]
    pub pricing: Pricing,
    /// Upper bound on a single day's barrier wait before the run is declared deadlocked.
    #[builder(default = DEFAULT_ROUND_TIMEOUT_MS)]
    pub round_timeout_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("wall.txt"),
            target_height: DEFAULT_TARGET_HEIGHT,
            workers: num_cpus::get(),
            mode: BuildMode::default(),
            pricing: Pricing::default(),
            round_timeout_ms: DEFAULT_ROUND_TIMEOUT_MS,
        }
    }
}

impl SimulationConfig {
    /// Load a JSON configuration file. Missing fields take their defaults.
    pub fn from_path(path: impl AsRef<Path>) -> BuildResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| BuildError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| BuildError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn round_timeout(&self) -> Duration {
        Duration::from_millis(self.round_timeout_ms)
    }

    pub fn validate(&self) -> BuildResult<()> {
        if self.mode == BuildMode::Concurrent && self.workers == 0 {
            return Err(BuildError::InvalidConfig(
                "at least one worker is required in concurrent mode".into(),
            ));
        }
        if self.round_timeout_ms == 0 {
            return Err(BuildError::InvalidConfig(
                "round_timeout_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn pricing_matches_unit_costs() {
        let pricing = Pricing::default();
        assert_eq!(pricing.volume(3), 585);
        assert_eq!(pricing.cost(3), 1_111_500);
        assert_eq!(pricing.cost(0), 0);
    }

    #[test]
    fn oversized_pricing_saturates() {
        let pricing = Pricing {
            foot_volume: u64::MAX,
            volume_price: 2,
        };
        assert_eq!(pricing.volume(2), u64::MAX);
        assert_eq!(pricing.cost(1), u64::MAX);
        assert_eq!(pricing.cost(0), 0);
    }

    #[test]
    fn builder_defaults() {
        let config = SimulationConfig::builder().input("data.txt").build();
        assert_eq!(config.target_height, 30);
        assert_eq!(config.mode, BuildMode::Concurrent);
        assert_eq!(config.pricing, Pricing::default());
        assert!(config.workers >= 1);
        assert_eq!(config.round_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn file_fills_missing_fields_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"input": "walls.txt", "workers": 2, "mode": "serial"}}"#).unwrap();

        let config = SimulationConfig::from_path(file.path()).unwrap();
        assert_eq!(config.input, PathBuf::from("walls.txt"));
        assert_eq!(config.workers, 2);
        assert_eq!(config.mode, BuildMode::Serial);
        assert_eq!(config.target_height, DEFAULT_TARGET_HEIGHT);
        assert_eq!(config.pricing.volume_price, DEFAULT_VOLUME_PRICE);
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "workers = 2").unwrap();

        let err = SimulationConfig::from_path(file.path()).unwrap_err();
        assert!(matches!(err, BuildError::Config { .. }));
    }

    #[test]
    fn zero_workers_rejected_only_in_concurrent_mode() {
        let config = SimulationConfig::builder().input("x").workers(0).build();
        assert!(matches!(config.validate(), Err(BuildError::InvalidConfig(_))));

        let serial = SimulationConfig::builder()
            .input("x")
            .workers(0)
            .mode(BuildMode::Serial)
            .build();
        assert!(serial.validate().is_ok());
    }
}
