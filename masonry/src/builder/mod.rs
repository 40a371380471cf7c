//! Builders — the strategies that turn wall data into a build ledger.
//!
//! The [`Builder`] trait is the seam between a [`Simulation`](crate::Simulation)
//! and the way the wall actually gets built. Two strategies ship with the
//! crate:
//!
//! - [`SerialBuilder`]: the single-threaded reference path. Every day it walks
//!   all sections once and raises each one still short of target by one foot.
//! - [`ConcurrentBuilder`]: a fixed crew of worker slots, each holding at most
//!   one section at a time, synchronized on a per-day barrier.
//!
//! # Day semantics
//!
//! In both builders a *day* is one synchronized epoch in which every active
//! unit of work raises exactly one section by exactly one foot. For the
//! concurrent builder this means one foot per active slot per day: slots are
//! only handed a new section at the start of a day, never in the middle of
//! one, so a slot can never build twice on the same day.
//!
//! Lifetime totals never depend on the strategy. Per-day distributions only
//! agree when the worker count covers every section being built at the same
//! time; with fewer workers the concurrent run takes more days.
//!
//! # High-level flow of the concurrent builder
//! 1. Explode the wall data into partitions and queue them by (profile, section).
//! 2. Spawn N worker tasks, each listening for shifts on its own channel.
//! 3. Hand one partition to each slot.
//! 4. Each day:
//!    - slots whose section reached target take the next queued one, or go idle,
//!    - a barrier is sized to the active slots plus the controller,
//!    - every active slot gets one shift: raise its section, write the ledger,
//!      arrive at the barrier,
//!    - the controller waits for the barrier and moves to the next day.
//! 5. Once no slot holds a section, channels close, workers exit and the
//!    ledger is handed back by value.
//!
//! # Watchdog
//! A stalled worker would otherwise block the barrier forever. The controller
//! bounds each barrier wait by `round_timeout` and the number of days by the
//! total feet to build, surfacing either as a [`BuildError`].
pub mod barrier;
pub mod concurrent;
pub mod serial;

pub use barrier::DayBarrier;
pub use concurrent::ConcurrentBuilder;
pub use serial::SerialBuilder;

use std::path::Path;

use crate::{
    config::{BuildMode, SimulationConfig},
    error::{BuildError, BuildResult},
    input::WallData,
    ledger::BuildLog,
};

/// The capability every build strategy offers: read the starting wall and
/// build it up to target, returning the quiesced ledger.
pub trait Builder
where
    Self: Send + Sync + Sized,
{
    /// Load the wall profiles from `path`.
    fn read_data(&self, path: &Path) -> BuildResult<WallData> {
        WallData::from_path(path)
    }

    /// Build every section of `data` to target height.
    ///
    /// The returned [`BuildLog`] is complete: no writer can still be touching
    /// the ledger it was taken from.
    fn build(&self, data: &WallData) -> impl Future<Output = BuildResult<BuildLog>> + Send;
}

/// A builder chosen at runtime from [`SimulationConfig::mode`].
#[derive(Debug, Clone)]
pub enum AnyBuilder {
    Serial(SerialBuilder),
    Concurrent(ConcurrentBuilder),
}

impl AnyBuilder {
    pub fn from_config(config: &SimulationConfig) -> Self {
        match config.mode {
            BuildMode::Serial => Self::Serial(
                SerialBuilder::builder()
                    .target_height(config.target_height)
                    .build(),
            ),
            BuildMode::Concurrent => Self::Concurrent(
                ConcurrentBuilder::builder()
                    .target_height(config.target_height)
                    .workers(config.workers)
                    .round_timeout(config.round_timeout())
                    .build(),
            ),
        }
    }
}

impl Builder for AnyBuilder {
    async fn build(&self, data: &WallData) -> BuildResult<BuildLog> {
        match self {
            Self::Serial(b) => {
                tracing::info!("Building the walls with SerialBuilder ...");
                b.build(data).await
            }
            Self::Concurrent(b) => {
                tracing::info!("Building the walls with ConcurrentBuilder ...");
                b.build(data).await
            }
        }
    }
}

/// Every day performs at least one foot of work, so a correct run never needs
/// more days than there are feet to build.
fn round_limit(data: &WallData, target: u32) -> BuildResult<u32> {
    u32::try_from(data.deficiency(target)).map_err(|_| {
        BuildError::InvalidConfig(format!(
            "{} feet to build exceeds the day counter range",
            data.deficiency(target)
        ))
    })
}
