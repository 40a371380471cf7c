use typed_builder::TypedBuilder;

use super::{Builder, round_limit};
use crate::{
    Day,
    config::DEFAULT_TARGET_HEIGHT,
    error::BuildResult,
    input::WallData,
    ledger::{BuildLog, Ledger},
    partition::PartitionQueue,
};

/// Single-threaded reference builder.
///
/// Each day it scans every partition once and raises each one still below
/// target by one foot. The run ends on the first day whose scan builds
/// nothing, so the number of days equals the largest single-section
/// deficiency.
#[derive(Debug, Clone, TypedBuilder)]
pub struct SerialBuilder {
    #[builder(default = DEFAULT_TARGET_HEIGHT)]
    pub target_height: u32,
}

impl Builder for SerialBuilder {
    async fn build(&self, data: &WallData) -> BuildResult<BuildLog> {
        round_limit(data, self.target_height)?;
        let (mut partitions, _) = PartitionQueue::initialize(data, self.target_height);
        let ledger = Ledger::for_profiles(data.profile_ids());
        let mut day: Day = 1;

        loop {
            let mut extended = 0usize;
            for partition in partitions.iter_mut() {
                if partition.advance().is_some() {
                    ledger.record(partition.profile, day).await?;
                    extended += 1;
                }
            }

            if extended == 0 {
                break;
            }
            tracing::info!("On day {day} the wall workers extended {extended} sections.");
            day += 1;
        }

        let rounds = day - 1;
        tracing::info!("Ready. Wall was built in {rounds} days.");
        Ok(BuildLog {
            rounds,
            entries: ledger.into_entries(),
        })
    }
}
