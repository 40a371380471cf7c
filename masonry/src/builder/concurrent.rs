use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use tokio::{sync::Mutex, task::JoinHandle};
use typed_builder::TypedBuilder;

use super::{Builder, round_limit};
use crate::{
    Day,
    config::DEFAULT_TARGET_HEIGHT,
    error::{BuildError, BuildResult},
    input::WallData,
    ledger::{BuildLog, Ledger},
    partition::{Partition, PartitionQueue},
};
use internals::*;

/// Builder that runs a fixed crew of worker slots in lock-step days.
///
/// - Every active slot raises its section by exactly one foot per day.
/// - A slot whose section reaches target takes the next queued section at the
///   start of the following day, or goes idle for the rest of the run.
/// - Days are closed by a [`DayBarrier`](super::DayBarrier) sized to the
///   active slots, so day `D` always finishes before day `D + 1` starts.
///
/// # Tuning knobs
///
/// - `workers`: size of the crew. With fewer workers than sections the run
///   takes more days; lifetime totals are unaffected.
/// - `round_timeout`: longest the controller waits for a single day's barrier
///   before giving up with [`BuildError::Deadlock`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct ConcurrentBuilder {
    #[builder(default = DEFAULT_TARGET_HEIGHT)]
    pub target_height: u32,
    #[builder(default = num_cpus::get())]
    pub workers: usize,
    #[builder(default = Duration::from_secs(30))]
    pub round_timeout: Duration,
}

impl Builder for ConcurrentBuilder {
    async fn build(&self, data: &WallData) -> BuildResult<BuildLog> {
        if self.workers == 0 {
            return Err(BuildError::InvalidConfig(
                "the concurrent builder needs at least one worker".into(),
            ));
        }
        let limit = round_limit(data, self.target_height)?;

        let (partitions, mut queue) = PartitionQueue::initialize(data, self.target_height);
        let arena: Arena = partitions.into_iter().map(Mutex::new).collect();
        let ledger = Arc::new(Ledger::for_profiles(data.profile_ids()));

        tracing::info!("Spawning {} build workers...", self.workers);
        let (mut slots, handles) = spawn_crew(self.workers, &arena, &ledger);
        for slot in slots.iter_mut() {
            slot.assign(queue.pop_next(), &arena).await;
        }

        let outcome = drive_days(&mut slots, &mut queue, &arena, limit, self.round_timeout).await;
        let rounds = match outcome {
            Ok(rounds) => rounds,
            Err(e) => {
                let e = worker_failure(e, handles).await;
                tracing::error!("Build aborted: {e}");
                return Err(e);
            }
        };

        // Closing the remaining channels lets every worker loop end.
        drop(slots);
        tracing::info!("Retrieving tallies from build workers...");
        for (slot, joined) in (1..).zip(join_all(handles).await) {
            let tally = joined.map_err(|e| BuildError::WorkerLost {
                slot,
                reason: e.to_string(),
            })??;
            tracing::debug!(
                "Build worker {} built {} feet.",
                tally.slot,
                tally.increments
            );
        }

        drop(arena);
        let ledger = Arc::try_unwrap(ledger).map_err(|_| BuildError::LedgerShared)?;
        tracing::info!("Ready. Wall was built in {rounds} days.");
        Ok(BuildLog {
            rounds,
            entries: ledger.into_entries(),
        })
    }
}

/// Run days until no slot holds a partition. Returns the number of days run.
async fn drive_days(
    slots: &mut [WorkerSlot],
    queue: &mut PartitionQueue,
    arena: &Arena,
    limit: Day,
    round_timeout: Duration,
) -> BuildResult<Day> {
    let mut day: Day = 1;
    loop {
        for slot in slots.iter_mut() {
            if slot.holds_finished(arena).await {
                slot.assign(queue.pop_next(), arena).await;
            }
        }

        let active = slots.iter().filter(|s| s.is_active()).count();
        if active == 0 {
            return Ok(day - 1);
        }
        if day > limit {
            return Err(BuildError::RoundLimit { limit });
        }

        let barrier = Arc::new(super::DayBarrier::for_round(day, active));
        for slot in slots.iter().filter(|s| s.is_active()) {
            slot.dispatch(day, &barrier).await?;
        }
        barrier.release(round_timeout).await?;
        tracing::debug!("Day {day} closed with {active} active workers.");
        day += 1;
    }
}

/// Abort the crew after a failed day. When the failure is a lost worker,
/// the error that worker exited with replaces the generic one.
async fn worker_failure(
    err: BuildError,
    mut handles: Vec<JoinHandle<BuildResult<SlotTally>>>,
) -> BuildError {
    let lost = match &err {
        BuildError::WorkerLost { slot, .. } if (1..=handles.len()).contains(slot) => {
            Some(handles.swap_remove(slot - 1))
        }
        _ => None,
    };
    for handle in &handles {
        handle.abort();
    }
    // A lost worker has already closed its channel, so it is exiting.
    match lost {
        Some(handle) => match handle.await {
            Ok(Err(cause)) => cause,
            _ => err,
        },
        None => err,
    }
}

#[cfg(feature = "internals")]
pub use internals::*;

/// Worker slots and the tasks behind them.
mod internals {
    use tokio::sync::mpsc::{self, Receiver, Sender};

    use super::*;
    use crate::{builder::DayBarrier, partition::PartitionId};

    /// Every partition of the run. Slots address it by [`PartitionId`]; a
    /// partition's lock is only ever taken by the slot currently holding it,
    /// or by the controller between days.
    pub type Arena = Arc<[Mutex<Partition>]>;

    /// One day's work order for a single slot.
    #[derive(Debug)]
    pub struct Shift {
        pub day: Day,
        pub partition: PartitionId,
        pub barrier: Arc<DayBarrier>,
    }

    /// What a worker built over the whole run.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SlotTally {
        pub slot: usize,
        pub increments: u64,
    }

    /// Controller-side view of one worker.
    #[derive(Debug)]
    pub struct WorkerSlot {
        /// 1-based slot number.
        pub index: usize,
        partition: Option<PartitionId>,
        shifts: Option<Sender<Shift>>,
    }

    impl WorkerSlot {
        pub fn new(index: usize, shifts: Sender<Shift>) -> Self {
            Self {
                index,
                partition: None,
                shifts: Some(shifts),
            }
        }

        #[cfg(any(test, feature = "internals"))]
        pub fn partition(&self) -> Option<PartitionId> {
            self.partition
        }

        pub fn is_active(&self) -> bool {
            self.partition.is_some()
        }

        /// True when the held partition has nothing left to build.
        pub async fn holds_finished(&self, arena: &Arena) -> bool {
            match self.partition {
                Some(id) => arena[id.index()].lock().await.is_finished(),
                None => false,
            }
        }

        /// Hand this slot its next partition. `None` retires the slot: its
        /// channel is closed and the worker task exits.
        pub async fn assign(&mut self, next: Option<PartitionId>, arena: &Arena) {
            self.partition = next;
            match next {
                Some(id) => {
                    let p = arena[id.index()].lock().await;
                    tracing::info!(
                        "Build worker {} moves to profile {}, section {}.",
                        self.index,
                        p.profile,
                        p.section
                    );
                }
                None => {
                    if self.shifts.take().is_some() {
                        tracing::info!("Build worker {} is ready.", self.index);
                    }
                }
            }
        }

        /// Send today's shift to the worker.
        pub async fn dispatch(&self, day: Day, barrier: &Arc<DayBarrier>) -> BuildResult<()> {
            let (Some(partition), Some(shifts)) = (self.partition, &self.shifts) else {
                return Ok(());
            };
            let shift = Shift {
                day,
                partition,
                barrier: barrier.clone(),
            };
            shifts.send(shift).await.map_err(|_| BuildError::WorkerLost {
                slot: self.index,
                reason: "shift channel closed".into(),
            })
        }
    }

    /// Spawn `workers` worker tasks and the slots that drive them.
    pub fn spawn_crew(
        workers: usize,
        arena: &Arena,
        ledger: &Arc<Ledger>,
    ) -> (Vec<WorkerSlot>, Vec<JoinHandle<BuildResult<SlotTally>>>) {
        (1..=workers)
            .map(|index| {
                // A slot has at most one shift in flight.
                let (tx, rx) = mpsc::channel(1);
                let handle = spawn_worker(index, rx, arena.clone(), ledger.clone());
                (WorkerSlot::new(index, tx), handle)
            })
            .unzip()
    }

    /// Spawn one worker task. For every shift it receives it raises the
    /// shift's partition by one foot, records it, and arrives at the day's
    /// barrier. It exits when its channel closes.
    pub fn spawn_worker(
        index: usize,
        mut shifts: Receiver<Shift>,
        arena: Arena,
        ledger: Arc<Ledger>,
    ) -> JoinHandle<BuildResult<SlotTally>> {
        tokio::spawn(async move {
            let mut tally = SlotTally {
                slot: index,
                increments: 0,
            };
            tracing::debug!("Build worker {index} spawned.");

            while let Some(shift) = shifts.recv().await {
                let (profile, section, height) = {
                    let mut partition = arena[shift.partition.index()].lock().await;
                    let height = partition.advance();
                    (partition.profile, partition.section, height)
                };

                let recorded = match height {
                    Some(height) => {
                        tracing::debug!(
                            "On day {} build worker {index} extended section {section} of profile {profile} to {height} feet.",
                            shift.day
                        );
                        ledger.record(profile, shift.day).await
                    }
                    None => Err(BuildError::ExhaustedPartition { profile, section }),
                };
                if recorded.is_err() {
                    // The controller's next dispatch must fail rather than queue.
                    shifts.close();
                }
                // Arrive even on failure; the controller is waiting on this day.
                shift.barrier.arrive().await;
                recorded?;
                tally.increments += 1;
            }

            tracing::debug!("Build worker {index} shutting down.");
            Ok(tally)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::PartitionId;

    fn original_fixture() -> WallData {
        WallData::from_iter([vec![21, 25, 28], vec![17], vec![17, 22, 17, 19, 17]])
    }

    fn crew(workers: usize) -> ConcurrentBuilder {
        ConcurrentBuilder::builder().workers(workers).build()
    }

    #[tokio::test]
    async fn spawn_expected_number_of_workers() {
        let arena: Arena = Vec::<Mutex<Partition>>::new().into();
        let ledger = Arc::new(Ledger::default());
        let (slots, handles) = spawn_crew(5, &arena, &ledger);

        assert_eq!(slots.len(), 5);
        assert_eq!(handles.len(), 5);
        let indices: Vec<_> = slots.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4, 5]);
        assert!(slots.iter().all(|s| s.partition().is_none()));

        drop(slots);
        for h in join_all(handles).await {
            assert_eq!(h.unwrap().unwrap().increments, 0);
        }
    }

    #[tokio::test]
    async fn worker_builds_one_foot_per_shift() {
        let arena: Arena = vec![Mutex::new(Partition::new(1, 1, 28, 30))].into();
        let ledger = Arc::new(Ledger::for_profiles([1]));
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        let handle = spawn_worker(1, rx, arena.clone(), ledger.clone());

        for day in 1..=2 {
            let barrier = Arc::new(crate::builder::DayBarrier::for_round(day, 1));
            tx.send(Shift {
                day,
                partition: PartitionId(0),
                barrier: barrier.clone(),
            })
            .await
            .unwrap();
            barrier.release(Duration::from_secs(5)).await.unwrap();
            assert_eq!(arena[0].lock().await.height, 28 + i64::from(day));
        }

        drop(tx);
        let tally = handle.await.unwrap().unwrap();
        assert_eq!(tally.increments, 2);
        drop(arena);
        let entries = Arc::try_unwrap(ledger).unwrap().into_entries();
        assert_eq!(entries[&1].values().sum::<u64>(), 2);
    }

    #[tokio::test]
    async fn exhausted_partition_fails_without_blocking_the_day() {
        let arena: Arena = vec![Mutex::new(Partition::new(3, 2, 30, 30))].into();
        let ledger = Arc::new(Ledger::for_profiles([3]));
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        let handle = spawn_worker(1, rx, arena, ledger);

        let barrier = Arc::new(crate::builder::DayBarrier::for_round(1, 1));
        tx.send(Shift {
            day: 1,
            partition: PartitionId(0),
            barrier: barrier.clone(),
        })
        .await
        .unwrap();
        barrier.release(Duration::from_secs(5)).await.unwrap();

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(
            err,
            BuildError::ExhaustedPartition {
                profile: 3,
                section: 2
            }
        ));
    }

    /// One slot holding a partition that is two feet short of target.
    async fn single_slot(shifts: tokio::sync::mpsc::Sender<Shift>) -> (Vec<WorkerSlot>, Arena) {
        let arena: Arena = vec![Mutex::new(Partition::new(1, 1, 28, 30))].into();
        let mut slot = WorkerSlot::new(1, shifts);
        slot.assign(Some(PartitionId(0)), &arena).await;
        (vec![slot], arena)
    }

    #[tokio::test]
    async fn silent_worker_deadlocks_the_day() {
        let (tx, _rx) = tokio::sync::mpsc::channel(1);
        let (mut slots, arena) = single_slot(tx).await;

        let err = drive_days(
            &mut slots,
            &mut PartitionQueue::default(),
            &arena,
            5,
            Duration::from_millis(50),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, BuildError::Deadlock { day: 1, .. }));
    }

    #[tokio::test]
    async fn round_limit_stops_the_run() {
        let (tx, _rx) = tokio::sync::mpsc::channel(1);
        let (mut slots, arena) = single_slot(tx).await;

        let err = drive_days(
            &mut slots,
            &mut PartitionQueue::default(),
            &arena,
            0,
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, BuildError::RoundLimit { limit: 0 }));
    }

    #[tokio::test]
    async fn closed_channel_loses_the_worker() {
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        drop(rx);
        let (mut slots, arena) = single_slot(tx).await;

        let err = drive_days(
            &mut slots,
            &mut PartitionQueue::default(),
            &arena,
            5,
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, BuildError::WorkerLost { slot: 1, .. }));
    }

    #[tokio::test]
    async fn failed_worker_reports_its_own_error() {
        let arena: Arena = vec![Mutex::new(Partition::new(1, 1, 28, 30))].into();
        // Profile 1 is missing, so the first ledger write fails.
        let ledger = Arc::new(Ledger::default());
        let (mut slots, handles) = spawn_crew(1, &arena, &ledger);
        slots[0].assign(Some(PartitionId(0)), &arena).await;

        let err = drive_days(
            &mut slots,
            &mut PartitionQueue::default(),
            &arena,
            5,
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, BuildError::WorkerLost { slot: 1, .. }));

        let err = worker_failure(err, handles).await;
        assert!(matches!(err, BuildError::UnknownProfile { profile: 1 }));
    }

    #[tokio::test]
    async fn other_failures_pass_through_unchanged() {
        let arena: Arena = Vec::<Mutex<Partition>>::new().into();
        let ledger = Arc::new(Ledger::default());
        let (_slots, handles) = spawn_crew(2, &arena, &ledger);

        let err = worker_failure(BuildError::RoundLimit { limit: 3 }, handles).await;
        assert!(matches!(err, BuildError::RoundLimit { limit: 3 }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn two_workers_follow_queue_order() {
        let log = crew(2).build(&original_fixture()).await.unwrap();

        // Day 1: both workers are on profile 1, sections 1 and 2.
        assert_eq!(log.entries[&1][&1], 2);
        assert!(!log.entries[&2].contains_key(&1));
        assert_eq!(log.total_feet(), 87);
        assert!(log.rounds > 17);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn one_worker_per_section_matches_serial_days() {
        let data = original_fixture();
        let log = crew(data.section_count()).build(&data).await.unwrap();
        assert_eq!(u64::from(log.rounds), data.max_deficiency(30));
        assert_eq!(log.entries[&3][&1], 5);
    }

    #[tokio::test]
    async fn single_worker_builds_one_foot_per_day() {
        let data = WallData::from_iter([vec![27], vec![28]]);
        let log = crew(1).build(&data).await.unwrap();
        assert_eq!(log.rounds, 5);
        for days in log.entries.values() {
            assert!(days.values().all(|n| *n == 1));
        }
    }

    #[tokio::test]
    async fn surplus_workers_stay_idle() {
        let data = WallData::from_iter([vec![29, 30]]);
        let log = crew(8).build(&data).await.unwrap();
        assert_eq!(log.rounds, 1);
        assert_eq!(log.total_feet(), 1);
    }

    #[tokio::test]
    async fn zero_workers_is_invalid() {
        let err = crew(0).build(&original_fixture()).await.unwrap_err();
        assert!(matches!(err, BuildError::InvalidConfig(_)));
    }
}
