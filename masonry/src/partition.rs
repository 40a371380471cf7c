//! Work partitions and the queue that hands them out.

use std::{collections::VecDeque, fmt, ops::RangeInclusive};

use crate::{Height, ProfileId, input::WallData};

/// Index of a partition in the run's partition arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionId(pub usize);

impl PartitionId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One section still short of its target height.
///
/// `remaining` spans every height the section has yet to reach, so `height`
/// can only move up one foot at a time and stops at the target. The start may
/// be negative; a start at or above the target leaves the range empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub profile: ProfileId,
    /// 1-based position of the section within its profile.
    pub section: usize,
    pub height: Height,
    remaining: RangeInclusive<Height>,
}

impl Partition {
    pub fn new(profile: ProfileId, section: usize, initial: Height, target: u32) -> Self {
        // `Height::MAX` can never be below a `u32` target, so the saturated
        // start only ever yields an empty range.
        let remaining = initial.saturating_add(1)..=Height::from(target);
        Self {
            profile,
            section,
            height: initial,
            remaining,
        }
    }

    /// Raise the section by one foot. Returns the new height, or `None` once
    /// the target has been reached.
    pub fn advance(&mut self) -> Option<Height> {
        let next = self.remaining.next()?;
        self.height = next;
        Some(next)
    }

    pub fn is_finished(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Feet still to build, saturating at `u64::MAX`.
    pub fn remaining(&self) -> u64 {
        if self.remaining.is_empty() {
            return 0;
        }
        let span = i128::from(*self.remaining.end()) - i128::from(*self.remaining.start()) + 1;
        u64::try_from(span).unwrap_or(u64::MAX)
    }
}

/// Ordered queue of partitions waiting for a worker.
///
/// Holds arena ids only; the partitions themselves stay in the arena returned
/// by [`PartitionQueue::initialize`].
#[derive(Debug, Default)]
pub struct PartitionQueue {
    pending: VecDeque<PartitionId>,
}

impl PartitionQueue {
    /// Explode every section short of `target` into a partition, ordered by
    /// (profile, section). Sections already at target are left out.
    pub fn initialize(data: &WallData, target: u32) -> (Vec<Partition>, Self) {
        tracing::info!("Preparing partitions ...");
        let arena: Vec<Partition> = data
            .iter()
            .flat_map(|(profile, sections)| {
                sections
                    .iter()
                    .zip(1..)
                    .map(move |(initial, section)| Partition::new(profile, section, *initial, target))
            })
            .filter(|p| !p.is_finished())
            .collect();
        let pending = (0..arena.len()).map(PartitionId).collect();
        tracing::info!("{} partitions ready.", arena.len());
        (arena, Self { pending })
    }

    /// Take the next partition, or `None` once the queue is drained.
    pub fn pop_next(&mut self) -> Option<PartitionId> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
