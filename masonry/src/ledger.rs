//! Per-profile, per-day record of built feet.

use std::collections::{BTreeMap, HashMap};

use tokio::sync::Mutex;

use crate::{
    Day, ProfileId,
    error::{BuildError, BuildResult},
    macros::record,
};

/// Feet built per day, keyed by profile then day.
pub type LedgerEntries = BTreeMap<ProfileId, BTreeMap<Day, u64>>;

/// Concurrent ledger shared by every worker of a run.
///
/// Each profile has its own lock, so writers on different profiles never
/// block each other while writes to the same profile are serialized. The set
/// of profiles is fixed at construction.
///
/// There is no way to read a live ledger: entries only become visible through
/// [`Ledger::into_entries`], which needs the ledger back by value and so can
/// only happen after every worker has dropped its handle.
#[derive(Debug, Default)]
pub struct Ledger {
    profiles: HashMap<ProfileId, Mutex<BTreeMap<Day, u64>>>,
}

impl Ledger {
    pub fn for_profiles(ids: impl IntoIterator<Item = ProfileId>) -> Self {
        Self {
            profiles: ids
                .into_iter()
                .map(|id| (id, Mutex::new(BTreeMap::new())))
                .collect(),
        }
    }

    /// Count one foot built for `profile` on `day`.
    pub async fn record(&self, profile: ProfileId, day: Day) -> BuildResult<()> {
        let days = self
            .profiles
            .get(&profile)
            .ok_or(BuildError::UnknownProfile { profile })?;
        *days.lock().await.entry(day).or_insert(0) += 1;
        Ok(())
    }

    pub fn into_entries(self) -> LedgerEntries {
        self.profiles
            .into_iter()
            .map(|(id, days)| (id, days.into_inner()))
            .collect()
    }
}

/// Outcome of one builder run: the quiesced ledger and how many days it took.
#[record]
pub struct BuildLog {
    /// Days on which at least one foot was built.
    pub rounds: Day,
    pub entries: LedgerEntries,
}

impl BuildLog {
    pub fn total_feet(&self) -> u64 {
        self.entries.values().flat_map(BTreeMap::values).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use std::sync::Arc;

    #[tokio::test]
    async fn creates_entries_on_first_write() {
        let ledger = Ledger::for_profiles([1, 2]);
        ledger.record(1, 1).await.unwrap();
        ledger.record(1, 1).await.unwrap();
        ledger.record(1, 3).await.unwrap();

        let entries = ledger.into_entries();
        assert_eq!(entries[&1], BTreeMap::from([(1, 2), (3, 1)]));
        assert!(entries[&2].is_empty());
    }

    #[tokio::test]
    async fn unknown_profile_is_rejected() {
        let ledger = Ledger::for_profiles([1]);
        let err = ledger.record(7, 1).await.unwrap_err();
        assert!(matches!(err, BuildError::UnknownProfile { profile: 7 }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writes_are_not_lost() {
        let ledger = Arc::new(Ledger::for_profiles(1..=4));
        let writers = (0..64u32).map(|i| {
            let ledger = ledger.clone();
            tokio::spawn(async move {
                for _ in 0..50 {
                    ledger.record(i % 4 + 1, 1 + i % 2).await.unwrap();
                }
            })
        });
        for handle in join_all(writers).await {
            handle.unwrap();
        }

        let entries = Arc::try_unwrap(ledger).unwrap().into_entries();
        for profile in 1..=4 {
            let days = &entries[&profile];
            assert_eq!(days.values().sum::<u64>(), 16 * 50);
        }
        let log = BuildLog { rounds: 2, entries };
        assert_eq!(log.total_feet(), 64 * 50);
    }
}
