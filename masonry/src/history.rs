//! Queries over a finished build.
//!
//! A [`History`] is only ever produced from a [`BuildLog`], i.e. after the
//! run's last day has been released, so every query here reads a quiesced
//! ledger. Unknown profiles and days are not errors: they simply built
//! nothing and report zero.

use std::collections::BTreeSet;

use crate::{
    Day, ProfileId,
    config::Pricing,
    ledger::{BuildLog, LedgerEntries},
    macros::record,
};

#[record]
pub struct History {
    pub rounds: Day,
    pub pricing: Pricing,
    pub profiles: LedgerEntries,
}

impl History {
    pub fn from_log(log: BuildLog, pricing: Pricing) -> Self {
        Self {
            rounds: log.rounds,
            pricing,
            profiles: log.entries,
        }
    }

    /// Feet built for `profile` on `day`.
    pub fn feet(&self, profile: ProfileId, day: Day) -> u64 {
        self.profiles
            .get(&profile)
            .and_then(|days| days.get(&day))
            .copied()
            .unwrap_or(0)
    }

    /// Feet built across every profile on `day`.
    pub fn increments_on(&self, day: Day) -> u64 {
        self.profiles.values().filter_map(|days| days.get(&day)).sum()
    }

    pub fn total_feet(&self) -> u64 {
        self.profiles.values().flat_map(|days| days.values()).sum()
    }

    /// Every day with at least one ledger entry, ascending.
    pub fn days(&self) -> BTreeSet<Day> {
        self.profiles
            .values()
            .flat_map(|days| days.keys().copied())
            .collect()
    }

    pub fn amount_per_profile_per_day(&self, profile: ProfileId, day: Day) -> u64 {
        self.pricing.volume(self.feet(profile, day))
    }

    pub fn price_per_profile_per_day(&self, profile: ProfileId, day: Day) -> u64 {
        self.pricing.cost(self.feet(profile, day))
    }

    pub fn price_per_day(&self, day: Day) -> u64 {
        self.pricing.cost(self.increments_on(day))
    }

    pub fn overall(&self) -> u64 {
        self.pricing.cost(self.total_feet())
    }
}
