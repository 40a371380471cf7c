use serde::Serialize;
use std::fmt::Debug;
use std::future::Future;

use crate::{Day, ProfileId, error::BuildResult, history::History, macros::record};

/// A [`Report`] is a pure, serializable view derived from a finished
/// [`History`]: totals, per-day costs, per-profile summaries.
///
/// Reports do no I/O. Handing one to a [`Reporter`] is what puts it somewhere.
pub trait Report
where
    Self: Send + Sync + Debug + From<History> + Serialize,
{
}

/// A [`Reporter`] consumes a [`Report`] and performs side effects, such as
/// printing it or shipping it to another service.
pub trait Reporter<R: Report> {
    fn report(&self, report: &R) -> impl Future<Output = BuildResult<()>>;
}

#[record]
pub struct DayCost {
    pub day: Day,
    pub ice_amount: u64,
    pub cost: u64,
}

#[record]
pub struct ProfileCost {
    pub profile: ProfileId,
    pub ice_amount: u64,
    pub cost: u64,
}

/// Everything the query surface can answer, precomputed for one run.
#[record]
pub struct CostReport {
    pub rounds: Day,
    pub overall: u64,
    pub days: Vec<DayCost>,
    pub profiles: Vec<ProfileCost>,
}

impl From<History> for CostReport {
    fn from(history: History) -> Self {
        let pricing = history.pricing;
        let days = history
            .days()
            .into_iter()
            .map(|day| {
                let feet = history.increments_on(day);
                DayCost {
                    day,
                    ice_amount: pricing.volume(feet),
                    cost: pricing.cost(feet),
                }
            })
            .collect();
        let profiles = history
            .profiles
            .iter()
            .map(|(profile, days)| {
                let feet = days.values().sum();
                ProfileCost {
                    profile: *profile,
                    ice_amount: pricing.volume(feet),
                    cost: pricing.cost(feet),
                }
            })
            .collect();
        Self {
            rounds: history.rounds,
            overall: history.overall(),
            days,
            profiles,
        }
    }
}

impl Report for CostReport {}

/// Prints reports to stdout as pretty JSON.
pub struct StdoutReporter;

impl<R: Report> Reporter<R> for StdoutReporter {
    async fn report(&self, report: &R) -> BuildResult<()> {
        println!("{}", serde_json::to_string_pretty(report)?);
        Ok(())
    }
}
