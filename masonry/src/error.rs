use std::{num::ParseIntError, path::PathBuf, time::Duration};

use crate::{Day, ProfileId};

/// Result alias used across the crate.
pub type BuildResult<T> = Result<T, BuildError>;

/// Every failure a build run can surface.
///
/// Input and configuration errors abort before any simulation state exists.
/// `Deadlock`, `RoundLimit` and `WorkerLost` are raised by the concurrent
/// builder's watchdog; the run is abandoned and no partial ledger is returned.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    // === Input errors ===
    /// The wall profile file does not exist.
    #[error("Initial walls from '{}' can not be found. Check the input path.", path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The wall profile file exists but could not be read.
    #[error("Failed to read wall profiles from '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A section height is not a non-negative integer.
    #[error("Profile {profile}, section {section}: '{token}' is not a valid height")]
    Parse {
        profile: ProfileId,
        section: usize,
        token: String,
        #[source]
        source: ParseIntError,
    },

    // === Configuration errors ===
    /// The configuration file could not be read or decoded.
    #[error("Failed to load configuration from '{}': {reason}", path.display())]
    Config { path: PathBuf, reason: String },

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // === Run errors ===
    /// A ledger write named a profile the ledger was not created for.
    #[error("Profile {profile} has no ledger; it was not part of the input")]
    UnknownProfile { profile: ProfileId },

    /// A worker was handed a partition with nothing left to build.
    #[error("Profile {profile}, section {section} was dispatched after reaching its target")]
    ExhaustedPartition { profile: ProfileId, section: usize },

    /// The day barrier was not released in time; at least one worker stalled.
    #[error("Day {day} did not complete within {waited:?}; a build worker stalled")]
    Deadlock { day: Day, waited: Duration },

    /// More rounds ran than there are feet to build.
    #[error("Build exceeded its bound of {limit} rounds without finishing")]
    RoundLimit { limit: Day },

    /// A worker task stopped before the run finished.
    #[error("Build worker {slot} stopped: {reason}")]
    WorkerLost { slot: usize, reason: String },

    /// The ledger is still referenced once every worker should have exited.
    #[error("Ledger is still shared with a running worker")]
    LedgerShared,

    // === Output errors ===
    /// A report could not be rendered.
    #[error("Failed to render report: {0}")]
    Report(#[from] serde_json::Error),
}
