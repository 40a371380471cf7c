//! Masonry — a round-synchronized simulation of a crew building a wall.
//!
//! A wall is a set of *profiles*, each made of *sections* with a starting
//! height. A crew of workers raises sections one foot per simulated day until
//! every section reaches the target height. Every foot is written to a
//! per-profile, per-day ledger, which is then queried for ice volume and cost.
//!
//! # Architecture
//!
//! The main building blocks are:
//!
//! - [`WallData`]: the starting heights, read from a text file with one
//!   profile per line.
//! - [`PartitionQueue`]: sections still short of target, handed out in
//!   (profile, section) order.
//! - [`Ledger`]: concurrent per-profile, per-day counter of built feet, with
//!   one lock per profile.
//! - [`Builder`]: the build strategy. [`SerialBuilder`] is the single-threaded
//!   reference; [`ConcurrentBuilder`] runs N worker slots in lock-step days
//!   closed by a [`DayBarrier`].
//! - [`Simulation`]: glue that reads the input, runs a builder and prices the
//!   result into a [`History`].
//! - [`History`]: read-only queries over a finished run.
//! - [`Report`] and [`Reporter`]: derived views of a history and where they go.
//!
//! # Example
//!
//! ```rust,no_run
//! use masonry::{ConcurrentBuilder, Simulation};
//!
//! #[tokio::main]
//! async fn main() {
//!     let history = Simulation::builder()
//!         .name("wall")
//!         .input("wall.txt")
//!         .builder(ConcurrentBuilder::builder().workers(4).build())
//!         .build()
//!         .run()
//!         .await
//!         .unwrap();
//!
//!     println!("Day 1, profile 1: {}", history.amount_per_profile_per_day(1, 1));
//!     println!("Overall: {}", history.overall());
//! }
//! ```
//!
//! # Feature flags
//!
//! - `cli`: builds the `masonry` binary. (Enabled by default)
//! - `internals`: exposes the concurrent builder's worker slots and worker
//!   tasks.

/// Build strategies
pub mod builder;
/// Run configuration
pub mod config;
/// Error type
pub mod error;
/// Queries over finished runs
pub mod history;
/// Reading wall profiles
pub mod input;
/// Per-profile, per-day ledger
pub mod ledger;
/// Sections and the queue that hands them out
pub mod partition;
/// Reports and Reporters
pub mod report;
/// Main module of the crate that glues everything together
pub mod simulation;

/// 1-based line number of a profile in the input.
pub type ProfileId = u32;
/// Simulated day, starting at 1.
pub type Day = u32;
/// Height of a section in feet. Sections may start below ground.
pub type Height = i64;

pub use builder::{AnyBuilder, Builder, ConcurrentBuilder, DayBarrier, SerialBuilder};
pub use config::{BuildMode, Pricing, SimulationConfig};
pub use error::{BuildError, BuildResult};
pub use history::History;
pub use input::WallData;
pub use ledger::{BuildLog, Ledger};
pub use partition::{Partition, PartitionId, PartitionQueue};
pub use report::{CostReport, Report, Reporter, StdoutReporter};
pub use simulation::{Simulation, simulate};

/// Procedural macros to reduce boilerplate
pub mod macros {
    pub use masonry_macros::*;
}
