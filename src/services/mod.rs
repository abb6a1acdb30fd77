//! Services module - case lifecycle logic on top of the data models.
//!
//! Everything here is framework-agnostic: file I/O, folder bookkeeping and
//! subprocess dispatch, with no assumptions about how callers drive it.
//!
//! # Components
//!
//! - [`CaseModel`]: the case aggregate. Owns the geometry set, refinement
//!   regions and document map, saves the canonical folder layout, and wires
//!   the snapshot and execution helpers to its own paths.
//!
//! - [`snapshot`]: numbered-folder bookkeeping. Discovers mesh snapshots and
//!   result folders, freezes and restores snapshots, promotes a snapshot's
//!   mesh description into the live mesh folder, and performs best-effort
//!   cleanup reported as [`CleanupOutcome`] values.
//!
//! - [`ExecutionEngine`]: external solver dispatch. Redirects each command's
//!   output into per-command log and error files and classifies success from
//!   the error file alone.

pub mod case;
pub mod execution;
pub mod snapshot;

pub use case::{CaseError, CaseModel, PurgeOptions, SUBFOLDERS};
pub use execution::{
    DispatchedCommand, ExecutionEngine, ExecutionError, ParallelSpec, RunReport, RunStatus,
};
pub use snapshot::{CleanupOutcome, SnapshotError, FROZEN_SUFFIX};
