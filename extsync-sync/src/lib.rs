//! # extsync-sync
//!
//! Reconciles installed content extensions against the content backend.
//!
//! A pass loads the cached snapshot, discovers the current extensions, plans
//! the backend operations that close the gap and applies them in order. Call
//! [`pipeline::run`] for a locked pass or [`pipeline::prepare`] to plan
//! without touching anything.

pub mod diff;
pub mod driver;
pub mod error;
pub mod executor;
pub mod lock;
pub mod pipeline;
pub mod plan;
pub mod snapshot_store;

pub use diff::{compare, ComparisonRecord, ExtensionChange};
pub use driver::{apply, ApplyReport, FailurePolicy, StepOutcome, StepStatus};
pub use error::SyncError;
pub use executor::{BackendExecutor, ExecError, Executor};
pub use lock::PassLock;
pub use pipeline::{PassOptions, PassPlan, PassReport};
pub use plan::{Plan, SyncOperation, SyncStep};
pub use snapshot_store::SnapshotStore;
