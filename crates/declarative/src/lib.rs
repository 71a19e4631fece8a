//! # Declarative
//!
//! A framework for idempotent reconciliation.
//!
//! This crate provides the core abstractions for declaring desired state,
//! observing current state, and issuing the minimal set of corrective
//! actions to converge the two.
//!
//! ## Core Concepts
//!
//! - **Entity**: A declared item with a name and a [`DesiredState`]
//! - **Reconciler**: Capabilities for one entity kind (list, observe, create, ...)
//! - **Planner**: Pure mapping from (desired, observed) to ordered [`Step`]s
//! - **Executor**: Runs the steps entity by entity and folds the results
//!   into an [`AggregateResult`]
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{reconcile, LogProgress};
//!
//! let reconciler = GroupReconciler::new(&client);
//! let result = reconcile(&reconciler, &groups, &mut LogProgress)?;
//! if result.failed {
//!     // at least one group could not be converged
//! }
//! ```
//!
//! ## Provider Traits
//!
//! - [`Reconciler`]: Per-kind observation and mutation
//! - [`ProgressCallback`]: Receives progress updates
//!
//! This allows the crate to be used without hard dependencies on a
//! particular command runner or UI.

pub mod context;
pub mod delta;
pub mod executor;
pub mod planner;
pub mod resource;
pub mod types;

// Re-export main types at crate root
pub use context::{LogProgress, NoProgress, ProgressCallback};
pub use delta::SetDelta;
pub use executor::{reconcile, reconcile_entity};
pub use planner::{Step, plan};
pub use resource::{Entity, Reconciler};
pub use types::{ActionResult, AggregateResult, DesiredState, EntityReport, ObservedState};
