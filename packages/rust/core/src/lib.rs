//! Reconciliation engine for mealiesync.
//!
//! A cycle loads the store's categories and tags, then for each assignment
//! validates its term names, evaluates its queries into a working set, and
//! writes the resulting category/tag changes back to each recipe. The
//! [`Scheduler`] runs cycles on a fixed cadence until cancelled.

mod deadline;
pub mod engine;
pub mod query;
pub mod retention;
pub mod scheduler;
pub mod taxonomy;
pub mod updater;
pub mod validate;

#[cfg(test)]
mod testing;

pub use engine::{CheckReport, CycleReport, Reconciler};
pub use query::QueryStats;
pub use retention::{Retention, RetentionSet};
pub use scheduler::{Scheduler, SchedulerHandle, next_wait};
pub use taxonomy::{TaxonomySnapshot, TermIndex};
pub use updater::{TaxonomyUpdate, UpdatePlan, UpdateStats, merge_terms};
pub use validate::{ActionList, MissingTerm};
