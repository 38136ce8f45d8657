//! One reconciliation cycle: snapshot → validate → evaluate → resolve → update.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::{Instrument, info, info_span, instrument, warn};

use mealiesync_shared::{Assignment, RecipeStore, ReconcileConfig, Result};

use crate::query::{self, QueryStats};
use crate::retention;
use crate::taxonomy::TaxonomySnapshot;
use crate::updater::{self, UpdatePlan, UpdateStats};
use crate::validate::{self, MissingTerm};

/// Summary of one completed cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    /// Assignments that passed validation and ran.
    pub assignments_run: usize,
    /// Assignments skipped because they reference unknown terms.
    pub assignments_skipped: usize,
    pub queries: QueryStats,
    pub recipes: UpdateStats,
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} assignment(s) run, {} skipped; queries {} ok / {} skipped / {} failed; \
             recipes {} updated / {} unchanged / {} failed ({:.1}s)",
            self.assignments_run,
            self.assignments_skipped,
            self.queries.executed,
            self.queries.skipped,
            self.queries.failed,
            self.recipes.updated,
            self.recipes.unchanged,
            self.recipes.failed,
            self.elapsed.as_secs_f64(),
        )
    }
}

/// Result of checking every assignment against the live taxonomy.
#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    pub assignments: usize,
    /// 1-based assignment number and the names it is missing.
    pub invalid: Vec<(usize, Vec<MissingTerm>)>,
}

impl CheckReport {
    pub fn is_ok(&self) -> bool {
        self.invalid.is_empty()
    }
}

/// Applies a fixed list of assignments to a recipe store.
pub struct Reconciler {
    store: Arc<dyn RecipeStore>,
    assignments: Vec<Assignment>,
    config: ReconcileConfig,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn RecipeStore>,
        assignments: Vec<Assignment>,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            store,
            assignments,
            config,
        }
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Run every assignment once against a fresh taxonomy snapshot.
    ///
    /// Only a failed snapshot load is returned as an error; every other
    /// failure is logged and counted in the report.
    #[instrument(skip_all, name = "cycle")]
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let started_at = Utc::now();
        let start = Instant::now();
        info!(assignments = self.assignments.len(), "starting reconciliation cycle");

        let snapshot = TaxonomySnapshot::load(self.store.as_ref(), self.config.call_timeout).await?;

        let mut report = CycleReport {
            started_at,
            elapsed: Duration::ZERO,
            assignments_run: 0,
            assignments_skipped: 0,
            queries: QueryStats::default(),
            recipes: UpdateStats::default(),
        };

        for (idx, assignment) in self.assignments.iter().enumerate() {
            let number = idx + 1;

            if let Err(missing) = validate::validate(assignment, &snapshot) {
                log_missing(number, &missing);
                warn!(assignment = number, "skipping assignment with unknown terms");
                report.assignments_skipped += 1;
                continue;
            }

            let (queries, recipes) = self
                .run_assignment(number, assignment, &snapshot)
                .instrument(info_span!("assignment", assignment = number))
                .await;
            report.assignments_run += 1;
            report.queries += queries;
            report.recipes += recipes;
        }

        report.elapsed = start.elapsed();
        info!(
            run = report.assignments_run,
            skipped = report.assignments_skipped,
            updated = report.recipes.updated,
            unchanged = report.recipes.unchanged,
            failed = report.recipes.failed,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "reconciliation cycle complete"
        );
        Ok(report)
    }

    async fn run_assignment(
        &self,
        number: usize,
        assignment: &Assignment,
        snapshot: &TaxonomySnapshot,
    ) -> (QueryStats, UpdateStats) {
        let store = self.store.as_ref();
        let (decisions, queries) =
            query::evaluate(store, number, &assignment.queries, self.config.call_timeout).await;
        let working_set = retention::resolve(&decisions);
        info!(assignment = number, recipes = working_set.len(), "resolved working set");

        let plan = UpdatePlan::new(assignment, snapshot);
        let recipes = updater::update_recipes(
            store,
            number,
            &working_set,
            &plan,
            self.config.call_timeout,
            self.config.fetch_concurrency,
        )
        .await;
        (queries, recipes)
    }

    /// Validate every assignment against the live taxonomy without mutating anything.
    pub async fn check(&self) -> Result<CheckReport> {
        let snapshot = TaxonomySnapshot::load(self.store.as_ref(), self.config.call_timeout).await?;
        let mut report = CheckReport {
            assignments: self.assignments.len(),
            invalid: Vec::new(),
        };
        for (idx, assignment) in self.assignments.iter().enumerate() {
            if let Err(missing) = validate::validate(assignment, &snapshot) {
                log_missing(idx + 1, &missing);
                report.invalid.push((idx + 1, missing));
            }
        }
        Ok(report)
    }
}

fn log_missing(assignment: usize, missing: &[MissingTerm]) {
    for term in missing {
        warn!(
            assignment,
            kind = term.kind.singular(),
            list = term.list.as_str(),
            name = %term.name,
            "assignment references unknown term"
        );
    }
}
