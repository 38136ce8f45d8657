//! Runs an assignment's filter queries in order and accumulates their matches.

use std::ops::AddAssign;
use std::time::Duration;

use tracing::{debug, info, warn};

use mealiesync_shared::{Query, QueryMode, RecipeStore};

use crate::deadline::bounded;
use crate::retention::{Retention, RetentionSet};

/// What happened to an assignment's queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryStats {
    /// Queries that reached the store and returned matches.
    pub executed: usize,
    /// Queries not sent because of their mode.
    pub skipped: usize,
    /// Queries whose store call failed or timed out.
    pub failed: usize,
}

impl AddAssign for QueryStats {
    fn add_assign(&mut self, rhs: Self) {
        self.executed += rhs.executed;
        self.skipped += rhs.skipped;
        self.failed += rhs.failed;
    }
}

/// Evaluate `queries` sequentially into a [`RetentionSet`].
///
/// `assignment` is the 1-based index used in log lines. A failed query
/// contributes no matches; later queries still run.
pub async fn evaluate(
    store: &dyn RecipeStore,
    assignment: usize,
    queries: &[Query],
    call_timeout: Duration,
) -> (RetentionSet, QueryStats) {
    let mut retention = RetentionSet::new();
    let mut stats = QueryStats::default();

    for (idx, query) in queries.iter().enumerate() {
        let query_no = idx + 1;

        let Some(decision) = Retention::for_mode(&query.mode) else {
            match &query.mode {
                QueryMode::Skip => {
                    info!(assignment, query = query_no, "skipping query due to mode setting");
                }
                other => {
                    warn!(
                        assignment,
                        query = query_no,
                        mode = %other,
                        "skipping query, unknown mode"
                    );
                }
            }
            stats.skipped += 1;
            continue;
        };

        debug!(assignment, query = query_no, params = ?query.params, "running query");
        let operation = format!("query {query_no} of assignment {assignment}");
        match bounded(call_timeout, operation, store.search_recipe_slugs(&query.params)).await {
            Ok(slugs) => {
                info!(
                    assignment,
                    query = query_no,
                    mode = %query.mode,
                    matched = slugs.len(),
                    "query matched recipes"
                );
                retention.record(slugs, decision);
                stats.executed += 1;
            }
            Err(e) => {
                warn!(assignment, query = query_no, error = %e, "failed to retrieve recipes");
                stats.failed += 1;
            }
        }
    }

    (retention, stats)
}
