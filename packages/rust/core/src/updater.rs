//! Applies an assignment's set/unset actions to the recipes in its working set.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::AddAssign;
use std::pin::pin;
use std::time::Duration;

use futures::StreamExt;
use tracing::{debug, info, warn};

use mealiesync_shared::{Assignment, Organizer, Recipe, RecipeSlug, RecipeStore, TaxonomyKind};

use crate::deadline::bounded;
use crate::taxonomy::{TaxonomySnapshot, TermIndex};

// ---------------------------------------------------------------------------
// Term merging
// ---------------------------------------------------------------------------

/// Compute `(current ∪ add) \ remove` by name.
///
/// Returns the new collection, sorted by name, and whether its set of names
/// differs from that of `current`. Terms already on the recipe are kept as
/// they are, even if `add` carries a term of the same name.
pub fn merge_terms(
    current: &[Organizer],
    add: &[Organizer],
    remove: &[Organizer],
) -> (Vec<Organizer>, bool) {
    let before: BTreeSet<&str> = current.iter().map(|t| t.name.as_str()).collect();

    let mut merged: BTreeMap<&str, &Organizer> = BTreeMap::new();
    for term in current.iter().chain(add) {
        merged.entry(term.name.as_str()).or_insert(term);
    }
    for term in remove {
        merged.remove(term.name.as_str());
    }

    let changed = !merged.keys().copied().eq(before.iter().copied());
    (merged.into_values().cloned().collect(), changed)
}

/// Set/unset names of one taxonomy, resolved to concrete store terms.
#[derive(Debug, Clone, Default)]
pub struct ResolvedActions {
    pub add: Vec<Organizer>,
    pub remove: Vec<Organizer>,
}

impl ResolvedActions {
    fn resolve(assignment: &Assignment, kind: TaxonomyKind, index: &TermIndex) -> Self {
        let actions = assignment.actions(kind);
        Self {
            add: index.resolve(&actions.set),
            remove: index.resolve(&actions.unset),
        }
    }

    fn apply(&self, current: &[Organizer]) -> (Vec<Organizer>, bool) {
        merge_terms(current, &self.add, &self.remove)
    }
}

/// The resolved changes one assignment makes to every recipe it selects.
#[derive(Debug, Clone, Default)]
pub struct UpdatePlan {
    pub categories: ResolvedActions,
    pub tags: ResolvedActions,
}

impl UpdatePlan {
    /// Resolve `assignment` against the cycle's snapshot.
    pub fn new(assignment: &Assignment, snapshot: &TaxonomySnapshot) -> Self {
        Self {
            categories: ResolvedActions::resolve(
                assignment,
                TaxonomyKind::Categories,
                &snapshot.categories,
            ),
            tags: ResolvedActions::resolve(assignment, TaxonomyKind::Tags, &snapshot.tags),
        }
    }

    /// The collections `recipe` should end up with.
    pub fn apply(&self, recipe: &Recipe) -> TaxonomyUpdate {
        let (categories, categories_changed) = self.categories.apply(&recipe.categories);
        let (tags, tags_changed) = self.tags.apply(&recipe.tags);
        TaxonomyUpdate {
            categories,
            tags,
            categories_changed,
            tags_changed,
        }
    }
}

/// New category/tag collections for one recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonomyUpdate {
    pub categories: Vec<Organizer>,
    pub tags: Vec<Organizer>,
    pub categories_changed: bool,
    pub tags_changed: bool,
}

impl TaxonomyUpdate {
    /// Whether a write-back is needed.
    pub fn changed(&self) -> bool {
        self.categories_changed || self.tags_changed
    }
}

// ---------------------------------------------------------------------------
// Recipe updates
// ---------------------------------------------------------------------------

/// Per-recipe outcomes for one assignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateStats {
    /// Recipes written back with new collections.
    pub updated: usize,
    /// Recipes that already matched the plan.
    pub unchanged: usize,
    /// Recipes whose fetch or write failed.
    pub failed: usize,
}

impl AddAssign for UpdateStats {
    fn add_assign(&mut self, rhs: Self) {
        self.updated += rhs.updated;
        self.unchanged += rhs.unchanged;
        self.failed += rhs.failed;
    }
}

/// Fetch, recompute, and (when changed) write back every recipe in `slugs`.
///
/// Up to `fetch_concurrency` detail fetches are in flight at once; writes
/// happen one at a time in slug order. A failure affects only its recipe.
pub async fn update_recipes(
    store: &dyn RecipeStore,
    assignment: usize,
    slugs: &BTreeSet<RecipeSlug>,
    plan: &UpdatePlan,
    call_timeout: Duration,
    fetch_concurrency: usize,
) -> UpdateStats {
    let mut stats = UpdateStats::default();
    let total = slugs.len();

    if total == 0 {
        info!(assignment, "no recipes to process");
        return stats;
    }

    // Fetch futures must own their slug for the cycle future to be Send.
    let fetches = futures::stream::iter(slugs.iter().cloned().enumerate())
        .map(|(idx, slug)| async move {
            debug!(assignment, recipe = idx + 1, total, %slug, "processing recipe");
            let fetched = bounded(
                call_timeout,
                format!("fetch recipe {slug}"),
                store.fetch_recipe(&slug),
            )
            .await;
            (slug, fetched)
        })
        .buffered(fetch_concurrency.max(1));
    let mut fetches = pin!(fetches);

    while let Some((slug, fetched)) = fetches.next().await {
        let recipe = match fetched {
            Ok(recipe) => recipe,
            Err(e) => {
                warn!(
                    assignment,
                    %slug,
                    error = %e,
                    "skipping recipe that failed to yield details"
                );
                stats.failed += 1;
                continue;
            }
        };

        let update = plan.apply(&recipe);
        if !update.changed() {
            debug!(assignment, %slug, "recipe already up to date");
            stats.unchanged += 1;
            continue;
        }

        let write = store.write_recipe_taxonomy(&slug, &update.categories, &update.tags);
        match bounded(call_timeout, format!("update recipe {slug}"), write).await {
            Ok(()) => {
                info!(
                    assignment,
                    %slug,
                    categories_changed = update.categories_changed,
                    tags_changed = update.tags_changed,
                    "updated organisers"
                );
                stats.updated += 1;
            }
            Err(e) => {
                warn!(assignment, %slug, error = %e, "failed to update organisers");
                stats.failed += 1;
            }
        }
    }

    stats
}
