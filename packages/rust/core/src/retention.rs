//! Keep/drop decisions per recipe, accumulated across an assignment's queries.

use std::collections::{BTreeSet, HashMap};

use mealiesync_shared::{QueryMode, RecipeSlug};

/// Outcome of the last query that matched a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    Keep,
    Drop,
}

impl Retention {
    /// The decision a query of `mode` records for its matches, if it records any.
    pub fn for_mode(mode: &QueryMode) -> Option<Self> {
        match mode {
            QueryMode::Add => Some(Self::Keep),
            QueryMode::Remove => Some(Self::Drop),
            QueryMode::Skip | QueryMode::Unknown(_) => None,
        }
    }
}

/// Decisions for one assignment within one cycle.
///
/// A recipe no query ever matched has no entry; it is treated the same as
/// [`Retention::Drop`] when resolving.
#[derive(Debug, Clone, Default)]
pub struct RetentionSet {
    decisions: HashMap<RecipeSlug, Retention>,
}

impl RetentionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `decision` for every slug, replacing earlier decisions.
    pub fn record(&mut self, slugs: impl IntoIterator<Item = RecipeSlug>, decision: Retention) {
        for slug in slugs {
            self.decisions.insert(slug, decision);
        }
    }

    pub fn decision(&self, slug: &RecipeSlug) -> Option<Retention> {
        self.decisions.get(slug).copied()
    }

}

/// The working set: every slug whose final decision is [`Retention::Keep`].
pub fn resolve(set: &RetentionSet) -> BTreeSet<RecipeSlug> {
    set.decisions
        .iter()
        .filter(|(_, decision)| **decision == Retention::Keep)
        .map(|(slug, _)| slug.clone())
        .collect()
}
