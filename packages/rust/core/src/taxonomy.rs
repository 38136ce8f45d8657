//! Per-cycle snapshot of the store's categories and tags.
//!
//! A snapshot is loaded once at the start of every cycle and shared by all
//! assignments in that cycle. It is never carried over to the next cycle.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{debug, info};

use mealiesync_shared::{Organizer, RecipeStore, Result, TaxonomyKind};

use crate::deadline::bounded;

// ---------------------------------------------------------------------------
// TermIndex
// ---------------------------------------------------------------------------

/// Name-keyed index over the terms of one taxonomy.
#[derive(Debug, Clone, Default)]
pub struct TermIndex {
    by_name: BTreeMap<String, Organizer>,
}

impl TermIndex {
    /// Index `terms` by name. If the store reports a name twice, the first wins.
    pub fn from_terms(terms: impl IntoIterator<Item = Organizer>) -> Self {
        let mut by_name = BTreeMap::new();
        for term in terms {
            if by_name.contains_key(&term.name) {
                debug!(name = %term.name, "duplicate term name, keeping first");
                continue;
            }
            by_name.insert(term.name.clone(), term);
        }
        Self { by_name }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Known names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&Organizer> {
        self.by_name.get(name)
    }

    /// Concrete terms for `names`, skipping any that are unknown.
    pub fn resolve(&self, names: &[String]) -> Vec<Organizer> {
        names
            .iter()
            .filter_map(|name| self.get(name))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }
}

// ---------------------------------------------------------------------------
// TaxonomySnapshot
// ---------------------------------------------------------------------------

/// Categories and tags as they stood at the start of a cycle.
#[derive(Debug, Clone, Default)]
pub struct TaxonomySnapshot {
    pub categories: TermIndex,
    pub tags: TermIndex,
}

impl TaxonomySnapshot {
    /// Fetch both taxonomies, each under its own deadline.
    ///
    /// Any failure is returned to the caller; a cycle cannot run without a
    /// complete snapshot.
    pub async fn load(store: &dyn RecipeStore, call_timeout: Duration) -> Result<Self> {
        let categories = load_kind(store, TaxonomyKind::Categories, call_timeout).await?;
        let tags = load_kind(store, TaxonomyKind::Tags, call_timeout).await?;
        Ok(Self { categories, tags })
    }

    pub fn terms(&self, kind: TaxonomyKind) -> &TermIndex {
        match kind {
            TaxonomyKind::Categories => &self.categories,
            TaxonomyKind::Tags => &self.tags,
        }
    }
}

async fn load_kind(
    store: &dyn RecipeStore,
    kind: TaxonomyKind,
    call_timeout: Duration,
) -> Result<TermIndex> {
    let terms = bounded(
        call_timeout,
        format!("fetch {kind}"),
        store.fetch_taxonomy(kind),
    )
    .await?;
    let index = TermIndex::from_terms(terms);

    let known: Vec<&str> = index.names().collect();
    info!(%kind, count = index.len(), names = %known.join(", "), "known terms");
    Ok(index)
}
