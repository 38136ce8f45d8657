//! In-memory [`RecipeStore`] for engine tests.
//!
//! Queries are keyed by their `queryFilter` value. Writes are applied to the
//! stored recipes so a second cycle sees the result of the first.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use mealiesync_shared::{
    MealieSyncError, Organizer, Recipe, RecipeSlug, RecipeStore, Result, TaxonomyKind,
};

pub(crate) const FILTER_KEY: &str = "queryFilter";

/// Filter params with a single `queryFilter` entry.
pub(crate) fn params(filter: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(FILTER_KEY.to_string(), filter.to_string())])
}

pub(crate) fn term(name: &str) -> Organizer {
    Organizer {
        id: format!("id-{}", name.to_lowercase()),
        name: name.to_string(),
        slug: name.to_lowercase(),
    }
}

pub(crate) fn names(terms: &[Organizer]) -> Vec<&str> {
    let mut names: Vec<&str> = terms.iter().map(|t| t.name.as_str()).collect();
    names.sort_unstable();
    names
}

#[derive(Debug, Clone)]
pub(crate) struct RecordedWrite {
    pub slug: RecipeSlug,
    pub categories: Vec<Organizer>,
    pub tags: Vec<Organizer>,
}

#[derive(Default)]
pub(crate) struct MemoryStore {
    categories: Vec<Organizer>,
    tags: Vec<Organizer>,
    matches: BTreeMap<String, Vec<RecipeSlug>>,
    failing_queries: BTreeSet<String>,
    slow_queries: BTreeMap<String, Duration>,
    failing_fetches: BTreeSet<RecipeSlug>,
    failing_writes: BTreeSet<RecipeSlug>,
    taxonomy_delay: Duration,
    taxonomy_fails: bool,
    recipes: Mutex<BTreeMap<RecipeSlug, Recipe>>,
    searches: Mutex<Vec<BTreeMap<String, String>>>,
    writes: Mutex<Vec<RecordedWrite>>,
    taxonomy_loads: Mutex<Vec<Instant>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_categories(mut self, names: &[&str]) -> Self {
        self.categories = names.iter().map(|n| term(n)).collect();
        self
    }

    pub fn with_tags(mut self, names: &[&str]) -> Self {
        self.tags = names.iter().map(|n| term(n)).collect();
        self
    }

    pub fn with_recipe(self, slug: &str, categories: &[&str], tags: &[&str]) -> Self {
        let recipe = Recipe {
            id: format!("recipe-{slug}"),
            slug: slug.to_string(),
            name: slug.to_string(),
            categories: categories.iter().map(|n| term(n)).collect(),
            tags: tags.iter().map(|n| term(n)).collect(),
        };
        self.recipes
            .lock()
            .unwrap()
            .insert(RecipeSlug::from(slug), recipe);
        self
    }

    /// Make `filter` match the given slugs.
    pub fn with_matches(mut self, filter: &str, slugs: &[&str]) -> Self {
        self.matches.insert(
            filter.to_string(),
            slugs.iter().map(|s| RecipeSlug::from(*s)).collect(),
        );
        self
    }

    pub fn failing_query(mut self, filter: &str) -> Self {
        self.failing_queries.insert(filter.to_string());
        self
    }

    pub fn slow_query(mut self, filter: &str, delay: Duration) -> Self {
        self.slow_queries.insert(filter.to_string(), delay);
        self
    }

    pub fn failing_fetch(mut self, slug: &str) -> Self {
        self.failing_fetches.insert(RecipeSlug::from(slug));
        self
    }

    pub fn failing_write(mut self, slug: &str) -> Self {
        self.failing_writes.insert(RecipeSlug::from(slug));
        self
    }

    /// Delay every categories fetch, simulating a slow cycle.
    pub fn with_taxonomy_delay(mut self, delay: Duration) -> Self {
        self.taxonomy_delay = delay;
        self
    }

    pub fn failing_taxonomy(mut self) -> Self {
        self.taxonomy_fails = true;
        self
    }

    pub fn recipe(&self, slug: &str) -> Recipe {
        self.recipes.lock().unwrap()[&RecipeSlug::from(slug)].clone()
    }

    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.writes.lock().unwrap().clone()
    }

    pub fn searches(&self) -> Vec<BTreeMap<String, String>> {
        self.searches.lock().unwrap().clone()
    }

    /// Instants at which a cycle started loading the taxonomy.
    pub fn taxonomy_loads(&self) -> Vec<Instant> {
        self.taxonomy_loads.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecipeStore for MemoryStore {
    async fn fetch_taxonomy(&self, kind: TaxonomyKind) -> Result<Vec<Organizer>> {
        if kind == TaxonomyKind::Categories {
            self.taxonomy_loads.lock().unwrap().push(Instant::now());
            if !self.taxonomy_delay.is_zero() {
                tokio::time::sleep(self.taxonomy_delay).await;
            }
        }
        if self.taxonomy_fails {
            return Err(MealieSyncError::Network("taxonomy unavailable".into()));
        }
        Ok(match kind {
            TaxonomyKind::Categories => self.categories.clone(),
            TaxonomyKind::Tags => self.tags.clone(),
        })
    }

    async fn search_recipe_slugs(
        &self,
        params: &BTreeMap<String, String>,
    ) -> Result<Vec<RecipeSlug>> {
        self.searches.lock().unwrap().push(params.clone());
        let filter = params.get(FILTER_KEY).cloned().unwrap_or_default();

        if let Some(delay) = self.slow_queries.get(&filter) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing_queries.contains(&filter) {
            return Err(MealieSyncError::Http {
                status: 400,
                body: format!("bad filter {filter}"),
            });
        }
        Ok(self.matches.get(&filter).cloned().unwrap_or_default())
    }

    async fn fetch_recipe(&self, slug: &RecipeSlug) -> Result<Recipe> {
        if self.failing_fetches.contains(slug) {
            return Err(MealieSyncError::Network(format!("{slug}: connection reset")));
        }
        self.recipes
            .lock()
            .unwrap()
            .get(slug)
            .cloned()
            .ok_or_else(|| MealieSyncError::Http {
                status: 404,
                body: format!("slug {slug}"),
            })
    }

    async fn write_recipe_taxonomy(
        &self,
        slug: &RecipeSlug,
        categories: &[Organizer],
        tags: &[Organizer],
    ) -> Result<()> {
        if self.failing_writes.contains(slug) {
            return Err(MealieSyncError::Http {
                status: 500,
                body: "write rejected".into(),
            });
        }
        if let Some(recipe) = self.recipes.lock().unwrap().get_mut(slug) {
            recipe.categories = categories.to_vec();
            recipe.tags = tags.to_vec();
        }
        self.writes.lock().unwrap().push(RecordedWrite {
            slug: slug.clone(),
            categories: categories.to_vec(),
            tags: tags.to_vec(),
        });
        Ok(())
    }
}
