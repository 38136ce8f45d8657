//! The recipe-store seam consumed by the reconciliation engine.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Organizer, Recipe, RecipeSlug, TaxonomyKind};

/// Operations the engine needs from a recipe store.
///
/// Implementations aggregate paginated responses themselves; callers always
/// see complete result lists. Deadlines are applied by the caller.
#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// Every known term of the given taxonomy.
    async fn fetch_taxonomy(&self, kind: TaxonomyKind) -> Result<Vec<Organizer>>;

    /// Slugs of all recipes matching the filter parameters.
    async fn search_recipe_slugs(&self, params: &BTreeMap<String, String>)
    -> Result<Vec<RecipeSlug>>;

    /// Full detail record of one recipe.
    async fn fetch_recipe(&self, slug: &RecipeSlug) -> Result<Recipe>;

    /// Replace a recipe's categories and tags with the given lists.
    async fn write_recipe_taxonomy(
        &self,
        slug: &RecipeSlug,
        categories: &[Organizer],
        tags: &[Organizer],
    ) -> Result<()>;
}
