//! Core domain types: taxonomy terms, recipes, and query assignments.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Taxonomy
// ---------------------------------------------------------------------------

/// Which taxonomy a term belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaxonomyKind {
    Categories,
    Tags,
}

impl TaxonomyKind {
    /// Path segment used by the store's organizer endpoints.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Categories => "categories",
            Self::Tags => "tags",
        }
    }

    /// Singular noun for log lines ("category", "tag").
    pub fn singular(self) -> &'static str {
        match self {
            Self::Categories => "category",
            Self::Tags => "tag",
        }
    }
}

impl std::fmt::Display for TaxonomyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named category or tag as the store reports it.
///
/// Two organizers are the same taxonomy member when their names match; the
/// id and slug are carried along so write-backs reference real store terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organizer {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

// ---------------------------------------------------------------------------
// Recipes
// ---------------------------------------------------------------------------

/// Identifier the store uses to address a single recipe.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipeSlug(pub String);

impl std::fmt::Display for RecipeSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecipeSlug {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RecipeSlug {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The subset of a recipe's detail record that reconciliation reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Recipe {
    #[serde(default)]
    pub id: String,
    pub slug: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "recipeCategory", default)]
    pub categories: Vec<Organizer>,
    #[serde(default)]
    pub tags: Vec<Organizer>,
}

// ---------------------------------------------------------------------------
// Query assignments
// ---------------------------------------------------------------------------

/// How a query's matches contribute to an assignment's working set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QueryMode {
    /// Matches are kept for mutation.
    Add,
    /// Matches are dropped, overriding earlier `Add` matches.
    Remove,
    /// The query is disabled.
    Skip,
    /// Any other mode string, preserved for diagnostics.
    Unknown(String),
}

impl QueryMode {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Skip => "skip",
            Self::Unknown(other) => other,
        }
    }
}

impl From<String> for QueryMode {
    fn from(s: String) -> Self {
        match s.as_str() {
            "add" => Self::Add,
            "remove" => Self::Remove,
            "skip" => Self::Skip,
            _ => Self::Unknown(s),
        }
    }
}

impl From<QueryMode> for String {
    fn from(mode: QueryMode) -> Self {
        mode.as_str().to_string()
    }
}

impl std::fmt::Display for QueryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One filter query of an assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Store filter parameters, e.g. `queryFilter = "lastMade IS NOT NULL"`.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    pub mode: QueryMode,
}

/// Names to add to and remove from one taxonomy of each matched recipe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermActions {
    #[serde(default)]
    pub set: Vec<String>,
    #[serde(default)]
    pub unset: Vec<String>,
}

/// A declarative rule: filter queries plus the category/tag changes to apply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    #[serde(default)]
    pub queries: Vec<Query>,
    #[serde(default)]
    pub categories: TermActions,
    #[serde(default)]
    pub tags: TermActions,
}

impl Assignment {
    /// The actions configured for one taxonomy.
    pub fn actions(&self, kind: TaxonomyKind) -> &TermActions {
        match kind {
            TaxonomyKind::Categories => &self.categories,
            TaxonomyKind::Tags => &self.tags,
        }
    }
}

/// The `[query_assignments]` block: schedule plus the rule list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryAssignments {
    /// Target seconds between the starts of two cycles.
    #[serde(default, alias = "repeat-secs")]
    pub repeat_secs: u64,
    /// Deadline in seconds applied to every single store call.
    #[serde(default, alias = "timeout-secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
}
