//! Shared types, error model, store seam, and configuration for mealiesync.
//!
//! This crate is the foundation depended on by all other mealiesync crates.
//! It provides:
//! - [`MealieSyncError`]: the unified error type
//! - Domain types ([`Organizer`], [`Recipe`], [`Assignment`], [`Query`])
//! - The [`RecipeStore`] trait the engine talks to
//! - Configuration ([`AppConfig`], [`ReconcileConfig`], config loading)

pub mod config;
pub mod error;
pub mod store;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    ASSIGNMENTS_ENV, AppConfig, MealieConfig, ReconcileConfig, apply_assignments_override,
    config_dir, config_file_path, init_config, load_config, load_config_from, resolve_token,
    token_from_value, validate_config,
};
pub use error::{MealieSyncError, Result};
pub use store::RecipeStore;
pub use types::{
    Assignment, Organizer, Query, QueryAssignments, QueryMode, Recipe, RecipeSlug, TaxonomyKind,
    TermActions,
};
