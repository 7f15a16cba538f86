//! The record store behind the catalog.
//!
//! Handlers never talk to SQLite directly; they hold an `Arc<dyn RecipeStore>` so the
//! in-memory store can stand in for the database in tests.

use anyhow::Result;
use cookbook::basic_models;

use crate::models::{Category, Recipe, User};

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryStore;

/// Which recipes to fetch. Results always come back newest first (descending id).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeQuery {
    /// Only recipes with `is_published` set
    pub published_only: bool,
    pub category_id: Option<i64>,
    pub recipe_id: Option<i64>,
}

impl RecipeQuery {
    /// The starting point of every public read path.
    pub fn published() -> Self {
        Self {
            published_only: true,
            ..Default::default()
        }
    }

    /// Every recipe, published or not. Only for operators.
    pub fn everything() -> Self {
        Self::default()
    }

    pub fn in_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_id(mut self, recipe_id: i64) -> Self {
        self.recipe_id = Some(recipe_id);
        self
    }

    /// Whether a recipe passes this query's filters
    pub fn matches(&self, recipe: &Recipe) -> bool {
        (!self.published_only || recipe.is_published)
            && self
                .category_id
                .map_or(true, |id| recipe.category_id == Some(id))
            && self.recipe_id.map_or(true, |id| recipe.recipe_id == id)
    }
}

/// A single mutation of an existing recipe. Every change refreshes `updated_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipeChange {
    Published(bool),
    Cover(Option<String>),
    Category(Option<i64>),
}

/// Persistent storage for categories, users and recipes.
///
/// Mutations of a missing row return `Ok(false)`: that is how a store reports NotFound
/// for writes, and callers turn it into their own not-found error. `Err` is kept for
/// failures of the store itself and for rejected input.
pub trait RecipeStore: Send + Sync {
    /// Recipes matching `query`, in descending id order.
    fn find_recipes(&self, query: &RecipeQuery) -> Result<Vec<Recipe>>;

    fn category(&self, category_id: i64) -> Result<Option<Category>>;

    fn list_categories(&self) -> Result<Vec<Category>>;

    fn create_category(&self, upload: &basic_models::CategoryForUpload) -> Result<Category>;

    fn rename_category(&self, category_id: i64, name: &str) -> Result<bool>;

    /// Remove a category. Recipes referencing it survive with no category.
    fn delete_category(&self, category_id: i64) -> Result<bool>;

    fn user(&self, user_id: i64) -> Result<Option<User>>;

    fn create_user(&self, upload: &basic_models::UserForUpload) -> Result<User>;

    /// Remove a user. Recipes they wrote survive with no author.
    fn delete_user(&self, user_id: i64) -> Result<bool>;

    /// Store a new recipe. Referenced category and author must exist.
    fn create_recipe(&self, upload: basic_models::RecipeForUpload) -> Result<Recipe>;

    fn update_recipe(&self, recipe_id: i64, change: &RecipeChange) -> Result<bool>;

    fn delete_recipe(&self, recipe_id: i64) -> Result<bool>;
}
