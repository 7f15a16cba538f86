//! Public read paths: what visitors are allowed to see.
//!
//! Every lookup here starts from [`RecipeQuery::published`], so a draft never leaves the
//! store through this module. Lookups that name something (a category, a recipe) fail
//! with [`CatalogError::NotFound`] when nothing visible matches, without telling apart
//! "does not exist" and "exists but is not published".

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::models::{Category, Recipe, User};
use crate::store::{RecipeQuery, RecipeStore};

pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("Not found")]
    NotFound,
    #[error("Store error: {0:#}")]
    Store(#[from] anyhow::Error),
}

/// A recipe with its weak references resolved, ready for a template.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct RecipeView {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub category: Option<Category>,
    pub author: Option<User>,
}

#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn RecipeStore>,
}

impl Catalog {
    pub fn new(store: Arc<dyn RecipeStore>) -> Self {
        Self { store }
    }

    /// Published recipes, newest first. Empty is a valid answer.
    pub fn list_published(&self) -> CatalogResult<Vec<Recipe>> {
        Ok(self.store.find_recipes(&RecipeQuery::published())?)
    }

    /// Published recipes of one category, newest first.
    ///
    /// A category with no published recipes is reported the same as an unknown one.
    pub fn by_category(&self, category_id: i64) -> CatalogResult<Vec<Recipe>> {
        let recipes = self
            .store
            .find_recipes(&RecipeQuery::published().in_category(category_id))?;
        if recipes.is_empty() {
            return Err(CatalogError::NotFound);
        }
        Ok(recipes)
    }

    /// One published recipe.
    pub fn by_id(&self, recipe_id: i64) -> CatalogResult<Recipe> {
        self.store
            .find_recipes(&RecipeQuery::published().with_id(recipe_id))?
            .pop()
            .ok_or(CatalogError::NotFound)
    }

    pub fn category(&self, category_id: i64) -> CatalogResult<Option<Category>> {
        Ok(self.store.category(category_id)?)
    }

    /// Resolve the category and author of each recipe, looking each id up once.
    pub fn present(&self, recipes: Vec<Recipe>) -> CatalogResult<Vec<RecipeView>> {
        let mut categories: HashMap<i64, Option<Category>> = HashMap::new();
        let mut authors: HashMap<i64, Option<User>> = HashMap::new();
        let mut views = Vec::with_capacity(recipes.len());
        for recipe in recipes {
            let category = match recipe.category_id {
                Some(id) => match categories.get(&id) {
                    Some(found) => found.clone(),
                    None => {
                        let found = self.store.category(id)?;
                        categories.insert(id, found.clone());
                        found
                    }
                },
                None => None,
            };
            let author = match recipe.author_id {
                Some(id) => match authors.get(&id) {
                    Some(found) => found.clone(),
                    None => {
                        let found = self.store.user(id)?;
                        authors.insert(id, found.clone());
                        found
                    }
                },
                None => None,
            };
            views.push(RecipeView {
                recipe,
                category,
                author,
            });
        }
        Ok(views)
    }

    pub fn present_one(&self, recipe: Recipe) -> CatalogResult<RecipeView> {
        self.present(vec![recipe])?
            .pop()
            .ok_or(CatalogError::NotFound)
    }
}
