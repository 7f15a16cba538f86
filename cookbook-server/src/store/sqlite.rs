use anyhow::Result;
use cookbook::basic_models;

use super::{RecipeChange, RecipeQuery, RecipeStore};
use crate::database::Database;
use crate::models::{Category, Recipe, User};

impl RecipeStore for Database {
    fn find_recipes(&self, query: &RecipeQuery) -> Result<Vec<Recipe>> {
        Recipe::find(self, query)
    }

    fn category(&self, category_id: i64) -> Result<Option<Category>> {
        Category::get_by_id(self, category_id)
    }

    fn list_categories(&self) -> Result<Vec<Category>> {
        Category::list_all(self)
    }

    fn create_category(&self, upload: &basic_models::CategoryForUpload) -> Result<Category> {
        Category::push(self, upload)
    }

    fn rename_category(&self, category_id: i64, name: &str) -> Result<bool> {
        Category::rename(self, category_id, name)
    }

    fn delete_category(&self, category_id: i64) -> Result<bool> {
        Category::delete(self, category_id)
    }

    fn user(&self, user_id: i64) -> Result<Option<User>> {
        User::get_by_id(self, user_id)
    }

    fn create_user(&self, upload: &basic_models::UserForUpload) -> Result<User> {
        User::push(self, upload)
    }

    fn delete_user(&self, user_id: i64) -> Result<bool> {
        User::delete(self, user_id)
    }

    fn create_recipe(&self, upload: basic_models::RecipeForUpload) -> Result<Recipe> {
        Recipe::push(self, upload)
    }

    fn update_recipe(&self, recipe_id: i64, change: &RecipeChange) -> Result<bool> {
        Recipe::update(self, recipe_id, change)
    }

    fn delete_recipe(&self, recipe_id: i64) -> Result<bool> {
        Recipe::delete(self, recipe_id)
    }
}
