use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, ensure, Result};
use cookbook::basic_models;

use super::{RecipeChange, RecipeQuery, RecipeStore};
use crate::models::{sqlite_current_timestamp, Category, Recipe, User};

/// A store that lives and dies with the process. Ids are never reused, like the
/// AUTOINCREMENT keys of the sqlite schema.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    categories: BTreeMap<i64, Category>,
    users: BTreeMap<i64, User>,
    recipes: BTreeMap<i64, Recipe>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| anyhow!("In-memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| anyhow!("In-memory store lock poisoned"))
    }
}

impl RecipeStore for InMemoryStore {
    fn find_recipes(&self, query: &RecipeQuery) -> Result<Vec<Recipe>> {
        Ok(self
            .read()?
            .recipes
            .values()
            .rev()
            .filter(|recipe| query.matches(recipe))
            .cloned()
            .collect())
    }

    fn category(&self, category_id: i64) -> Result<Option<Category>> {
        Ok(self.read()?.categories.get(&category_id).cloned())
    }

    fn list_categories(&self) -> Result<Vec<Category>> {
        let mut categories: Vec<_> = self.read()?.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name).then(a.category_id.cmp(&b.category_id)));
        Ok(categories)
    }

    fn create_category(&self, upload: &basic_models::CategoryForUpload) -> Result<Category> {
        Category::validate(upload)?;
        let mut tables = self.write()?;
        let category = Category {
            category_id: tables.next_id(),
            name: upload.name.clone(),
        };
        tables
            .categories
            .insert(category.category_id, category.clone());
        Ok(category)
    }

    fn rename_category(&self, category_id: i64, name: &str) -> Result<bool> {
        Category::validate(&basic_models::CategoryForUpload { name: name.into() })?;
        Ok(match self.write()?.categories.get_mut(&category_id) {
            Some(category) => {
                category.name = name.into();
                true
            }
            None => false,
        })
    }

    fn delete_category(&self, category_id: i64) -> Result<bool> {
        let mut tables = self.write()?;
        if tables.categories.remove(&category_id).is_none() {
            return Ok(false);
        }
        for recipe in tables.recipes.values_mut() {
            if recipe.category_id == Some(category_id) {
                recipe.category_id = None;
            }
        }
        Ok(true)
    }

    fn user(&self, user_id: i64) -> Result<Option<User>> {
        Ok(self.read()?.users.get(&user_id).cloned())
    }

    fn create_user(&self, upload: &basic_models::UserForUpload) -> Result<User> {
        User::validate(upload)?;
        let mut tables = self.write()?;
        ensure!(
            tables.users.values().all(|u| u.username != upload.username),
            "Username {} is taken",
            upload.username
        );
        let user = User {
            user_id: tables.next_id(),
            username: upload.username.clone(),
            first_name: upload.first_name.clone(),
            last_name: upload.last_name.clone(),
        };
        tables.users.insert(user.user_id, user.clone());
        Ok(user)
    }

    fn delete_user(&self, user_id: i64) -> Result<bool> {
        let mut tables = self.write()?;
        if tables.users.remove(&user_id).is_none() {
            return Ok(false);
        }
        for recipe in tables.recipes.values_mut() {
            if recipe.author_id == Some(user_id) {
                recipe.author_id = None;
            }
        }
        Ok(true)
    }

    fn create_recipe(&self, upload: basic_models::RecipeForUpload) -> Result<Recipe> {
        let mut tables = self.write()?;
        if let Some(category_id) = upload.category_id {
            ensure!(
                tables.categories.contains_key(&category_id),
                "Category {} does not exist",
                category_id
            );
        }
        if let Some(author_id) = upload.author_id {
            ensure!(
                tables.users.contains_key(&author_id),
                "User {} does not exist",
                author_id
            );
        }
        let mut recipe = Recipe::from_upload(0, upload)?;
        recipe.recipe_id = tables.next_id();
        tables.recipes.insert(recipe.recipe_id, recipe.clone());
        Ok(recipe)
    }

    fn update_recipe(&self, recipe_id: i64, change: &RecipeChange) -> Result<bool> {
        let mut tables = self.write()?;
        if let RecipeChange::Category(Some(category_id)) = change {
            ensure!(
                tables.categories.contains_key(category_id),
                "Category {} does not exist",
                category_id
            );
        }
        let Some(recipe) = tables.recipes.get_mut(&recipe_id) else {
            return Ok(false);
        };
        match change {
            RecipeChange::Published(is_published) => recipe.is_published = *is_published,
            RecipeChange::Cover(cover) => recipe.cover = cover.clone(),
            RecipeChange::Category(category_id) => recipe.category_id = *category_id,
        }
        recipe.updated_at = sqlite_current_timestamp();
        Ok(true)
    }

    fn delete_recipe(&self, recipe_id: i64) -> Result<bool> {
        Ok(self.write()?.recipes.remove(&recipe_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(title: &str, is_published: bool, category_id: Option<i64>) -> basic_models::RecipeForUpload {
        basic_models::RecipeForUpload {
            title: title.into(),
            description: String::new(),
            slug: String::new(),
            preparation_time: 20,
            preparation_time_unit: "Minutos".into(),
            servings: 2,
            servings_unit: "Pessoas".into(),
            preparation_steps: "Cozinhe.".into(),
            preparation_steps_is_html: false,
            is_published,
            cover: None,
            category_id,
            author_id: None,
        }
    }

    #[test]
    fn ids_are_never_reused() {
        let store = InMemoryStore::new();
        let first = store.create_recipe(upload("Bolo", true, None)).unwrap();
        assert!(store.delete_recipe(first.recipe_id).unwrap());
        let second = store.create_recipe(upload("Torta", true, None)).unwrap();
        assert!(second.recipe_id > first.recipe_id);
    }

    #[test]
    fn results_come_back_newest_first() {
        let store = InMemoryStore::new();
        for title in ["Arroz", "Feijão", "Farofa"] {
            store.create_recipe(upload(title, true, None)).unwrap();
        }
        let titles: Vec<_> = store
            .find_recipes(&RecipeQuery::published())
            .unwrap()
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(titles, vec!["Farofa", "Feijão", "Arroz"]);
    }

    #[test]
    fn deleting_a_category_nulls_the_reference() {
        let store = InMemoryStore::new();
        let doces = store
            .create_category(&basic_models::CategoryForUpload { name: "Doces".into() })
            .unwrap();
        let bolo = store
            .create_recipe(upload("Bolo", true, Some(doces.category_id)))
            .unwrap();
        assert!(store.delete_category(doces.category_id).unwrap());
        assert!(!store.delete_category(doces.category_id).unwrap());
        let found = store
            .find_recipes(&RecipeQuery::everything().with_id(bolo.recipe_id))
            .unwrap();
        assert_eq!(found[0].category_id, None);
    }

    #[test]
    fn unknown_references_are_rejected() {
        let store = InMemoryStore::new();
        assert!(store.create_recipe(upload("Bolo", true, Some(3))).is_err());
        let bolo = store.create_recipe(upload("Bolo", true, None)).unwrap();
        assert!(store
            .update_recipe(bolo.recipe_id, &RecipeChange::Category(Some(3)))
            .is_err());
    }

    #[test]
    fn every_change_refreshes_updated_at() {
        let store = InMemoryStore::new();
        let doces = store
            .create_category(&basic_models::CategoryForUpload { name: "Doces".into() })
            .unwrap();
        let bolo = store.create_recipe(upload("Bolo", false, None)).unwrap();
        let long_ago = "2000-01-01 00:00:00";
        for change in [
            RecipeChange::Published(true),
            RecipeChange::Cover(None),
            RecipeChange::Category(Some(doces.category_id)),
        ] {
            store
                .write()
                .unwrap()
                .recipes
                .get_mut(&bolo.recipe_id)
                .unwrap()
                .updated_at = long_ago.into();
            assert!(store.update_recipe(bolo.recipe_id, &change).unwrap());
            let updated = store
                .find_recipes(&RecipeQuery::everything().with_id(bolo.recipe_id))
                .unwrap()
                .pop()
                .unwrap();
            assert!(updated.updated_at.as_str() > long_ago, "{:?}", change);
            assert_eq!(updated.created_at, bolo.created_at);
        }
    }

    #[test]
    fn usernames_are_unique() {
        let store = InMemoryStore::new();
        let elias = basic_models::UserForUpload {
            username: "elias".into(),
            first_name: String::new(),
            last_name: String::new(),
        };
        store.create_user(&elias).unwrap();
        assert!(store.create_user(&elias).is_err());
    }
}
