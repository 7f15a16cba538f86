use crate::database::{Database, FromRow};
use crate::store::{RecipeChange, RecipeQuery};
use anyhow::{ensure, Result};
use cookbook::basic_models;
use rusqlite::params;
use serde::{Deserialize, Serialize};

pub const MAX_TITLE_LEN: usize = 65;
pub const MAX_DESCRIPTION_LEN: usize = 165;
pub const MAX_UNIT_LEN: usize = 65;
pub const MAX_CATEGORY_NAME_LEN: usize = 65;
pub const MAX_USERNAME_LEN: usize = 150;

pub fn sqlite_current_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

lazy_static::lazy_static! {
    static ref NOT_SLUG_CHARS: regex::Regex = regex::Regex::new(r"[^a-z0-9]+").expect("valid regex");
    static ref SLUG: regex::Regex = regex::Regex::new(r"^[-a-zA-Z0-9_]+$").expect("valid regex");
}

/// Turn a title into a URL-safe identifier: accents are transliterated, then lowercase
/// ascii alphanumerics are joined by dashes.
pub fn slugify(title: &str) -> String {
    let lowered = deunicode::deunicode(title).to_lowercase();
    NOT_SLUG_CHARS
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Category {
    pub category_id: i64,
    pub name: String,
}

impl FromRow for Category {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            category_id: row.get("category_id")?,
            name: row.get("name")?,
        })
    }
}

impl Category {
    pub fn validate(upload: &basic_models::CategoryForUpload) -> Result<()> {
        ensure!(!upload.name.trim().is_empty(), "Category name is empty");
        ensure!(
            upload.name.chars().count() <= MAX_CATEGORY_NAME_LEN,
            "Category name is longer than {} characters",
            MAX_CATEGORY_NAME_LEN
        );
        Ok(())
    }

    /// Get a category by ID
    pub fn get_by_id(db: &Database, category_id: i64) -> Result<Option<Self>> {
        Ok(db
            .collect_rows(
                "SELECT * FROM Category WHERE category_id = ?",
                params![category_id],
            )?
            .pop())
    }

    /// List every category, alphabetically
    pub fn list_all(db: &Database) -> Result<Vec<Self>> {
        db.collect_rows("SELECT * FROM Category ORDER BY name, category_id", params![])
    }

    /// Add a new category to the database
    pub fn push(db: &Database, upload: &basic_models::CategoryForUpload) -> Result<Self> {
        Self::validate(upload)?;
        let category_id = {
            let conn = db.pool.get()?;
            conn.execute("INSERT INTO Category (name) VALUES (?)", params![upload.name])?;
            conn.last_insert_rowid()
        };
        Ok(Self {
            category_id,
            name: upload.name.clone(),
        })
    }

    pub fn rename(db: &Database, category_id: i64, name: &str) -> Result<bool> {
        Self::validate(&basic_models::CategoryForUpload { name: name.into() })?;
        let touched = db.execute(
            "UPDATE Category SET name = ? WHERE category_id = ?",
            params![name, category_id],
        )?;
        Ok(touched > 0)
    }

    /// Delete a category. Recipes that pointed at it are kept, with no category.
    pub fn delete(db: &Database, category_id: i64) -> Result<bool> {
        let touched = db.execute(
            "DELETE FROM Category WHERE category_id = ?",
            params![category_id],
        )?;
        Ok(touched > 0)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl FromRow for User {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get("user_id")?,
            username: row.get("username")?,
            first_name: row.get("first_name")?,
            last_name: row.get("last_name")?,
        })
    }
}

impl User {
    pub fn validate(upload: &basic_models::UserForUpload) -> Result<()> {
        ensure!(!upload.username.trim().is_empty(), "Username is empty");
        ensure!(
            upload.username.chars().count() <= MAX_USERNAME_LEN,
            "Username is longer than {} characters",
            MAX_USERNAME_LEN
        );
        Ok(())
    }

    pub fn get_by_id(db: &Database, user_id: i64) -> Result<Option<Self>> {
        Ok(db
            .collect_rows("SELECT * FROM User WHERE user_id = ?", params![user_id])?
            .pop())
    }

    pub fn push(db: &Database, upload: &basic_models::UserForUpload) -> Result<Self> {
        Self::validate(upload)?;
        let user_id = {
            let conn = db.pool.get()?;
            conn.execute(
                "INSERT INTO User (username, first_name, last_name) VALUES (?, ?, ?)",
                params![upload.username, upload.first_name, upload.last_name],
            )?;
            conn.last_insert_rowid()
        };
        Ok(Self {
            user_id,
            username: upload.username.clone(),
            first_name: upload.first_name.clone(),
            last_name: upload.last_name.clone(),
        })
    }

    /// Delete a user. Their recipes are kept, with no author.
    pub fn delete(db: &Database, user_id: i64) -> Result<bool> {
        let touched = db.execute("DELETE FROM User WHERE user_id = ?", params![user_id])?;
        Ok(touched > 0)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Recipe {
    pub recipe_id: i64,
    pub title: String,
    pub description: String,
    pub slug: String,
    pub preparation_time: u32,
    pub preparation_time_unit: String,
    pub servings: u32,
    pub servings_unit: String,
    pub preparation_steps: String,
    pub preparation_steps_is_html: bool,
    pub created_at: String,
    pub updated_at: String,
    pub is_published: bool,
    pub cover: Option<String>,
    pub category_id: Option<i64>,
    pub author_id: Option<i64>,
}

impl FromRow for Recipe {
    /// Create a new recipe from an sql row, provided by rusqlite, using named columns.
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            recipe_id: row.get("recipe_id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            slug: row.get("slug")?,
            preparation_time: row.get("preparation_time")?,
            preparation_time_unit: row.get("preparation_time_unit")?,
            servings: row.get("servings")?,
            servings_unit: row.get("servings_unit")?,
            preparation_steps: row.get("preparation_steps")?,
            preparation_steps_is_html: row.get("preparation_steps_is_html")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            is_published: row.get("is_published")?,
            cover: row.get("cover")?,
            category_id: row.get("category_id")?,
            author_id: row.get("author_id")?,
        })
    }
}

impl Recipe {
    /// Build a recipe row from an upload. The caller assigns the id.
    pub fn from_upload(recipe_id: i64, mut upload: basic_models::RecipeForUpload) -> Result<Self> {
        Self::validate(&upload)?;
        if upload.slug.is_empty() {
            upload.slug = slugify(&upload.title);
        }
        let now = sqlite_current_timestamp();
        Ok(Self {
            recipe_id,
            title: upload.title,
            description: upload.description,
            slug: upload.slug,
            preparation_time: upload.preparation_time,
            preparation_time_unit: upload.preparation_time_unit,
            servings: upload.servings,
            servings_unit: upload.servings_unit,
            preparation_steps: upload.preparation_steps,
            preparation_steps_is_html: upload.preparation_steps_is_html,
            created_at: now.clone(),
            updated_at: now,
            is_published: upload.is_published,
            cover: upload.cover,
            category_id: upload.category_id,
            author_id: upload.author_id,
        })
    }

    /// Check the length limits of the display fields
    pub fn validate(upload: &basic_models::RecipeForUpload) -> Result<()> {
        let limits = [
            ("Title", &upload.title, MAX_TITLE_LEN),
            ("Description", &upload.description, MAX_DESCRIPTION_LEN),
            (
                "Preparation time unit",
                &upload.preparation_time_unit,
                MAX_UNIT_LEN,
            ),
            ("Servings unit", &upload.servings_unit, MAX_UNIT_LEN),
        ];
        for (field, value, max) in limits {
            ensure!(
                value.chars().count() <= max,
                "{} is longer than {} characters",
                field,
                max
            );
        }
        ensure!(!upload.title.trim().is_empty(), "Title is empty");
        ensure!(
            upload.slug.is_empty() || SLUG.is_match(&upload.slug),
            "Slug {:?} is not URL-safe",
            upload.slug
        );
        Ok(())
    }

    /// Find the recipes matching a query, newest first
    pub fn find(db: &Database, query: &RecipeQuery) -> Result<Vec<Recipe>> {
        let mut clauses = vec![];
        let mut values: Vec<i64> = vec![];
        if query.published_only {
            clauses.push("is_published = 1");
        }
        if let Some(category_id) = query.category_id {
            clauses.push("category_id = ?");
            values.push(category_id);
        }
        if let Some(recipe_id) = query.recipe_id {
            clauses.push("recipe_id = ?");
            values.push(recipe_id);
        }
        let filter = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        db.collect_rows(
            &format!("SELECT * FROM Recipe {} ORDER BY recipe_id DESC", filter),
            rusqlite::params_from_iter(values),
        )
    }

    /// Add a new recipe to the database
    pub fn push(db: &Database, upload: basic_models::RecipeForUpload) -> Result<Recipe> {
        if let Some(category_id) = upload.category_id {
            ensure!(
                Category::get_by_id(db, category_id)?.is_some(),
                "Category {} does not exist",
                category_id
            );
        }
        if let Some(author_id) = upload.author_id {
            ensure!(
                User::get_by_id(db, author_id)?.is_some(),
                "User {} does not exist",
                author_id
            );
        }
        let mut recipe = Self::from_upload(0, upload)?;
        // The connection goes back to the pool before anything else asks for one
        recipe.recipe_id = {
            let conn = db.pool.get()?;
            conn.execute(
                "INSERT INTO Recipe (
                    title, description, slug,
                    preparation_time, preparation_time_unit, servings, servings_unit,
                    preparation_steps, preparation_steps_is_html,
                    created_at, updated_at, is_published, cover, category_id, author_id
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    recipe.title,
                    recipe.description,
                    recipe.slug,
                    recipe.preparation_time,
                    recipe.preparation_time_unit,
                    recipe.servings,
                    recipe.servings_unit,
                    recipe.preparation_steps,
                    recipe.preparation_steps_is_html,
                    recipe.created_at,
                    recipe.updated_at,
                    recipe.is_published,
                    recipe.cover,
                    recipe.category_id,
                    recipe.author_id,
                ],
            )?;
            conn.last_insert_rowid()
        };
        Ok(recipe)
    }

    /// Apply a change to one recipe, refreshing its `updated_at`
    pub fn update(db: &Database, recipe_id: i64, change: &RecipeChange) -> Result<bool> {
        let now = sqlite_current_timestamp();
        let touched = match change {
            RecipeChange::Published(is_published) => db.execute(
                "UPDATE Recipe SET is_published = ?, updated_at = ? WHERE recipe_id = ?",
                params![is_published, now, recipe_id],
            )?,
            RecipeChange::Cover(cover) => db.execute(
                "UPDATE Recipe SET cover = ?, updated_at = ? WHERE recipe_id = ?",
                params![cover, now, recipe_id],
            )?,
            RecipeChange::Category(category_id) => {
                if let Some(category_id) = category_id {
                    ensure!(
                        Category::get_by_id(db, *category_id)?.is_some(),
                        "Category {} does not exist",
                        category_id
                    );
                }
                db.execute(
                    "UPDATE Recipe SET category_id = ?, updated_at = ? WHERE recipe_id = ?",
                    params![category_id, now, recipe_id],
                )?
            }
        };
        Ok(touched > 0)
    }

    pub fn delete(db: &Database, recipe_id: i64) -> Result<bool> {
        let touched = db.execute("DELETE FROM Recipe WHERE recipe_id = ?", params![recipe_id])?;
        Ok(touched > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(title: &str) -> basic_models::RecipeForUpload {
        basic_models::RecipeForUpload {
            title: title.into(),
            description: "Uma receita".into(),
            slug: String::new(),
            preparation_time: 30,
            preparation_time_unit: "Minutos".into(),
            servings: 4,
            servings_unit: "Porções".into(),
            preparation_steps: "Misture.".into(),
            preparation_steps_is_html: false,
            is_published: true,
            cover: None,
            category_id: None,
            author_id: None,
        }
    }

    #[test]
    fn slugify_keeps_ascii_words() {
        assert_eq!(slugify("Bolo de Cenoura"), "bolo-de-cenoura");
        assert_eq!(slugify("  Pão -- de   queijo!! "), "pao-de-queijo");
        assert_eq!(slugify("???"), "");
    }

    #[test]
    fn slugify_transliterates_accents() {
        assert_eq!(slugify("Pão de Queijo com Açúcar"), "pao-de-queijo-com-acucar");
        assert_eq!(slugify("Feijão à Moda"), "feijao-a-moda");
    }

    #[test]
    fn missing_slug_is_derived_from_title() {
        let recipe = Recipe::from_upload(1, upload("Torta de Frango")).unwrap();
        assert_eq!(recipe.slug, "torta-de-frango");
        assert_eq!(recipe.created_at, recipe.updated_at);
    }

    #[test]
    fn titles_over_the_limit_are_rejected() {
        let long = "x".repeat(MAX_TITLE_LEN + 1);
        assert!(Recipe::validate(&upload(&long)).is_err());
        let exact = "x".repeat(MAX_TITLE_LEN);
        assert!(Recipe::validate(&upload(&exact)).is_ok());
    }

    #[test]
    fn descriptions_over_the_limit_are_rejected() {
        let mut recipe = upload("Bolo");
        recipe.description = "d".repeat(MAX_DESCRIPTION_LEN + 1);
        assert!(Recipe::validate(&recipe).is_err());
    }

    #[test]
    fn unsafe_slugs_are_rejected() {
        let mut recipe = upload("Bolo");
        recipe.slug = "Bolo Fofo".into();
        assert!(Recipe::validate(&recipe).is_err());
        recipe.slug = "pão-fofo".into();
        assert!(Recipe::validate(&recipe).is_err());
        for slug in ["bolo-fofo", "bolo_fofo", "Bolo-Fofo"] {
            recipe.slug = slug.into();
            assert!(Recipe::validate(&recipe).is_ok(), "{}", slug);
        }
    }

    #[test]
    fn empty_category_names_are_rejected() {
        let upload = basic_models::CategoryForUpload { name: "  ".into() };
        assert!(Category::validate(&upload).is_err());
    }
}
