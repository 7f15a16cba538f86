use std::path::{Path, PathBuf};

use anyhow::{bail, ensure, Context, Result};
use clap::{Parser, Subcommand};
use cookbook::basic_models;
use cookbook_server::{
    config::Config,
    database::Database,
    models::Recipe,
    storage::MediaStorage,
    store::{RecipeChange, RecipeQuery, RecipeStore},
};

/// Manage the categories, authors and recipes of the cookbook
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// Path to the YAML configuration file
    #[arg(long, default_value = "config.yml")]
    config: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage categories
    #[command(subcommand)]
    Category(CategoryCommand),
    /// Manage authors
    #[command(subcommand)]
    User(UserCommand),
    /// Manage recipes
    #[command(subcommand)]
    Recipe(RecipeCommand),
}

#[derive(Subcommand, Debug)]
enum CategoryCommand {
    /// List every category
    List,
    /// Add a category
    Add { name: String },
    /// Rename a category
    Rename { category_id: i64, name: String },
    /// Delete a category. Its recipes are kept, without a category.
    Delete { category_id: i64 },
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    /// Add an author
    Add {
        username: String,
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
    },
    /// Delete an author. Their recipes are kept, without an author.
    Delete { user_id: i64 },
}

#[derive(Subcommand, Debug)]
enum RecipeCommand {
    /// List every recipe, including unpublished ones
    List,
    /// Add a recipe from a YAML or JSON file
    Add {
        file: PathBuf,
        /// Cover image to upload alongside the recipe
        #[arg(long)]
        cover: Option<PathBuf>,
    },
    /// Make a recipe visible on the site
    Publish { recipe_id: i64 },
    /// Hide a recipe from the site
    Unpublish { recipe_id: i64 },
    /// Move a recipe into a category, or out of any with no `--category`
    SetCategory {
        recipe_id: i64,
        #[arg(long)]
        category: Option<i64>,
    },
    /// Replace the cover image of a recipe
    SetCover { recipe_id: i64, image: PathBuf },
    /// Delete a recipe
    Delete { recipe_id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let config = Config::load(&args.config).context("Loading configuration")?;
    let db = Database::connect(&config.database.path)
        .await
        .context("Connecting to database")?;
    let media = MediaStorage::new(config.media.root.clone());

    match args.command {
        Command::Category(command) => run_category(&db, command),
        Command::User(command) => run_user(&db, command),
        Command::Recipe(command) => run_recipe(&db, &media, command),
    }
}

fn run_category(store: &dyn RecipeStore, command: CategoryCommand) -> Result<()> {
    match command {
        CategoryCommand::List => {
            for category in store.list_categories()? {
                println!("{}\t{}", category.category_id, category.name);
            }
        }
        CategoryCommand::Add { name } => {
            let category = store.create_category(&basic_models::CategoryForUpload { name })?;
            println!("Added category {}", category.category_id);
        }
        CategoryCommand::Rename { category_id, name } => {
            ensure!(
                store.rename_category(category_id, &name)?,
                "No category {}",
                category_id
            );
        }
        CategoryCommand::Delete { category_id } => {
            ensure!(
                store.delete_category(category_id)?,
                "No category {}",
                category_id
            );
        }
    }
    Ok(())
}

fn run_user(store: &dyn RecipeStore, command: UserCommand) -> Result<()> {
    match command {
        UserCommand::Add {
            username,
            first_name,
            last_name,
        } => {
            let user = store.create_user(&basic_models::UserForUpload {
                username,
                first_name,
                last_name,
            })?;
            println!("Added user {}", user.user_id);
        }
        UserCommand::Delete { user_id } => {
            ensure!(store.delete_user(user_id)?, "No user {}", user_id);
        }
    }
    Ok(())
}

fn run_recipe(store: &dyn RecipeStore, media: &MediaStorage, command: RecipeCommand) -> Result<()> {
    let (recipe_id, change) = match command {
        RecipeCommand::List => {
            for recipe in store.find_recipes(&RecipeQuery::everything())? {
                println!(
                    "{}\t{}\t{}",
                    recipe.recipe_id,
                    if recipe.is_published { "published" } else { "draft" },
                    recipe.title
                );
            }
            return Ok(());
        }
        RecipeCommand::Add { file, cover } => {
            let upload = read_recipe_file(&file)?;
            let recipe = add_recipe(store, media, upload, cover.as_deref())?;
            println!("Added recipe {} ({})", recipe.recipe_id, recipe.slug);
            return Ok(());
        }
        RecipeCommand::SetCover { recipe_id, image } => {
            return set_cover(store, media, recipe_id, &image);
        }
        RecipeCommand::Delete { recipe_id } => {
            ensure!(store.delete_recipe(recipe_id)?, "No recipe {}", recipe_id);
            return Ok(());
        }
        RecipeCommand::Publish { recipe_id } => (recipe_id, RecipeChange::Published(true)),
        RecipeCommand::Unpublish { recipe_id } => (recipe_id, RecipeChange::Published(false)),
        RecipeCommand::SetCategory {
            recipe_id,
            category,
        } => (recipe_id, RecipeChange::Category(category)),
    };
    ensure!(
        store.update_recipe(recipe_id, &change)?,
        "No recipe {}",
        recipe_id
    );
    Ok(())
}

/// Store a recipe and its cover. The cover is only written once the upload is known to be
/// valid, and removed again if the store refuses the recipe.
fn add_recipe(
    store: &dyn RecipeStore,
    media: &MediaStorage,
    mut upload: basic_models::RecipeForUpload,
    cover: Option<&Path>,
) -> Result<Recipe> {
    Recipe::validate(&upload)?;
    let stored_cover = match cover {
        Some(cover) => Some(store_cover(media, cover)?),
        None => None,
    };
    if stored_cover.is_some() {
        upload.cover = stored_cover.clone();
    }
    tracing::debug!("Uploading {:?}", upload);
    match store.create_recipe(upload) {
        Ok(recipe) => Ok(recipe),
        Err(e) => {
            if let Some(rel_path) = stored_cover {
                media.remove(&rel_path)?;
            }
            Err(e)
        }
    }
}

/// Replace the cover of a recipe, deleting the file it used before
fn set_cover(
    store: &dyn RecipeStore,
    media: &MediaStorage,
    recipe_id: i64,
    image: &Path,
) -> Result<()> {
    let Some(recipe) = store
        .find_recipes(&RecipeQuery::everything().with_id(recipe_id))?
        .pop()
    else {
        bail!("No recipe {}", recipe_id);
    };
    let cover = store_cover(media, image)?;
    let updated = store.update_recipe(recipe_id, &RecipeChange::Cover(Some(cover.clone())));
    if !matches!(updated, Ok(true)) {
        media.remove(&cover)?;
        ensure!(updated?, "No recipe {}", recipe_id);
    }
    if let Some(old) = recipe.cover.filter(|old| *old != cover) {
        media.remove(&old)?;
    }
    Ok(())
}

/// Parse a recipe upload, as JSON when the extension says so and YAML otherwise
fn read_recipe_file(path: &Path) -> Result<basic_models::RecipeForUpload> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Reading recipe file {}", path.display()))?;
    let upload = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&text)?,
        _ => serde_yaml::from_str(&text)?,
    };
    Ok(upload)
}

fn store_cover(media: &MediaStorage, image: &Path) -> Result<String> {
    let Some(file_name) = image.file_name().and_then(|name| name.to_str()) else {
        bail!("Cover path {} has no file name", image.display());
    };
    let content =
        std::fs::read(image).with_context(|| format!("Reading cover {}", image.display()))?;
    media.store_cover(file_name, &content, chrono::Local::now().date_naive())
}
