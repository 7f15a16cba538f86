use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use minijinja::context;

use crate::{
    catalog::Catalog,
    errors::{WebError, WebResult},
    storage::{content_type_for, MediaStorage},
    templates::TEMPLATES,
};

static STATIC_DIR: include_dir::Dir<'_> = include_dir::include_dir!("$CARGO_MANIFEST_DIR/static");

#[derive(Clone)]
pub struct AppState {
    pub catalog: Catalog,
    pub media: MediaStorage,
}

/// Build the public site
pub fn router(state: AppState) -> Router {
    Router::new()
        // `GET /` goes to `home`
        .route("/", get(home))
        // `GET /recipes/category/:category_id/` goes to `category`
        .route("/recipes/category/:category_id/", get(category))
        // `GET /recipes/:recipe_id/` goes to `recipe`
        .route("/recipes/:recipe_id/", get(recipe))
        // `GET /health` goes to `health`
        .route("/health", get(health))
        // serve the stylesheets baked into the binary
        .route("/static/*path", get(serve_static))
        // serve uploaded covers from the media root
        .route("/media/*path", get(serve_media))
        .fallback(not_found)
        .layer(
            tower_http::compression::CompressionLayer::new()
                .quality(tower_http::CompressionLevel::Fastest),
        )
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Ids in the URL are plain decimal digits; anything else does not name a page.
fn parse_id(raw: &str) -> WebResult<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(WebError::NotFound);
    }
    raw.parse().map_err(|_| WebError::NotFound)
}

/// Render the home page with every published recipe, newest first
async fn home(State(state): State<AppState>) -> WebResult<Html<String>> {
    let recipes = state.catalog.list_published()?;
    Ok(Html(TEMPLATES.get_template("pages/home.html.jinja")?.render(
        context! {
            recipes => state.catalog.present(recipes)?,
        },
    )?))
}

/// Render the published recipes of one category
async fn category(
    State(state): State<AppState>,
    Path(category_id): Path<String>,
) -> WebResult<Html<String>> {
    let category_id = parse_id(&category_id)?;
    let recipes = state.catalog.by_category(category_id)?;
    let title = match state.catalog.category(category_id)? {
        Some(category) => format!("{} - Category", category.name),
        None => "Category".into(),
    };
    Ok(Html(TEMPLATES.get_template("pages/category.html.jinja")?.render(
        context! {
            recipes => state.catalog.present(recipes)?,
            title => title,
        },
    )?))
}

async fn recipe(
    State(state): State<AppState>,
    Path(recipe_id): Path<String>,
) -> WebResult<Html<String>> {
    let recipe = state.catalog.by_id(parse_id(&recipe_id)?)?;
    Ok(Html(TEMPLATES.get_template("pages/recipe-view.html.jinja")?.render(
        context! {
            recipe => state.catalog.present_one(recipe)?,
            is_detail_page => true,
        },
    )?))
}

// Just reply that everything is okay
async fn health() -> StatusCode {
    StatusCode::OK
}

async fn not_found() -> WebError {
    WebError::NotFound
}

/// Serve static files from memory using `include_dir!`
async fn serve_static(Path(path): Path<String>) -> WebResult<impl IntoResponse> {
    let bytes = STATIC_DIR
        .get_file(&path)
        .ok_or(WebError::NotFound)?
        .contents();
    Ok(([(header::CONTENT_TYPE, content_type_for(&path))], bytes))
}

/// Serve an uploaded file from disk
async fn serve_media(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> WebResult<impl IntoResponse> {
    let file = state.media.resolve(&path).ok_or(WebError::NotFound)?;
    let is_file = tokio::fs::metadata(&file)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false);
    if !is_file {
        return Err(WebError::NotFound);
    }
    let bytes = tokio::fs::read(&file)
        .await
        .map_err(|e| anyhow::Error::from(e).context(format!("Reading {}", file.display())))?;
    Ok(([(header::CONTENT_TYPE, content_type_for(&path))], bytes))
}
