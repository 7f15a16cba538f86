use axum::{
    http,
    response::{IntoResponse, Response},
};

use crate::catalog::CatalogError;

pub type WebResult<T> = std::result::Result<T, WebError>;

#[derive(thiserror::Error, Debug)]
pub enum WebError {
    #[error("Internal Server Error: {0}")]
    Internal(#[from] anyhow::Error),
    #[error("Templating error: {0:#}")]
    Template(#[from] minijinja::Error),
    #[error("Not found")]
    NotFound,
}

impl From<CatalogError> for WebError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::NotFound => WebError::NotFound,
            CatalogError::Store(e) => WebError::Internal(e),
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        // In development, we want to return the error message
        // In production, we want to return a generic error message
        let display = if cfg!(debug_assertions) {
            self.to_string()
        } else {
            "Internal Server Error".into()
        };
        match self {
            WebError::Internal(ref err) => {
                tracing::error!("Request failed: {:#}", err);
                (http::StatusCode::INTERNAL_SERVER_ERROR, display).into_response()
            }
            WebError::Template(ref err) => {
                tracing::error!("Rendering failed: {:#}", err);
                (http::StatusCode::INTERNAL_SERVER_ERROR, display).into_response()
            }
            WebError::NotFound => (http::StatusCode::NOT_FOUND, "Not Found").into_response(),
        }
    }
}
