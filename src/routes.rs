use crate::model::{Greeting, ShortUrlCreated, ShortUrlError, ShortUrlForm};
use crate::shortener::{ShortenError, Shortener};
use crate::utils::{internal_error, with_timeout};
use crate::validation::parse_url;
use axum::extract::rejection::FormRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

const DEFAULT_TIMEOUT: u64 = 300;

pub fn create_router(shortener: Arc<Shortener>) -> Router {
    Router::new()
        .route("/api/shorturl", post(create_short_url))
        .route("/api/shorturl/:short_url", get(redirect))
        .route("/api/hello", get(hello))
        .route("/health", get(health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(CompressionLayer::new()),
        )
        .with_state(shortener)
}

pub async fn create_short_url(
    State(shortener): State<Arc<Shortener>>,
    form: Result<Form<ShortUrlForm>, FormRejection>,
) -> Response {
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => return internal_error(rejection).into_response(),
    };

    match shortener.shorten(&form.url).await {
        Ok(record) => Json(ShortUrlCreated::from(record)).into_response(),
        Err(ShortenError::InvalidUrl(err)) => {
            tracing::warn!("Rejected url: {}", err);
            Json(ShortUrlError::invalid_url(&form.url)).into_response()
        }
        Err(ShortenError::TokenExhaustion(_)) => {
            Json(ShortUrlError::message(ShortUrlError::GENERATION_FAILED)).into_response()
        }
        Err(err @ (ShortenError::Storage(_) | ShortenError::ExpiryOverflow(_))) => {
            tracing::error!("Saving short url failed: {}", err);
            Json(ShortUrlError::message(ShortUrlError::SAVE_FAILED)).into_response()
        }
    }
}

pub async fn redirect(
    State(shortener): State<Arc<Shortener>>,
    Path(short_url): Path<String>,
) -> Result<Response, (StatusCode, String)> {
    let record = with_timeout(DEFAULT_TIMEOUT, shortener.lookup(&short_url))
        .await?
        .map_err(internal_error)?;

    let Some(record) = record else {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(ShortUrlError::message(ShortUrlError::NOT_FOUND)),
        )
            .into_response());
    };

    let location = parse_url(&record.original_url).map_err(internal_error)?.url;
    Ok(Redirect::temporary(location.as_str()).into_response())
}

pub async fn hello() -> Json<Greeting> {
    Json(Greeting {
        greeting: "hello API",
    })
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
