//! Route handlers.

use super::AppState;
use super::error::ErrorBody;
use super::params::{QueryParams, WordPath};
use crate::models::ResultRow;
use crate::services::{ArithmeticOptions, DistanceOptions, NeighbourOptions};
use crate::{Error, Result};
use axum::Json;
use axum::extract::{OriginalUri, State};
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use serde_json::{Value, json};

/// `GET /embedding/{word}`
pub async fn embedding(
    State(state): State<AppState>,
    WordPath(word): WordPath,
) -> Result<Json<Vec<f32>>> {
    state.service.get_embedding(&word).await.map(Json)
}

/// `GET /neighbours/{word}?n=&metric=`
pub async fn neighbours(
    State(state): State<AppState>,
    WordPath(word): WordPath,
    params: QueryParams,
) -> Result<Json<Vec<ResultRow>>> {
    let options = NeighbourOptions {
        n: params.count("n")?,
        metric: params.metric()?,
    };
    state
        .service
        .nearest_neighbours(&word, options)
        .await
        .map(Json)
}

/// `GET /distances/{word}?words=&metric=&similarity=&excludeSelf=`
pub async fn distances(
    State(state): State<AppState>,
    WordPath(word): WordPath,
    params: QueryParams,
) -> Result<Json<Vec<ResultRow>>> {
    if !params.contains("words") {
        return Err(Error::InvalidInput("words is required".to_string()));
    }
    let targets = params.list("words");
    let options = DistanceOptions {
        metric: params.metric()?,
        similarity: params.flag("similarity")?,
        exclude_self: params.flag("excludeSelf")?,
    };
    state
        .service
        .distances_to_words(&word, &targets, options)
        .await
        .map(Json)
}

/// `GET /results?add=&sub=&limit=&metric=&includeDistance=`
pub async fn results(
    State(state): State<AppState>,
    params: QueryParams,
) -> Result<Json<Vec<ResultRow>>> {
    let options = ArithmeticOptions {
        limit: params.count("limit")?,
        metric: params.metric()?,
        include_distance: params.flag("includeDistance")?.unwrap_or(false),
    };
    state
        .service
        .vector_arithmetic(&params.list("add"), &params.list("sub"), options)
        .await
        .map(Json)
}

/// `GET /vector?add=&sub=`
pub async fn vector(
    State(state): State<AppState>,
    params: QueryParams,
) -> Result<Json<Vec<f32>>> {
    state
        .service
        .query_vector(&params.list("add"), &params.list("sub"))
        .await
        .map(Json)
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Result<Json<Value>> {
    state.service.health().await?;
    Ok(Json(json!({ "status": "ok" })))
}

/// Fallback for unknown routes.
pub async fn not_found(method: Method, OriginalUri(uri): OriginalUri) -> impl IntoResponse {
    let status = StatusCode::NOT_FOUND;
    (
        status,
        Json(ErrorBody::new(status, format!("Cannot {method} {}", uri.path()))),
    )
}
