use crate::api::service::fetch_or_crawl;
use crate::api::AppState;
use crate::config::validate_profile_name;
use crate::HarvestError;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use std::sync::Arc;

const MAX_COUNT: i64 = 1000;

#[derive(Debug, Deserialize)]
pub struct DataQuery {
    pub username: String,
    pub count: i64,
}

fn detail(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({ "detail": message.into() })),
    )
        .into_response()
}

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timestamp = chrono::Utc::now().to_rfc3339();

    // An empty lookup still has to parse the collection
    match state.store.find("", 0).await {
        Ok(_) => Json(serde_json::json!({
            "status": "healthy",
            "timestamp": timestamp,
        })),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            Json(serde_json::json!({
                "status": "unhealthy",
                "error": e.to_string(),
                "timestamp": timestamp,
            }))
        }
    }
}

pub async fn get_data(
    State(state): State<Arc<AppState>>,
    query: Result<Query<DataQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => {
            return detail(StatusCode::UNPROCESSABLE_ENTITY, rejection.body_text());
        }
    };

    if let Err(e) = validate_profile_name(&query.username) {
        return detail(StatusCode::UNPROCESSABLE_ENTITY, e.to_string());
    }
    if !(1..=MAX_COUNT).contains(&query.count) {
        return detail(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("count must be between 1 and {}", MAX_COUNT),
        );
    }

    tracing::info!(
        "Fetching data for username: {}, count: {}",
        query.username,
        query.count
    );

    match fetch_or_crawl(&state, &query.username, query.count as usize).await {
        Ok(posts) => Json(posts).into_response(),
        Err(e @ HarvestError::EmptyCrawl(_)) => {
            tracing::warn!("{}", e);
            detail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        Err(e) => {
            tracing::error!("Error in getData: {}", e);
            detail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
