use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use harvest_core::{ContentQuery, ContentRecord, ContentType, Error};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::AppState;

/// Largest page the API hands out in one response.
pub const MAX_LIMIT: usize = 100;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        tracing::error!(error = %e, "storage request failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ContentParams {
    #[serde(rename = "type")]
    pub content_type: Option<String>,
    pub tag: Option<String>,
    pub limit: Option<usize>,
}

impl ContentParams {
    fn into_query(self) -> Result<ContentQuery, ApiError> {
        let mut query = ContentQuery::new();
        if let Some(raw) = self.content_type.filter(|t| !t.trim().is_empty()) {
            let content_type = raw
                .parse::<ContentType>()
                .map_err(|_| ApiError::bad_request(format!("unknown content type: {}", raw)))?;
            query = query.with_type(content_type);
        }
        if let Some(tag) = self.tag.filter(|t| !t.is_empty()) {
            query = query.with_tag(tag);
        }
        if let Some(limit) = self.limit {
            query = query.with_limit(limit.min(MAX_LIMIT));
        }
        Ok(query)
    }
}

pub async fn list_content(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ContentParams>,
) -> Result<Json<Vec<ContentRecord>>, ApiError> {
    let query = params.into_query()?;
    let records = state.storage.query(&query).await?;
    Ok(Json(records))
}

#[derive(Debug, Deserialize)]
pub struct LinkParams {
    pub link: String,
}

pub async fn get_by_link(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LinkParams>,
) -> Result<Json<ContentRecord>, ApiError> {
    state
        .storage
        .get(&params.link)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("no record for {}", params.link)))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let records = state.storage.count().await?;
    Ok(Json(json!({ "status": "ok", "records": records })))
}
