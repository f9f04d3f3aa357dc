//! Subscriber registration and subscription handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

use episodecast_core::{Quality, StoreError, Subscriber, Subscription};

use super::ErrorResponse;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for registering a subscriber
#[derive(Debug, Deserialize)]
pub struct RegisterBody {
    /// Token embedded in the subscriber's announce URLs
    pub tracking_token: String,
}

/// Request body for following a series
#[derive(Debug, Deserialize)]
pub struct SubscribeBody {
    /// `"<local> (<foreign>)"`, matched case-insensitively
    pub series: String,
    pub quality: Quality,
}

/// Subscriber as returned by the API; the tracking token is not echoed.
#[derive(Debug, Serialize)]
pub struct SubscriberResponse {
    pub id: String,
    pub subscriptions: Vec<Subscription>,
    pub created_at: String,
}

impl From<Subscriber> for SubscriberResponse {
    fn from(subscriber: Subscriber) -> Self {
        Self {
            id: subscriber.id,
            subscriptions: subscriber.subscriptions,
            created_at: subscriber.created_at.to_rfc3339(),
        }
    }
}

type ErrorReply = (StatusCode, Json<ErrorResponse>);

fn error_response(status: StatusCode, error: impl Into<String>) -> ErrorReply {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

fn store_error(subscriber_id: &str, e: StoreError) -> ErrorReply {
    match e {
        StoreError::NotFound(_) => not_found(subscriber_id),
        e => {
            error!(subscriber_id = %subscriber_id, error = %e, "Subscriber store error");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

fn not_found(subscriber_id: &str) -> ErrorReply {
    error_response(
        StatusCode::NOT_FOUND,
        format!("Subscriber not found: {}", subscriber_id),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// PUT /api/v1/subscribers/{subscriber}
///
/// Create a subscriber or replace its tracking token.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Path(subscriber_id): Path<String>,
    Json(body): Json<RegisterBody>,
) -> Result<Json<SubscriberResponse>, impl IntoResponse> {
    if body.tracking_token.trim().is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "tracking_token must not be empty",
        ));
    }

    state
        .registry()
        .register(&subscriber_id, &body.tracking_token)
        .map(|subscriber| Json(subscriber.into()))
        .map_err(|e| store_error(&subscriber_id, e))
}

/// GET /api/v1/subscribers/{subscriber}
pub async fn get_subscriber(
    State(state): State<Arc<AppState>>,
    Path(subscriber_id): Path<String>,
) -> Result<Json<SubscriberResponse>, impl IntoResponse> {
    match state.registry().get(&subscriber_id) {
        Ok(Some(subscriber)) => Ok(Json(subscriber.into())),
        Ok(None) => Err(not_found(&subscriber_id)),
        Err(e) => Err(store_error(&subscriber_id, e)),
    }
}

/// DELETE /api/v1/subscribers/{subscriber}
///
/// Remove a subscriber with its feed and personalized descriptors.
pub async fn unregister(
    State(state): State<Arc<AppState>>,
    Path(subscriber_id): Path<String>,
) -> Result<StatusCode, impl IntoResponse> {
    match state.registry().unregister(&subscriber_id).await {
        Ok(true) => Ok(StatusCode::NO_CONTENT),
        Ok(false) => Err(not_found(&subscriber_id)),
        Err(e) => Err(store_error(&subscriber_id, e)),
    }
}

/// PUT /api/v1/subscribers/{subscriber}/subscriptions
///
/// Follow a series in one quality tier.
pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    Path(subscriber_id): Path<String>,
    Json(body): Json<SubscribeBody>,
) -> Result<Json<SubscriberResponse>, impl IntoResponse> {
    if body.series.trim().is_empty() {
        return Err(error_response(StatusCode::BAD_REQUEST, "series must not be empty"));
    }

    state
        .registry()
        .subscribe(&subscriber_id, &body.series, body.quality)
        .map(|subscriber| Json(subscriber.into()))
        .map_err(|e| store_error(&subscriber_id, e))
}

/// DELETE /api/v1/subscribers/{subscriber}/subscriptions/{series}
///
/// Stop following a series; its entries leave the subscriber's feed.
pub async fn unsubscribe(
    State(state): State<Arc<AppState>>,
    Path((subscriber_id, series)): Path<(String, String)>,
) -> Result<StatusCode, impl IntoResponse> {
    match state.registry().unsubscribe(&subscriber_id, &series).await {
        Ok(true) => Ok(StatusCode::NO_CONTENT),
        Ok(false) => Err(error_response(
            StatusCode::NOT_FOUND,
            format!("Subscription not found: {}", series),
        )),
        Err(e) => Err(store_error(&subscriber_id, e)),
    }
}
