//! Subscriber feed and personalized descriptor handlers.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::error;

use episodecast_core::render_rss;

use super::ErrorResponse;
use crate::state::AppState;

const RSS_CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";
const TORRENT_CONTENT_TYPE: &str = "application/x-bittorrent";

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

/// GET /api/v1/feeds/{subscriber}
///
/// RSS document listing the subscriber's personalized releases, newest first.
pub async fn get_feed(
    State(state): State<Arc<AppState>>,
    Path(subscriber_id): Path<String>,
) -> Response {
    match state.subscribers().get(&subscriber_id) {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error_response(
                StatusCode::NOT_FOUND,
                format!("Subscriber not found: {}", subscriber_id),
            )
        }
        Err(e) => {
            error!(subscriber_id = %subscriber_id, error = %e, "Failed to load subscriber");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    }

    let items = match state.feeds().load(&subscriber_id) {
        Ok(items) => items,
        Err(e) => {
            error!(subscriber_id = %subscriber_id, error = %e, "Failed to load subscriber feed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    let channel_link = format!("{}/api/v1/feeds/{}", state.public_url(), subscriber_id);
    match render_rss(
        &format!("episodecast: {}", subscriber_id),
        &channel_link,
        &items,
    ) {
        Ok(document) => ([(header::CONTENT_TYPE, RSS_CONTENT_TYPE)], document).into_response(),
        Err(e) => {
            error!(subscriber_id = %subscriber_id, error = %e, "Failed to render feed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// GET /api/v1/torrents/{subscriber}/{file}
///
/// Personalized descriptor bytes.
pub async fn get_torrent(
    State(state): State<Arc<AppState>>,
    Path((subscriber_id, file_name)): Path<(String, String)>,
) -> Response {
    match state
        .descriptors()
        .load_user_descriptor(&subscriber_id, &file_name)
        .await
    {
        Ok(Some(bytes)) => {
            let disposition = format!(
                "attachment; filename*=UTF-8''{}",
                urlencoding::encode(&file_name)
            );
            (
                [
                    (header::CONTENT_TYPE, TORRENT_CONTENT_TYPE.to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                bytes,
            )
                .into_response()
        }
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            format!("Descriptor not found: {}", file_name),
        ),
        Err(e) => {
            error!(subscriber_id = %subscriber_id, file = %file_name, error = %e, "Failed to load descriptor");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
