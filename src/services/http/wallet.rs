use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::oneshot;

use super::{channel_error_response, error_response, AppState};
use crate::services::wallet::WalletRequest;

const DEFAULT_ACTIVITY_LIMIT: i64 = 50;

pub async fn get_overview(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let (tx, rx) = oneshot::channel();

    if state
        .wallet_channel
        .send(WalletRequest::GetOverview {
            user_id,
            response: tx,
        })
        .await
        .is_err()
    {
        return channel_error_response();
    }

    match rx.await {
        Ok(Ok(overview)) => (StatusCode::OK, Json(json!(overview))),
        Ok(Err(error)) => error_response(error),
        Err(_) => channel_error_response(),
    }
}

#[derive(Deserialize)]
pub struct ActivityParams {
    limit: Option<i64>,
}

pub async fn get_activity(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<ActivityParams>,
) -> impl IntoResponse {
    let (tx, rx) = oneshot::channel();

    let limit = params
        .limit
        .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
        .clamp(1, 500);

    if state
        .wallet_channel
        .send(WalletRequest::GetActivity {
            user_id,
            limit,
            response: tx,
        })
        .await
        .is_err()
    {
        return channel_error_response();
    }

    match rx.await {
        Ok(Ok(notifications)) => (StatusCode::OK, Json(json!(notifications))),
        Ok(Err(error)) => error_response(error),
        Err(_) => channel_error_response(),
    }
}

pub async fn mark_activity_read(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let (tx, rx) = oneshot::channel();

    if state
        .wallet_channel
        .send(WalletRequest::MarkActivityRead {
            user_id,
            response: tx,
        })
        .await
        .is_err()
    {
        return channel_error_response();
    }

    match rx.await {
        Ok(Ok(updated)) => (StatusCode::OK, Json(json!({"marked_read": updated}))),
        Ok(Err(error)) => error_response(error),
        Err(_) => channel_error_response(),
    }
}
