use axum::{
    extract::{Path, Request, State},
    http::{Method, StatusCode},
    middleware::{self, Next},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use tower_http::trace::TraceLayer;

use super::ledger::LedgerRequest;
use super::wallet::WalletRequest;
use crate::ledger::error::{ErrorKind, LedgerError};
use crate::models::account::Asset;
use crate::models::amount::Amount;
use crate::settings::Settings;

mod wallet;

#[derive(Clone)]
struct AppState {
    ledger_channel: mpsc::Sender<LedgerRequest>,
    wallet_channel: mpsc::Sender<WalletRequest>,
}

fn channel_error_response() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"description": "Internal server error."})),
    )
}

fn error_response(error: LedgerError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match error.kind() {
        ErrorKind::Precondition => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::AlreadyProcessed => StatusCode::CONFLICT,
        ErrorKind::Conflict => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Unavailable => {
            log::error!("store failure surfaced to HTTP: {error}");
            return channel_error_response();
        }
    };

    (status, Json(json!({"description": error.to_string()})))
}

async fn check_in(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let (tx, rx) = oneshot::channel();

    if state
        .ledger_channel
        .send(LedgerRequest::CheckIn {
            user_id,
            response: tx,
        })
        .await
        .is_err()
    {
        return channel_error_response();
    }

    match rx.await {
        Ok(Ok(reward)) => (
            StatusCode::OK,
            Json(json!({"reward": reward, "description": format!("You earned +{reward} Fair.")})),
        ),
        Ok(Err(error)) => error_response(error),
        Err(_) => channel_error_response(),
    }
}

async fn start_mining(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let (tx, rx) = oneshot::channel();

    if state
        .ledger_channel
        .send(LedgerRequest::StartMining {
            user_id,
            response: tx,
        })
        .await
        .is_err()
    {
        return channel_error_response();
    }

    match rx.await {
        Ok(Ok(started_at)) => (
            StatusCode::OK,
            Json(json!({"mining_started_at": started_at})),
        ),
        Ok(Err(error)) => error_response(error),
        Err(_) => channel_error_response(),
    }
}

async fn claim_mining(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let (tx, rx) = oneshot::channel();

    if state
        .ledger_channel
        .send(LedgerRequest::ClaimMining {
            user_id,
            response: tx,
        })
        .await
        .is_err()
    {
        return channel_error_response();
    }

    match rx.await {
        Ok(Ok(reward)) => (
            StatusCode::OK,
            Json(json!({"reward": reward, "description": format!("You've received {reward} Fair.")})),
        ),
        Ok(Err(error)) => error_response(error),
        Err(_) => channel_error_response(),
    }
}

#[derive(Deserialize)]
struct RedeemCodeBody {
    code: String,
}

async fn redeem_code(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(body): Json<RedeemCodeBody>,
) -> impl IntoResponse {
    let (tx, rx) = oneshot::channel();

    if state
        .ledger_channel
        .send(LedgerRequest::RedeemCode {
            user_id,
            code: body.code,
            response: tx,
        })
        .await
        .is_err()
    {
        return channel_error_response();
    }

    match rx.await {
        Ok(Ok(reward)) => (
            StatusCode::OK,
            Json(json!({"reward": reward, "description": "Your reward has been added to your wallet."})),
        ),
        Ok(Err(error)) => error_response(error),
        Err(_) => channel_error_response(),
    }
}

#[derive(Deserialize)]
struct SendBody {
    recipient_email: String,
    asset: Asset,
    amount_cents: i64,
}

async fn send_tokens(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(body): Json<SendBody>,
) -> impl IntoResponse {
    let (tx, rx) = oneshot::channel();

    if state
        .ledger_channel
        .send(LedgerRequest::Send {
            sender_id: user_id,
            recipient_email: body.recipient_email,
            asset: body.asset,
            amount: Amount::from_cents(body.amount_cents),
            response: tx,
        })
        .await
        .is_err()
    {
        return channel_error_response();
    }

    match rx.await {
        Ok(Ok(plan)) => (StatusCode::OK, Json(json!(plan))),
        Ok(Err(error)) => error_response(error),
        Err(_) => channel_error_response(),
    }
}

#[derive(Deserialize)]
struct SwapBody {
    amount_cents: i64,
}

async fn swap_points(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(body): Json<SwapBody>,
) -> impl IntoResponse {
    let (tx, rx) = oneshot::channel();

    if state
        .ledger_channel
        .send(LedgerRequest::Swap {
            user_id,
            amount: Amount::from_cents(body.amount_cents),
            response: tx,
        })
        .await
        .is_err()
    {
        return channel_error_response();
    }

    match rx.await {
        Ok(Ok(plan)) => (StatusCode::OK, Json(json!(plan))),
        Ok(Err(error)) => error_response(error),
        Err(_) => channel_error_response(),
    }
}

#[derive(Deserialize, Default)]
struct AdBonusBody {
    context: Option<String>,
}

async fn ad_bonus(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(body): Json<AdBonusBody>,
) -> impl IntoResponse {
    let (tx, rx) = oneshot::channel();

    if state
        .ledger_channel
        .send(LedgerRequest::AdBonus {
            user_id,
            context: body.context.unwrap_or_else(|| "Reward".to_string()),
            response: tx,
        })
        .await
        .is_err()
    {
        return channel_error_response();
    }

    match rx.await {
        Ok(Ok(bonus)) => (
            StatusCode::OK,
            Json(json!({"bonus": bonus, "description": format!("You earned +{bonus} Fair with an ad bonus!")})),
        ),
        Ok(Err(error)) => error_response(error),
        Err(_) => channel_error_response(),
    }
}

pub async fn start_http_server(
    ledger_channel: mpsc::Sender<LedgerRequest>,
    wallet_channel: mpsc::Sender<WalletRequest>,
    settings: &Settings,
) -> Result<(), anyhow::Error> {
    let app_state = AppState {
        ledger_channel,
        wallet_channel,
    };

    let maintenance = settings.features.maintenance;

    let app = Router::new()
        .route("/users/{user_id}/check-in", post(check_in))
        .route("/users/{user_id}/mining/start", post(start_mining))
        .route("/users/{user_id}/mining/claim", post(claim_mining))
        .route("/users/{user_id}/codes/redeem", post(redeem_code))
        .route("/users/{user_id}/send", post(send_tokens))
        .route("/users/{user_id}/swap", post(swap_points))
        .route("/users/{user_id}/ad-bonus", post(ad_bonus))
        .route("/users/{user_id}/wallet", get(wallet::get_overview))
        .route("/users/{user_id}/notifications", get(wallet::get_activity))
        .route(
            "/users/{user_id}/notifications/read",
            put(wallet::mark_activity_read),
        )
        .route("/health", get(|| async { "OK" }))
        .with_state(app_state)
        .layer(middleware::from_fn(move |request: Request, next: Next| {
            async move {
                // Reads stay available during maintenance; writes do not.
                if maintenance && request.method() != Method::GET {
                    return (
                        StatusCode::SERVICE_UNAVAILABLE,
                        Json(json!({"description": "The service is down for maintenance. Please try again later."})),
                    )
                        .into_response();
                }
                next.run(request).await
            }
        }))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&settings.http.bind).await?;
    println!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
