use axum::extract::{Json, Query, State};
use serde::Deserialize;
use shared_types::whatsapp::WebhookNotification;
use shared_types::{SyncResponse, WebhookAck};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub async fn health_check() -> &'static str {
    "OK"
}

/// Query parameters of the webhook verification handshake.
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode", default)]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token", alias = "token", alias = "hub_verify_token", default)]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge", alias = "challenge", alias = "hub_challenge", default)]
    pub challenge: Option<String>,
}

/// Echo the challenge when the verify token matches.
pub async fn verify_webhook(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> ApiResult<String> {
    if params.verify_token.as_deref() != Some(state.verify_token.as_str()) {
        return Err(ApiError::Forbidden(
            "webhook verify token mismatch".to_string(),
        ));
    }

    tracing::info!("Webhook verified (mode: {:?})", params.mode);
    Ok(params.challenge.unwrap_or_else(|| "OK".to_string()))
}

/// Apply every button reply in a delivery.
///
/// Always answers 200; anything that is not a button reply is acknowledged
/// as `ignored` so the platform does not redeliver it.
pub async fn receive_webhook(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> Json<WebhookAck> {
    let notification: WebhookNotification = match serde_json::from_value(payload) {
        Ok(n) => n,
        Err(e) => {
            tracing::debug!("Ignoring unrecognised webhook payload: {}", e);
            return Json(WebhookAck::ignored());
        }
    };

    let replies = notification.button_replies();
    tracing::debug!("Webhook delivery carries {} button replies", replies.len());

    let mut results = Vec::with_capacity(replies.len());
    for reply in &replies {
        if let Some(result) = state.replies.handle_and_notify(reply).await {
            results.push(result);
        }
    }

    Json(WebhookAck::from_results(results))
}

/// Invite every pending member of upcoming events.
pub async fn sync_and_invite(
    State(state): State<AppState>,
) -> ApiResult<Json<SyncResponse>> {
    let report = state
        .dispatcher
        .dispatch(state.days_ahead)
        .await
        .map_err(ApiError::SyncFailed)?;

    Ok(Json(report.into()))
}
