use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    state::AppState,
    webhooks::{
        events::{BillingEvent, Envelope, UserUpdate},
        store::SubscriptionStore,
    },
};

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/webhooks", post(receive_webhook))
}

/// Checks the `Stripe-Signature` header against `secret` with the provider SDK.
///
/// The SDK only parses the typed event after the signature and timestamp
/// checks pass, so a `BadParse` still means the payload is authentic. The
/// local envelope is parsed separately.
fn verify_signature(payload: &str, header: &str, secret: &str) -> Result<(), stripe::WebhookError> {
    match stripe::Webhook::construct_event(payload, header, secret) {
        Ok(_) | Err(stripe::WebhookError::BadParse(_)) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Verifies, parses and applies one provider event.
///
/// Unknown event types and unknown customers are acknowledged without a
/// write. There is no local idempotency or retry; redelivery is the
/// provider's.
#[instrument(skip_all)]
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, (StatusCode, String)> {
    let sig = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            warn!("webhook without signature header");
            (StatusCode::BAD_REQUEST, format!("Missing {SIGNATURE_HEADER}"))
        })?;

    let payload = std::str::from_utf8(&body).map_err(|e| {
        warn!(error = %e, "webhook payload is not utf-8");
        (StatusCode::BAD_REQUEST, "invalid payload".to_string())
    })?;

    verify_signature(payload, sig, &state.config.billing.webhook_secret).map_err(|e| {
        warn!(error = %e, "webhook signature rejected");
        (StatusCode::BAD_REQUEST, "invalid signature".to_string())
    })?;

    let envelope: Envelope = serde_json::from_str(payload).map_err(|e| {
        warn!(error = %e, "webhook payload is not an event");
        (StatusCode::BAD_REQUEST, "malformed event".to_string())
    })?;
    let event_id = envelope.id.clone();
    let event_type = envelope.event_type.clone();

    let event = BillingEvent::from_envelope(envelope).map_err(|e| {
        warn!(error = %e, event_id = %event_id, event_type = %event_type, "malformed event object");
        (StatusCode::BAD_REQUEST, "malformed event object".to_string())
    })?;

    match (event.user_update(), &event) {
        (Some(update), _) => {
            apply(state.subscriptions.as_ref(), &event_id, &event_type, update).await?
        }
        (None, BillingEvent::Ignored(kind)) => {
            debug!(event_id = %event_id, event_type = %kind, "event ignored")
        }
        (None, _) => {
            warn!(event_id = %event_id, event_type = %event_type, "event names no user; skipping")
        }
    }

    Ok(Json(json!({ "received": true })))
}

async fn apply(
    store: &dyn SubscriptionStore,
    event_id: &str,
    event_type: &str,
    update: UserUpdate,
) -> Result<(), (StatusCode, String)> {
    let mut found = None;
    for target in &update.targets {
        found = store.find_user(target).await.map_err(|e| {
            error!(error = %e, event_id, "user lookup failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "lookup failed".to_string())
        })?;
        if found.is_some() {
            break;
        }
    }

    let Some(user) = found else {
        warn!(event_id, event_type, targets = ?update.targets, "no local user for event; skipping");
        return Ok(());
    };

    let updated = store
        .update_subscription(user.id, &update.status, update.plan.as_deref())
        .await
        .map_err(|e| {
            error!(error = %e, event_id, user_id = %user.id, "subscription update failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "update failed".to_string())
        })?;

    if let Some(user) = updated {
        info!(
            event_id,
            event_type,
            user_id = %user.id,
            plan = %user.plan,
            status = %user.subscription_status,
            "subscription updated"
        );
    }
    Ok(())
}
