use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{handlers::load_user, repo_types::User, services::AuthUser},
    billing::{
        client::{BillingClient, BillingError, CreateCheckoutRequest},
        dto::{BillingConfigResponse, FeaturesResponse},
        plans::Plan,
    },
    state::AppState,
};

pub fn billing_routes() -> Router<AppState> {
    Router::new()
        .route("/customer_portal_sessions", post(create_portal_session))
        .route("/checkout_sessions", post(create_checkout_session))
        .route("/billing/config", get(billing_config))
        .route("/features", get(features))
}

fn upstream(e: BillingError) -> (StatusCode, String) {
    (StatusCode::BAD_GATEWAY, e.to_string())
}

/// 303 to `url`, left exactly as the provider returned it.
fn see_other(url: &str) -> Result<Response, (StatusCode, String)> {
    let location = HeaderValue::from_str(url).map_err(|e| {
        error!(error = %e, "provider returned an unusable redirect url");
        (StatusCode::BAD_GATEWAY, "invalid redirect url".to_string())
    })?;
    Ok((StatusCode::SEE_OTHER, [(header::LOCATION, location)]).into_response())
}

/// Opens a portal session for `user`'s own customer and redirects to it.
pub(crate) async fn portal_redirect(
    billing: &dyn BillingClient,
    user: &User,
    return_url: &str,
) -> Result<Response, (StatusCode, String)> {
    let session = billing
        .create_portal_session(&user.external_customer_id, return_url)
        .await
        .map_err(|e| {
            warn!(error = %e, user_id = %user.id, "portal session creation failed");
            upstream(e)
        })?;
    info!(user_id = %user.id, session_id = %session.id, "portal session created");
    see_other(&session.url)
}

#[instrument(skip(state))]
pub async fn create_portal_session(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Response, (StatusCode, String)> {
    let user = load_user(&state, user_id).await?;
    portal_redirect(
        state.billing.as_ref(),
        &user,
        &state.config.billing.return_url(),
    )
    .await
}

pub(crate) async fn checkout_redirect(
    state: &AppState,
    user: &User,
) -> Result<Response, (StatusCode, String)> {
    let price = state
        .billing
        .price_for_lookup_key(&user.plan)
        .await
        .map_err(|e| {
            warn!(error = %e, plan = %user.plan, "price lookup failed");
            upstream(e)
        })?;

    let cfg = &state.config.billing;
    let session = state
        .billing
        .create_checkout_session(CreateCheckoutRequest {
            customer: user.external_customer_id.clone(),
            price,
            client_reference_id: user.id.to_string(),
            success_url: cfg.checkout_success_url(),
            cancel_url: cfg.checkout_cancel_url(),
        })
        .await
        .map_err(|e| {
            warn!(error = %e, user_id = %user.id, "checkout session creation failed");
            upstream(e)
        })?;

    let url = session.url.ok_or_else(|| {
        error!(session_id = %session.id, "checkout session without url");
        (StatusCode::BAD_GATEWAY, "checkout session has no url".to_string())
    })?;
    info!(user_id = %user.id, session_id = %session.id, "checkout session created");
    see_other(&url)
}

#[instrument(skip(state))]
pub async fn create_checkout_session(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Response, (StatusCode, String)> {
    let user = load_user(&state, user_id).await?;
    checkout_redirect(&state, &user).await
}

pub async fn billing_config(State(state): State<AppState>) -> Json<BillingConfigResponse> {
    Json(BillingConfigResponse {
        publishable_key: state.config.billing.publishable_key.clone(),
        plans: Plan::ALL.iter().map(|p| p.lookup_key().to_string()).collect(),
    })
}

pub(crate) fn require_access(user: &User) -> Result<FeaturesResponse, (StatusCode, String)> {
    let status = user.status();
    if !status.has_access() {
        return Err((
            StatusCode::PAYMENT_REQUIRED,
            format!("subscription is {status}"),
        ));
    }
    Ok(FeaturesResponse {
        plan: user.plan.clone(),
        subscription_status: status,
    })
}

#[instrument(skip(state))]
pub async fn features(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<FeaturesResponse>, (StatusCode, String)> {
    let user = load_user(&state, user_id).await?;
    require_access(&user).map(Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::fake::FakeBilling;
    use axum::{body::Body, http::Request};
    use time::OffsetDateTime;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn user(customer: &str, status: &str) -> User {
        User {
            id: Uuid::new_v4(),
            email: "jo@example.com".into(),
            password_hash: String::new(),
            plan: "pro".into(),
            external_customer_id: customer.into(),
            subscription_status: status.into(),
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn portal_uses_callers_own_customer_id() {
        let fake = FakeBilling::new();
        let caller = user("cus_caller", "active");
        let _other = user("cus_other", "active");

        portal_redirect(&fake, &caller, "https://app.example.test/account")
            .await
            .expect("redirect");

        let calls = fake.portal_requests.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "cus_caller");
        assert_eq!(calls[0].1, "https://app.example.test/account");
    }

    #[tokio::test]
    async fn portal_redirects_to_provider_url_unmodified() {
        let fake = FakeBilling::new();
        let res = portal_redirect(&fake, &user("cus_1", "incomplete"), "https://r.test")
            .await
            .expect("redirect");

        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        let location = res.headers().get(header::LOCATION).unwrap().to_str().unwrap();
        assert_eq!(location, fake.portal_url);
    }

    #[tokio::test]
    async fn portal_surfaces_provider_error() {
        let fake = FakeBilling::failing("No such customer: 'cus_gone'");
        let err = portal_redirect(&fake, &user("cus_gone", "active"), "https://r.test")
            .await
            .err()
            .unwrap();
        assert_eq!(err.0, StatusCode::BAD_GATEWAY);
        assert!(err.1.contains("No such customer"));
    }

    #[tokio::test]
    async fn checkout_targets_callers_customer_and_plan_price() {
        let fake = FakeBilling::new();
        let state = AppState::fake_with(fake.clone());
        let caller = user("cus_caller", "incomplete");

        let res = checkout_redirect(&state, &caller).await.expect("redirect");
        assert_eq!(res.status(), StatusCode::SEE_OTHER);

        let reqs = fake.checkout_requests.lock().unwrap();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].customer, "cus_caller");
        assert_eq!(reqs[0].price, "price_pro");
        assert_eq!(reqs[0].client_reference_id, caller.id.to_string());
    }

    #[test]
    fn features_require_active_or_trialing() {
        assert!(require_access(&user("cus_1", "active")).is_ok());
        assert!(require_access(&user("cus_1", "trialing")).is_ok());
        let err = require_access(&user("cus_1", "past_due")).unwrap_err();
        assert_eq!(err.0, StatusCode::PAYMENT_REQUIRED);
    }

    #[tokio::test]
    async fn portal_endpoint_requires_authentication() {
        let app = billing_routes().with_state(AppState::fake());
        let res = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/customer_portal_sessions")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn billing_config_exposes_publishable_key_only() {
        let app = billing_routes().with_state(AppState::fake());
        let res = app
            .oneshot(Request::builder().uri("/billing/config").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["publishable_key"], "pk_test_fake");
        assert_eq!(json["plans"], serde_json::json!(["starter", "pro", "enterprise"]));
        assert!(!String::from_utf8_lossy(&body).contains("sk_test"));
    }
}
