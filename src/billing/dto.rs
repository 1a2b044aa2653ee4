use serde::Serialize;

use crate::billing::plans::SubscriptionStatus;

/// Public billing settings for the frontend.
#[derive(Debug, Serialize)]
pub struct BillingConfigResponse {
    pub publishable_key: String,
    pub plans: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct FeaturesResponse {
    pub plan: String,
    pub subscription_status: SubscriptionStatus,
}
