use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("billing api error: {0}")]
    Api(String),
    #[error("invalid customer id: {0}")]
    InvalidCustomer(String),
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<stripe::StripeError> for BillingError {
    fn from(err: stripe::StripeError) -> Self {
        BillingError::Api(err.to_string())
    }
}

/// Hosted portal session; only the URL is used locally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortalSession {
    pub id: String,
    pub url: String,
}

#[derive(Clone, Debug)]
pub struct CreateCheckoutRequest {
    pub customer: String,
    pub price: String,
    pub client_reference_id: String,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Clone, Debug)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

/// Outbound calls to the billing provider.
#[async_trait]
pub trait BillingClient: Send + Sync {
    async fn create_customer(&self, email: &str) -> Result<String, BillingError>;

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, BillingError>;

    async fn price_for_lookup_key(&self, lookup_key: &str) -> Result<String, BillingError>;

    async fn create_checkout_session(
        &self,
        req: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, BillingError>;
}
