// async-stripe is built with `billing` (portal sessions) and `checkout` only.
use async_trait::async_trait;
use tracing::debug;

use super::client::{
    BillingClient, BillingError, CheckoutSession, CreateCheckoutRequest, PortalSession,
};
use crate::config::BillingConfig;

pub struct StripeBilling {
    client: stripe::Client,
}

impl StripeBilling {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            client: stripe::Client::new(secret_key),
        }
    }

    pub fn from_config(config: &BillingConfig) -> Self {
        Self::new(config.secret_key.clone())
    }
}

fn parse_customer(customer_id: &str) -> Result<stripe::CustomerId, BillingError> {
    customer_id
        .parse::<stripe::CustomerId>()
        .map_err(|e| BillingError::InvalidCustomer(format!("{customer_id}: {e}")))
}

#[async_trait]
impl BillingClient for StripeBilling {
    async fn create_customer(&self, email: &str) -> Result<String, BillingError> {
        let mut params = stripe::CreateCustomer::new();
        params.email = Some(email);
        let customer = stripe::Customer::create(&self.client, params).await?;
        debug!(customer_id = %customer.id, "stripe customer created");
        Ok(customer.id.to_string())
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, BillingError> {
        let mut params = stripe::CreateBillingPortalSession::new(parse_customer(customer_id)?);
        params.return_url = Some(return_url);
        let session = stripe::BillingPortalSession::create(&self.client, params).await?;
        Ok(PortalSession {
            id: session.id.to_string(),
            url: session.url,
        })
    }

    async fn price_for_lookup_key(&self, lookup_key: &str) -> Result<String, BillingError> {
        let mut params = stripe::ListPrices::new();
        params.lookup_keys = Some(vec![lookup_key.to_string()]);
        params.active = Some(true);
        params.limit = Some(1);
        let prices = stripe::Price::list(&self.client, &params).await?;
        prices
            .data
            .into_iter()
            .next()
            .map(|price| price.id.to_string())
            .ok_or_else(|| BillingError::NotFound(format!("price with lookup key {lookup_key}")))
    }

    async fn create_checkout_session(
        &self,
        req: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, BillingError> {
        let mut params = stripe::CreateCheckoutSession::new();
        params.mode = Some(stripe::CheckoutSessionMode::Subscription);
        params.success_url = Some(&req.success_url);
        params.cancel_url = Some(&req.cancel_url);
        params.client_reference_id = Some(&req.client_reference_id);
        params.customer = Some(parse_customer(&req.customer)?);
        params.line_items = Some(vec![stripe::CreateCheckoutSessionLineItems {
            price: Some(req.price.clone()),
            quantity: Some(1),
            ..Default::default()
        }]);

        let session = stripe::CheckoutSession::create(&self.client, params).await?;
        Ok(CheckoutSession {
            id: session.id.to_string(),
            url: session.url,
        })
    }
}
