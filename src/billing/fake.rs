use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::client::{
    BillingClient, BillingError, CheckoutSession, CreateCheckoutRequest, PortalSession,
};

/// In-memory billing provider that records every call.
#[derive(Clone, Default)]
pub struct FakeBilling {
    pub portal_requests: Arc<Mutex<Vec<(String, String)>>>,
    pub checkout_requests: Arc<Mutex<Vec<CreateCheckoutRequest>>>,
    pub customers: Arc<Mutex<Vec<String>>>,
    pub portal_url: String,
    pub fail_with: Option<String>,
}

impl FakeBilling {
    pub fn new() -> Self {
        Self {
            portal_url: "https://billing.example.test/p/session/abc?x=1&y=%2F".into(),
            ..Default::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.into()),
            ..Self::new()
        }
    }

    fn check(&self) -> Result<(), BillingError> {
        match &self.fail_with {
            Some(msg) => Err(BillingError::Api(msg.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BillingClient for FakeBilling {
    async fn create_customer(&self, email: &str) -> Result<String, BillingError> {
        self.check()?;
        let mut customers = self.customers.lock().unwrap();
        customers.push(email.to_string());
        Ok(format!("cus_test_{}", customers.len()))
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, BillingError> {
        self.portal_requests
            .lock()
            .unwrap()
            .push((customer_id.to_string(), return_url.to_string()));
        self.check()?;
        Ok(PortalSession {
            id: "bps_test_1".into(),
            url: self.portal_url.clone(),
        })
    }

    async fn price_for_lookup_key(&self, lookup_key: &str) -> Result<String, BillingError> {
        self.check()?;
        Ok(format!("price_{lookup_key}"))
    }

    async fn create_checkout_session(
        &self,
        req: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, BillingError> {
        self.checkout_requests.lock().unwrap().push(req);
        self.check()?;
        Ok(CheckoutSession {
            id: "cs_test_1".into(),
            url: Some("https://billing.example.test/c/pay/cs_test_1".into()),
        })
    }
}
