use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Billing provider credentials and the app URLs handed to hosted pages.
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    pub secret_key: String,
    pub publishable_key: String,
    pub webhook_secret: String,
    pub app_base_url: String,
    pub return_path: String,
}

impl BillingConfig {
    /// Where the hosted portal sends the customer back to.
    pub fn return_url(&self) -> String {
        join_url(&self.app_base_url, &self.return_path)
    }

    pub fn checkout_success_url(&self) -> String {
        join_url(&self.app_base_url, "/checkout/success?session_id={CHECKOUT_SESSION_ID}")
    }

    pub fn checkout_cancel_url(&self) -> String {
        join_url(&self.app_base_url, "/checkout/canceled")
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub billing: BillingConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "billdesk".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "billdesk-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
            refresh_ttl_minutes: std::env::var("JWT_REFRESH_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 14),
        };
        let billing = BillingConfig {
            secret_key: std::env::var("STRIPE_SECRET_KEY")?,
            publishable_key: std::env::var("STRIPE_PUBLISHABLE_KEY")?,
            webhook_secret: std::env::var("STRIPE_WEBHOOK_SECRET")?,
            app_base_url: std::env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".into()),
            return_path: std::env::var("BILLING_RETURN_PATH").unwrap_or_else(|_| "/account".into()),
        };
        Ok(Self {
            database_url,
            jwt,
            billing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn billing(base: &str, path: &str) -> BillingConfig {
        BillingConfig {
            secret_key: "sk_test".into(),
            publishable_key: "pk_test".into(),
            webhook_secret: "whsec_test".into(),
            app_base_url: base.into(),
            return_path: path.into(),
        }
    }

    #[test]
    fn return_url_joins_without_double_slash() {
        assert_eq!(
            billing("https://app.test/", "/account").return_url(),
            "https://app.test/account"
        );
        assert_eq!(
            billing("https://app.test", "account").return_url(),
            "https://app.test/account"
        );
    }

    #[test]
    fn checkout_success_url_keeps_session_placeholder() {
        let url = billing("https://app.test", "/account").checkout_success_url();
        assert!(url.ends_with("session_id={CHECKOUT_SESSION_ID}"));
    }
}
