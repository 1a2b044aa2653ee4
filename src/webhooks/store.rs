use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{auth::repo_types::User, billing::plans::SubscriptionStatus, webhooks::events::UserRef};

/// The user reads and writes the webhook path needs.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn find_user(&self, target: &UserRef) -> anyhow::Result<Option<User>>;

    /// Writes the status and, when `plan` is `Some`, the plan. Nothing else.
    async fn update_subscription(
        &self,
        user_id: Uuid,
        status: &SubscriptionStatus,
        plan: Option<&str>,
    ) -> anyhow::Result<Option<User>>;
}

pub struct PgSubscriptionStore {
    db: PgPool,
}

impl PgSubscriptionStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SubscriptionStore for PgSubscriptionStore {
    async fn find_user(&self, target: &UserRef) -> anyhow::Result<Option<User>> {
        match target {
            UserRef::Customer(customer_id) => {
                User::find_by_external_customer_id(&self.db, customer_id).await
            }
            UserRef::Id(id) => User::find_by_id(&self.db, *id).await,
        }
    }

    async fn update_subscription(
        &self,
        user_id: Uuid,
        status: &SubscriptionStatus,
        plan: Option<&str>,
    ) -> anyhow::Result<Option<User>> {
        User::update_subscription(&self.db, user_id, status, plan).await
    }
}
