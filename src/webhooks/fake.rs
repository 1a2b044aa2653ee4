use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{events::UserRef, store::SubscriptionStore};
use crate::{auth::repo_types::User, billing::plans::SubscriptionStatus};

/// In-memory users table with the same update rule as the SQL one.
#[derive(Clone, Default)]
pub struct FakeSubscriptions {
    pub users: Arc<Mutex<Vec<User>>>,
    pub writes: Arc<Mutex<usize>>,
    pub fail_with: Option<String>,
}

impl FakeSubscriptions {
    pub fn with_user(user: User) -> Self {
        Self {
            users: Arc::new(Mutex::new(vec![user])),
            ..Default::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn user(&self, id: Uuid) -> Option<User> {
        self.users.lock().unwrap().iter().find(|u| u.id == id).cloned()
    }

    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap()
    }

    fn check(&self) -> anyhow::Result<()> {
        match &self.fail_with {
            Some(msg) => Err(anyhow::anyhow!(msg.clone())),
            None => Ok(()),
        }
    }
}

/// A signed-up user as the webhook path finds it.
pub fn user(customer_id: &str, plan: &str, status: &str) -> User {
    User {
        id: Uuid::new_v4(),
        email: "billing@example.com".into(),
        password_hash: "$argon2id$hash".into(),
        plan: plan.into(),
        external_customer_id: customer_id.into(),
        subscription_status: status.into(),
        created_at: OffsetDateTime::UNIX_EPOCH,
        updated_at: OffsetDateTime::UNIX_EPOCH,
    }
}

#[async_trait]
impl SubscriptionStore for FakeSubscriptions {
    async fn find_user(&self, target: &UserRef) -> anyhow::Result<Option<User>> {
        self.check()?;
        let users = self.users.lock().unwrap();
        Ok(users
            .iter()
            .find(|u| match target {
                UserRef::Customer(customer_id) => &u.external_customer_id == customer_id,
                UserRef::Id(id) => &u.id == id,
            })
            .cloned())
    }

    async fn update_subscription(
        &self,
        user_id: Uuid,
        status: &SubscriptionStatus,
        plan: Option<&str>,
    ) -> anyhow::Result<Option<User>> {
        self.check()?;
        *self.writes.lock().unwrap() += 1;
        let mut users = self.users.lock().unwrap();
        let Some(user) = users.iter_mut().find(|u| u.id == user_id) else {
            return Ok(None);
        };
        user.subscription_status = status.as_str().to_string();
        if let Some(plan) = plan {
            user.plan = plan.to_string();
        }
        Ok(Some(user.clone()))
    }
}
