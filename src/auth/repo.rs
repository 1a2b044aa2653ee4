use crate::auth::repo_types::User;
use crate::billing::plans::SubscriptionStatus;
use sqlx::PgPool;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, email, password_hash, plan, external_customer_id, \
                            subscription_status, created_at, updated_at";

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Find the user owning a billing provider customer.
    pub async fn find_by_external_customer_id(
        db: &PgPool,
        customer_id: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE external_customer_id = $1"
        ))
        .bind(customer_id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new user; the customer id is fixed from here on.
    pub async fn create(
        db: &PgPool,
        email: &str,
        password_hash: &str,
        plan: &str,
        external_customer_id: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, plan, external_customer_id, subscription_status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(email)
        .bind(password_hash)
        .bind(plan)
        .bind(external_customer_id)
        .bind(SubscriptionStatus::Incomplete.as_str())
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Write the status and, when given, the plan. Returns the updated row.
    ///
    /// Concurrent deliveries for one user are last-write-wins.
    pub async fn update_subscription(
        db: &PgPool,
        id: Uuid,
        status: &SubscriptionStatus,
        plan: Option<&str>,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET subscription_status = $2,
                plan = COALESCE($3, plan),
                updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(plan)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }
}
