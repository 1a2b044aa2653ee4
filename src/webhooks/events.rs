use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::billing::plans::SubscriptionStatus;

pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";
pub const SUBSCRIPTION_UPDATED: &str = "customer.subscription.updated";
pub const SUBSCRIPTION_DELETED: &str = "customer.subscription.deleted";

/// Provider event envelope: `{ id, type, data: { object } }`.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EnvelopeData,
}

#[derive(Debug, Deserialize)]
pub struct EnvelopeData {
    pub object: serde_json::Value,
}

/// A reference that the provider may send as a bare id or an expanded object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Expandable {
    Id(String),
    Object { id: String },
}

impl Expandable {
    pub fn id(&self) -> &str {
        match self {
            Expandable::Id(id) => id,
            Expandable::Object { id } => id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CheckoutSessionObject {
    #[serde(default)]
    pub customer: Option<Expandable>,
    #[serde(default)]
    pub client_reference_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionObject {
    pub customer: Expandable,
    pub status: SubscriptionStatus,
    #[serde(default)]
    pub items: SubscriptionItems,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionItems {
    #[serde(default)]
    pub data: Vec<SubscriptionItem>,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionItem {
    pub price: Price,
}

#[derive(Debug, Deserialize)]
pub struct Price {
    #[serde(default)]
    pub lookup_key: Option<String>,
}

impl SubscriptionObject {
    /// Lookup key of the first line item. Subscriptions carry one item.
    pub fn lookup_key(&self) -> Option<&str> {
        if self.items.data.len() > 1 {
            warn!(
                customer = self.customer.id(),
                items = self.items.data.len(),
                "subscription has several items; using the first"
            );
        }
        self.items.data.first()?.price.lookup_key.as_deref()
    }
}

#[derive(Debug)]
pub enum BillingEvent {
    CheckoutCompleted(CheckoutSessionObject),
    SubscriptionUpdated(SubscriptionObject),
    SubscriptionDeleted(SubscriptionObject),
    Ignored(String),
}

impl BillingEvent {
    pub fn from_envelope(envelope: Envelope) -> Result<Self, serde_json::Error> {
        let object = envelope.data.object;
        Ok(match envelope.event_type.as_str() {
            CHECKOUT_SESSION_COMPLETED => {
                BillingEvent::CheckoutCompleted(serde_json::from_value(object)?)
            }
            SUBSCRIPTION_UPDATED => BillingEvent::SubscriptionUpdated(serde_json::from_value(object)?),
            SUBSCRIPTION_DELETED => BillingEvent::SubscriptionDeleted(serde_json::from_value(object)?),
            _ => BillingEvent::Ignored(envelope.event_type),
        })
    }

    /// Field changes this event asks for, if any.
    pub fn user_update(&self) -> Option<UserUpdate> {
        match self {
            BillingEvent::CheckoutCompleted(session) => {
                let mut targets = Vec::new();
                if let Some(customer) = &session.customer {
                    targets.push(UserRef::Customer(customer.id().to_string()));
                }
                if let Some(id) = session
                    .client_reference_id
                    .as_deref()
                    .and_then(|r| Uuid::parse_str(r).ok())
                {
                    targets.push(UserRef::Id(id));
                }
                if targets.is_empty() {
                    return None;
                }
                Some(UserUpdate {
                    targets,
                    status: SubscriptionStatus::Active,
                    plan: None,
                })
            }
            BillingEvent::SubscriptionUpdated(sub) => Some(UserUpdate {
                targets: vec![UserRef::Customer(sub.customer.id().to_string())],
                status: sub.status.clone(),
                plan: sub.lookup_key().map(str::to_string),
            }),
            BillingEvent::SubscriptionDeleted(sub) => Some(UserUpdate {
                targets: vec![UserRef::Customer(sub.customer.id().to_string())],
                status: sub.status.clone(),
                plan: None,
            }),
            BillingEvent::Ignored(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRef {
    Customer(String),
    Id(Uuid),
}

/// Row change for one user; `plan: None` leaves the plan as is.
///
/// `targets` are tried in order and the first known user gets the change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserUpdate {
    pub targets: Vec<UserRef>,
    pub status: SubscriptionStatus,
    pub plan: Option<String>,
}
