use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::domain::contact::{non_blank, ContactChannel};
use crate::domain::order::Order;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub Uuid);

impl CustomerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CustomerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A deduplicated contact record. The aggregate fields are a projection of
/// the customer's orders and are only ever replaced wholesale.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub whatsapp: Option<String>,
    pub instagram: Option<String>,
    pub preferred_contact: Option<ContactChannel>,
    pub notes: String,
    pub total_orders: u32,
    pub total_spent: Decimal,
    pub first_order_date: Option<NaiveDate>,
    pub last_order_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn stats(&self) -> CustomerStats {
        CustomerStats {
            total_orders: self.total_orders,
            total_spent: self.total_spent,
            first_order_date: self.first_order_date,
            last_order_date: self.last_order_date,
        }
    }

    pub fn apply_stats(&mut self, stats: &CustomerStats, now: DateTime<Utc>) {
        self.total_orders = stats.total_orders;
        self.total_spent = stats.total_spent;
        self.first_order_date = stats.first_order_date;
        self.last_order_date = stats.last_order_date;
        self.updated_at = now;
    }

    pub fn apply_patch(&mut self, patch: &CustomerPatch, now: DateTime<Utc>) {
        if let Some(email) = &patch.email {
            self.email = Some(email.clone());
        }
        if let Some(phone) = &patch.phone {
            self.phone = Some(phone.clone());
        }
        if let Some(whatsapp) = &patch.whatsapp {
            self.whatsapp = Some(whatsapp.clone());
        }
        if let Some(instagram) = &patch.instagram {
            self.instagram = Some(instagram.clone());
        }
        if let Some(preferred_contact) = patch.preferred_contact {
            self.preferred_contact = Some(preferred_contact);
        }
        self.updated_at = now;
    }
}

/// Fields staged for back-fill on an existing customer. Every set field
/// targets a column that is currently empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerPatch {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub whatsapp: Option<String>,
    pub instagram: Option<String>,
    pub preferred_contact: Option<ContactChannel>,
}

impl CustomerPatch {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.phone.is_none()
            && self.whatsapp.is_none()
            && self.instagram.is_none()
            && self.preferred_contact.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerStats {
    pub total_orders: u32,
    pub total_spent: Decimal,
    pub first_order_date: Option<NaiveDate>,
    pub last_order_date: Option<NaiveDate>,
}

impl CustomerStats {
    pub fn empty() -> Self {
        Self {
            total_orders: 0,
            total_spent: Decimal::ZERO,
            first_order_date: None,
            last_order_date: None,
        }
    }

    /// Recomputes the projection from the full order history. Dates are the
    /// UTC calendar day of the earliest and latest order creation.
    pub fn from_orders(orders: &[Order]) -> Result<Self, DomainError> {
        if orders.is_empty() {
            return Ok(Self::empty());
        }

        let sum = orders.iter().try_fold(Decimal::ZERO, |acc, order| {
            acc.checked_add(order.total_amount).ok_or_else(|| {
                DomainError::InvariantViolation(format!(
                    "order total overflowed while summing order {}",
                    order.id
                ))
            })
        })?;
        let mut total_spent = sum.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        total_spent.rescale(2);
        if total_spent.scale() != 2 {
            return Err(DomainError::InvariantViolation(format!(
                "order total {sum} cannot be represented with two fraction digits"
            )));
        }

        let first = orders.iter().map(|order| order.created_at).min();
        let last = orders.iter().map(|order| order.created_at).max();

        Ok(Self {
            total_orders: u32::try_from(orders.len()).unwrap_or(u32::MAX),
            total_spent,
            first_order_date: first.map(|at| at.date_naive()),
            last_order_date: last.map(|at| at.date_naive()),
        })
    }
}

/// Explicit edit from the admin dashboard. Unlike enrichment, these values
/// overwrite; a blank contact value clears the field and an explicit
/// `"preferred_contact": null` clears the preference.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub whatsapp: Option<String>,
    #[serde(default)]
    pub instagram: Option<String>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub preferred_contact: Option<Option<ContactChannel>>,
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent key (`None`).
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl ProfileUpdate {
    pub fn apply(&self, customer: &Customer, now: DateTime<Utc>) -> Result<Customer, DomainError> {
        let mut updated = customer.clone();

        if let Some(name) = &self.name {
            updated.name = non_blank(Some(name.as_str())).ok_or(DomainError::InvalidField {
                field: "name",
                reason: "must not be blank".to_string(),
            })?;
        }
        if let Some(notes) = &self.notes {
            updated.notes = notes.clone();
        }
        if let Some(email) = &self.email {
            updated.email = non_blank(Some(email.as_str()));
        }
        if let Some(phone) = &self.phone {
            updated.phone = non_blank(Some(phone.as_str()));
        }
        if let Some(whatsapp) = &self.whatsapp {
            updated.whatsapp = non_blank(Some(whatsapp.as_str()));
        }
        if let Some(instagram) = &self.instagram {
            updated.instagram = non_blank(Some(instagram.as_str()));
        }
        if let Some(preferred_contact) = self.preferred_contact {
            updated.preferred_contact = preferred_contact;
        }

        if updated.email.is_none() && updated.phone.is_none() && updated.instagram.is_none() {
            return Err(DomainError::MissingContact);
        }

        updated.updated_at = now;
        Ok(updated)
    }
}

/// Result of a guarded delete. A refusal is an expected outcome, so it is a
/// value rather than an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeleteClientOutcome {
    Deleted,
    Blocked(String),
    NotFound,
}

impl DeleteClientOutcome {
    pub fn success(&self) -> bool {
        matches!(self, Self::Deleted)
    }

    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Deleted => None,
            Self::Blocked(message) => Some(message.clone()),
            Self::NotFound => Some("client not found".to_string()),
        }
    }
}

impl Serialize for DeleteClientOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let error = self.error_message();
        let mut state = serializer
            .serialize_struct("DeleteClientOutcome", if error.is_some() { 2 } else { 1 })?;
        state.serialize_field("success", &self.success())?;
        if let Some(error) = error {
            state.serialize_field("error", &error)?;
        }
        state.end()
    }
}
