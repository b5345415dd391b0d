use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::contact::OrderChannel;
use crate::domain::customer::CustomerId;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub Uuid);

impl OrderId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub channel: OrderChannel,
    pub total_amount: Decimal,
    pub description: Option<String>,
    pub delivery_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Largest amount a single order may carry.
    pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

    pub fn new(
        customer_id: CustomerId,
        channel: OrderChannel,
        total_amount: Decimal,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        Self::validate_amount(total_amount)?;

        Ok(Self {
            id: OrderId::new(),
            customer_id,
            channel,
            total_amount,
            description: None,
            delivery_date: None,
            created_at,
        })
    }

    pub fn validate_amount(total_amount: Decimal) -> Result<(), DomainError> {
        if total_amount < Decimal::ZERO {
            return Err(DomainError::InvalidField {
                field: "total_amount",
                reason: format!("must not be negative (got {total_amount})"),
            });
        }
        if total_amount > Self::MAX_AMOUNT {
            return Err(DomainError::InvalidField {
                field: "total_amount",
                reason: format!("must not exceed {} (got {total_amount})", Self::MAX_AMOUNT),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::Order;
    use crate::domain::contact::OrderChannel;
    use crate::domain::customer::CustomerId;
    use crate::errors::DomainError;

    #[test]
    fn negative_amounts_are_rejected() {
        let error =
            Order::new(CustomerId::new(), OrderChannel::WalkIn, Decimal::new(-100, 2), Utc::now())
                .expect_err("negative amount");
        assert!(matches!(error, DomainError::InvalidField { field: "total_amount", .. }));
    }

    #[test]
    fn amounts_above_the_cap_are_rejected() {
        assert!(Order::validate_amount(Order::MAX_AMOUNT).is_ok());

        let error = Order::validate_amount(Decimal::MAX).expect_err("oversized amount");
        assert!(matches!(error, DomainError::InvalidField { field: "total_amount", .. }));
        assert!(Order::validate_amount(Order::MAX_AMOUNT + Decimal::new(1, 2)).is_err());
    }

    #[test]
    fn zero_amount_orders_are_allowed() {
        let order = Order::new(CustomerId::new(), OrderChannel::Email, Decimal::ZERO, Utc::now())
            .expect("free tasting order");
        assert_eq!(order.total_amount, Decimal::ZERO);
    }
}
