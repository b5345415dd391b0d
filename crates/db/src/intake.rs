use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use bakehouse_core::domain::contact::{non_blank, ContactInfo, OrderChannel};
use bakehouse_core::domain::customer::Customer;
use bakehouse_core::domain::order::{Order, OrderId};

use crate::directory::{ClientDirectory, DirectoryError};

/// An order as submitted by a storefront or back-office form.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct OrderIntake {
    pub contact: ContactInfo,
    #[serde(default)]
    pub channel: Option<OrderChannel>,
    pub total_amount: Decimal,
    #[serde(default)]
    pub delivery_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RecordedOrder {
    pub customer: Customer,
    pub order: Order,
    pub is_new_customer: bool,
}

impl ClientDirectory {
    /// Resolves the customer, stores the order and refreshes the customer's
    /// aggregates.
    pub async fn record_order(&self, intake: &OrderIntake) -> Result<RecordedOrder, DirectoryError> {
        Order::validate_amount(intake.total_amount)?;

        let resolved = self.find_or_create(&intake.contact, intake.channel).await?;

        let mut order = Order::new(
            resolved.customer.id,
            intake.channel.unwrap_or(OrderChannel::Other),
            intake.total_amount,
            Utc::now(),
        )?;
        order.delivery_date = intake.delivery_date;
        order.description = non_blank(intake.description.as_deref());

        let order = self.orders().insert(order).await?;
        info!(
            event_name = "orders.recorded",
            order_id = %order.id,
            customer_id = %order.customer_id,
            is_new_customer = resolved.is_new,
            "order recorded"
        );

        let customer = self.update_stats(&order.customer_id).await?;
        Ok(RecordedOrder { customer, order, is_new_customer: resolved.is_new })
    }

    /// Deletes an order and returns its customer with refreshed aggregates.
    pub async fn remove_order(&self, id: &OrderId) -> Result<Customer, DirectoryError> {
        let order = self
            .orders()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DirectoryError::NotFound { entity: "order", id: id.to_string() })?;

        if !self.orders().delete(id).await? {
            return Err(DirectoryError::NotFound { entity: "order", id: id.to_string() });
        }
        info!(
            event_name = "orders.removed",
            order_id = %id,
            customer_id = %order.customer_id,
            "order removed"
        );

        self.update_stats(&order.customer_id).await
    }
}
