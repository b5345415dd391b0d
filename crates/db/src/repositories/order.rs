use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use bakehouse_core::domain::contact::OrderChannel;
use bakehouse_core::domain::customer::CustomerId;
use bakehouse_core::domain::order::{Order, OrderId};

use super::customer::{parse_date, parse_decimal, parse_timestamp, parse_uuid, DATE_FORMAT};
use super::{OrderRepository, RepositoryError};
use crate::DbPool;

pub struct SqlOrderRepository {
    pool: DbPool,
}

impl SqlOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_order(row: &SqliteRow) -> Result<Order, RepositoryError> {
    let decode = |e: sqlx::Error| RepositoryError::Decode(e.to_string());

    let id: String = row.try_get("id").map_err(decode)?;
    let customer_id: String = row.try_get("customer_id").map_err(decode)?;
    let channel: String = row.try_get("channel").map_err(decode)?;
    let total_amount: String = row.try_get("total_amount").map_err(decode)?;
    let created_at: String = row.try_get("created_at").map_err(decode)?;

    Ok(Order {
        id: OrderId(parse_uuid(&id)?),
        customer_id: CustomerId(parse_uuid(&customer_id)?),
        channel: OrderChannel::parse(&channel),
        total_amount: parse_decimal(&total_amount)?,
        description: row.try_get("description").map_err(decode)?,
        delivery_date: parse_date(row.try_get("delivery_date").map_err(decode)?)?,
        created_at: parse_timestamp(&created_at)?,
    })
}

#[async_trait::async_trait]
impl OrderRepository for SqlOrderRepository {
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, customer_id, channel, total_amount, description, delivery_date, created_at
             FROM customer_order WHERE id = ?",
        )
        .bind(id.0.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_order).transpose()
    }

    async fn list_for_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, customer_id, channel, total_amount, description, delivery_date, created_at
             FROM customer_order
             WHERE customer_id = ?
             ORDER BY created_at DESC, id ASC",
        )
        .bind(customer_id.0.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_order).collect::<Result<Vec<_>, _>>()
    }

    async fn has_any_for_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<bool, RepositoryError> {
        let exists: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM customer_order WHERE customer_id = ?)",
        )
        .bind(customer_id.0.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists != 0)
    }

    async fn insert(&self, order: Order) -> Result<Order, RepositoryError> {
        sqlx::query(
            "INSERT INTO customer_order
                 (id, customer_id, channel, total_amount, description, delivery_date, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(order.id.0.to_string())
        .bind(order.customer_id.0.to_string())
        .bind(order.channel.as_str())
        .bind(order.total_amount.to_string())
        .bind(&order.description)
        .bind(order.delivery_date.map(|d| d.format(DATE_FORMAT).to_string()))
        .bind(order.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from_write)?;

        Ok(order)
    }

    async fn delete(&self, id: &OrderId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM customer_order WHERE id = ?")
            .bind(id.0.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
