use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use bakehouse_core::clients::SearchMode;
use bakehouse_core::domain::contact::{phone_digits, ContactChannel};
use bakehouse_core::domain::customer::{Customer, CustomerId, CustomerPatch, CustomerStats};

use super::{CustomerRepository, RepositoryError};
use crate::DbPool;

const CUSTOMER_COLUMNS: &str = "id, name, email, phone, whatsapp, instagram, preferred_contact, \
     notes, total_orders, total_spent, first_order_date, last_order_date, created_at, updated_at";

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SqlCustomerRepository {
    pool: DbPool,
}

impl SqlCustomerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(
        &self,
        predicate: &str,
        value: &str,
    ) -> Result<Option<Customer>, RepositoryError> {
        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customer WHERE {predicate}
             ORDER BY created_at ASC LIMIT 1"
        );
        let row = sqlx::query(&sql).bind(value).fetch_optional(&self.pool).await?;
        row.as_ref().map(row_to_customer).transpose()
    }
}

fn decode_err(error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("invalid timestamp `{raw}`: {e}")))
}

pub(crate) fn parse_date(raw: Option<String>) -> Result<Option<NaiveDate>, RepositoryError> {
    raw.map(|value| {
        NaiveDate::parse_from_str(&value, DATE_FORMAT)
            .map_err(|e| RepositoryError::Decode(format!("invalid date `{value}`: {e}")))
    })
    .transpose()
}

pub(crate) fn parse_decimal(raw: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(raw.trim())
        .map_err(|e| RepositoryError::Decode(format!("invalid decimal `{raw}`: {e}")))
}

pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(raw).map_err(|e| RepositoryError::Decode(format!("invalid id `{raw}`: {e}")))
}

fn row_to_customer(row: &SqliteRow) -> Result<Customer, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_err)?;
    let preferred_contact: Option<String> =
        row.try_get("preferred_contact").map_err(decode_err)?;
    let total_orders: i64 = row.try_get("total_orders").map_err(decode_err)?;
    let total_spent: String = row.try_get("total_spent").map_err(decode_err)?;
    let created_at: String = row.try_get("created_at").map_err(decode_err)?;
    let updated_at: String = row.try_get("updated_at").map_err(decode_err)?;

    let preferred_contact = match preferred_contact {
        Some(raw) => Some(ContactChannel::parse(&raw).ok_or_else(|| {
            RepositoryError::Decode(format!("unknown preferred contact `{raw}`"))
        })?),
        None => None,
    };

    Ok(Customer {
        id: CustomerId(parse_uuid(&id)?),
        name: row.try_get("name").map_err(decode_err)?,
        email: row.try_get("email").map_err(decode_err)?,
        phone: row.try_get("phone").map_err(decode_err)?,
        whatsapp: row.try_get("whatsapp").map_err(decode_err)?,
        instagram: row.try_get("instagram").map_err(decode_err)?,
        preferred_contact,
        notes: row.try_get("notes").map_err(decode_err)?,
        total_orders: u32::try_from(total_orders).map_err(decode_err)?,
        total_spent: parse_decimal(&total_spent)?,
        first_order_date: parse_date(row.try_get("first_order_date").map_err(decode_err)?)?,
        last_order_date: parse_date(row.try_get("last_order_date").map_err(decode_err)?)?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn format_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format(DATE_FORMAT).to_string())
}

#[async_trait::async_trait]
impl CustomerRepository for SqlCustomerRepository {
    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, RepositoryError> {
        self.fetch_one_where("id = ?", &id.0.to_string()).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Customer>, RepositoryError> {
        self.fetch_one_where("email = ? COLLATE NOCASE", email.trim()).await
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<Customer>, RepositoryError> {
        self.fetch_one_where("phone = ?", phone).await
    }

    async fn find_by_phone_digits(
        &self,
        digits: &str,
    ) -> Result<Option<Customer>, RepositoryError> {
        self.fetch_one_where("phone_digits = ?", digits).await
    }

    async fn search(&self, mode: &SearchMode) -> Result<Vec<Customer>, RepositoryError> {
        let rows = match mode {
            SearchMode::Recent { limit } => {
                let sql = format!(
                    "SELECT {CUSTOMER_COLUMNS} FROM customer
                     ORDER BY last_order_date IS NULL, last_order_date DESC, name COLLATE NOCASE ASC
                     LIMIT ?"
                );
                sqlx::query(&sql).bind(*limit).fetch_all(&self.pool).await?
            }
            SearchMode::Text { like_pattern, limit, .. } => {
                let sql = format!(
                    "SELECT {CUSTOMER_COLUMNS} FROM customer
                     WHERE name LIKE ?1 ESCAPE '\\'
                        OR email LIKE ?1 ESCAPE '\\'
                        OR phone LIKE ?1 ESCAPE '\\'
                     ORDER BY total_orders DESC, name COLLATE NOCASE ASC
                     LIMIT ?2"
                );
                sqlx::query(&sql).bind(like_pattern).bind(*limit).fetch_all(&self.pool).await?
            }
        };

        rows.iter().map(row_to_customer).collect::<Result<Vec<_>, _>>()
    }

    async fn list(&self, offset: u32, limit: u32) -> Result<Vec<Customer>, RepositoryError> {
        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customer
             ORDER BY name COLLATE NOCASE ASC, created_at ASC
             LIMIT ? OFFSET ?"
        );
        let rows = sqlx::query(&sql).bind(limit).bind(offset).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_customer).collect::<Result<Vec<_>, _>>()
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM customer").fetch_one(&self.pool).await?;
        u64::try_from(count).map_err(decode_err)
    }

    async fn list_ids(&self) -> Result<Vec<CustomerId>, RepositoryError> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM customer ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        ids.iter().map(|id| parse_uuid(id).map(CustomerId)).collect()
    }

    async fn insert(&self, customer: Customer) -> Result<Customer, RepositoryError> {
        let digits = customer.phone.as_deref().and_then(phone_digits);

        sqlx::query(
            "INSERT INTO customer (id, name, email, phone, phone_digits, whatsapp, instagram,
                                   preferred_contact, notes, total_orders, total_spent,
                                   first_order_date, last_order_date, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(customer.id.0.to_string())
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&digits)
        .bind(&customer.whatsapp)
        .bind(&customer.instagram)
        .bind(customer.preferred_contact.map(|c| c.as_str()))
        .bind(&customer.notes)
        .bind(i64::from(customer.total_orders))
        .bind(customer.total_spent.to_string())
        .bind(format_date(customer.first_order_date))
        .bind(format_date(customer.last_order_date))
        .bind(customer.created_at.to_rfc3339())
        .bind(customer.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from_write)?;

        Ok(customer)
    }

    async fn apply_patch(
        &self,
        id: &CustomerId,
        patch: &CustomerPatch,
    ) -> Result<Option<Customer>, RepositoryError> {
        let digits = patch.phone.as_deref().and_then(phone_digits);
        let sql = format!(
            "UPDATE customer SET
                 email = CASE WHEN ?2 IS NOT NULL AND (email IS NULL OR TRIM(email) = '')
                              THEN ?2 ELSE email END,
                 phone_digits = CASE WHEN ?3 IS NOT NULL AND (phone IS NULL OR TRIM(phone) = '')
                                     THEN ?4 ELSE phone_digits END,
                 phone = CASE WHEN ?3 IS NOT NULL AND (phone IS NULL OR TRIM(phone) = '')
                              THEN ?3 ELSE phone END,
                 whatsapp = CASE WHEN ?5 IS NOT NULL AND (whatsapp IS NULL OR TRIM(whatsapp) = '')
                                 THEN ?5 ELSE whatsapp END,
                 instagram = CASE WHEN ?6 IS NOT NULL AND (instagram IS NULL OR TRIM(instagram) = '')
                                  THEN ?6 ELSE instagram END,
                 preferred_contact = CASE WHEN ?7 IS NOT NULL AND preferred_contact IS NULL
                                          THEN ?7 ELSE preferred_contact END,
                 updated_at = ?8
             WHERE id = ?1
             RETURNING {CUSTOMER_COLUMNS}"
        );

        let row = sqlx::query(&sql)
            .bind(id.0.to_string())
            .bind(&patch.email)
            .bind(&patch.phone)
            .bind(&digits)
            .bind(&patch.whatsapp)
            .bind(&patch.instagram)
            .bind(patch.preferred_contact.map(|c| c.as_str()))
            .bind(Utc::now().to_rfc3339())
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from_write)?;

        row.as_ref().map(row_to_customer).transpose()
    }

    async fn save_profile(&self, customer: &Customer) -> Result<Option<Customer>, RepositoryError> {
        let digits = customer.phone.as_deref().and_then(phone_digits);
        let sql = format!(
            "UPDATE customer SET
                 name = ?2, notes = ?3, email = ?4, phone = ?5, phone_digits = ?6,
                 whatsapp = ?7, instagram = ?8, preferred_contact = ?9, updated_at = ?10
             WHERE id = ?1
             RETURNING {CUSTOMER_COLUMNS}"
        );

        let row = sqlx::query(&sql)
            .bind(customer.id.0.to_string())
            .bind(&customer.name)
            .bind(&customer.notes)
            .bind(&customer.email)
            .bind(&customer.phone)
            .bind(&digits)
            .bind(&customer.whatsapp)
            .bind(&customer.instagram)
            .bind(customer.preferred_contact.map(|c| c.as_str()))
            .bind(customer.updated_at.to_rfc3339())
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from_write)?;

        row.as_ref().map(row_to_customer).transpose()
    }

    async fn update_stats(
        &self,
        id: &CustomerId,
        stats: &CustomerStats,
    ) -> Result<Option<Customer>, RepositoryError> {
        let sql = format!(
            "UPDATE customer SET
                 total_orders = ?2, total_spent = ?3, first_order_date = ?4,
                 last_order_date = ?5, updated_at = ?6
             WHERE id = ?1
             RETURNING {CUSTOMER_COLUMNS}"
        );

        let row = sqlx::query(&sql)
            .bind(id.0.to_string())
            .bind(i64::from(stats.total_orders))
            .bind(stats.total_spent.to_string())
            .bind(format_date(stats.first_order_date))
            .bind(format_date(stats.last_order_date))
            .bind(Utc::now().to_rfc3339())
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from_write)?;

        row.as_ref().map(row_to_customer).transpose()
    }

    async fn delete(&self, id: &CustomerId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM customer WHERE id = ?")
            .bind(id.0.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
