use std::sync::Arc;

use sqlx::Executor;
use uuid::Uuid;

use bakehouse_core::config::ClientsConfig;
use bakehouse_core::domain::customer::CustomerId;

use crate::connection::DbPool;
use crate::directory::{ClientDirectory, DirectoryError};
use crate::repositories::{RepositoryError, SqlCustomerRepository, SqlOrderRepository};

/// Canonical demo clients with the aggregates their seeded orders produce.
const SEED_CLIENTS: &[SeedClientContract] = &[
    SeedClientContract {
        id: "00000000-0000-4000-8000-000000000001",
        name: "Léa Martin",
        expected_orders: 2,
        expected_spent: "57.50",
    },
    SeedClientContract {
        id: "00000000-0000-4000-8000-000000000002",
        name: "Hugo Favre",
        expected_orders: 1,
        expected_spent: "28.90",
    },
    SeedClientContract {
        id: "00000000-0000-4000-8000-000000000003",
        name: "Café du Lac",
        expected_orders: 3,
        expected_spent: "335.75",
    },
    SeedClientContract {
        id: "00000000-0000-4000-8000-000000000004",
        name: "Noor",
        expected_orders: 0,
        expected_spent: "0",
    },
];

const SEED_ORDER_COUNT: i64 = 6;

/// Demo dataset for local development and smoke tests.
pub struct BakerySeedDataset;

impl BakerySeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/bakery_seed_data.sql");

    /// Loads the fixtures and recomputes the seeded clients' aggregates.
    /// Loading twice leaves the same state.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, DirectoryError> {
        let mut tx = pool.begin().await.map_err(RepositoryError::from)?;
        tx.execute(sqlx::query(Self::SQL)).await.map_err(RepositoryError::from)?;
        tx.commit().await.map_err(RepositoryError::from)?;

        let directory = ClientDirectory::new(
            Arc::new(SqlCustomerRepository::new(pool.clone())),
            Arc::new(SqlOrderRepository::new(pool.clone())),
            ClientsConfig::default(),
        );

        let mut clients_seeded = Vec::with_capacity(SEED_CLIENTS.len());
        for client in SEED_CLIENTS {
            let id = client.customer_id()?;
            let refreshed = directory.update_stats(&id).await?;
            clients_seeded.push(ClientSeedInfo {
                id: client.id,
                name: client.name,
                total_orders: refreshed.total_orders,
            });
        }

        Ok(SeedResult { clients_seeded })
    }

    /// Checks that every seeded client exists with the expected aggregates.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let quoted_clients = sql_array_from_ids(SEED_CLIENTS.iter().map(|c| c.id));
        let order_count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM customer_order WHERE customer_id IN {quoted_clients}"
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("orders", order_count == SEED_ORDER_COUNT));

        for client in SEED_CLIENTS {
            let matches: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM customer
                               WHERE id = ?1 AND name = ?2 AND total_orders = ?3 AND total_spent = ?4)",
            )
            .bind(client.id)
            .bind(client.name)
            .bind(client.expected_orders)
            .bind(client.expected_spent)
            .fetch_one(pool)
            .await?;
            checks.push((client.name, matches == 1));
        }

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    /// Removes the seeded rows, orders first.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let quoted_clients = sql_array_from_ids(SEED_CLIENTS.iter().map(|c| c.id));
        let mut tx = pool.begin().await?;

        sqlx::query(&format!("DELETE FROM customer_order WHERE customer_id IN {quoted_clients}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM customer WHERE id IN {quoted_clients}"))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedClientContract {
    id: &'static str,
    name: &'static str,
    expected_orders: i64,
    expected_spent: &'static str,
}

impl SeedClientContract {
    fn customer_id(&self) -> Result<CustomerId, RepositoryError> {
        Uuid::parse_str(self.id)
            .map(CustomerId)
            .map_err(|e| RepositoryError::Decode(format!("seed id `{}`: {e}", self.id)))
    }
}

fn sql_array_from_ids<'a>(ids: impl Iterator<Item = &'a str>) -> String {
    let quoted = ids.map(|id| format!("'{id}'")).collect::<Vec<_>>().join(", ");
    format!("({quoted})")
}

#[derive(Debug)]
pub struct SeedResult {
    pub clients_seeded: Vec<ClientSeedInfo>,
}

#[derive(Debug)]
pub struct ClientSeedInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub total_orders: u32,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
