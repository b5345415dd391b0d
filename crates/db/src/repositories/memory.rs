use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::Utc;
use tokio::sync::RwLock;

use bakehouse_core::clients::SearchMode;
use bakehouse_core::domain::contact::phone_digits;
use bakehouse_core::domain::customer::{Customer, CustomerId, CustomerPatch, CustomerStats};
use bakehouse_core::domain::order::{Order, OrderId};

use super::{CustomerRepository, OrderRepository, RepositoryError};

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

fn unavailable(operation: &str) -> RepositoryError {
    RepositoryError::Unavailable(format!("{operation} disabled"))
}

/// Process-local customer store. Each failure switch makes the matching
/// group of operations return `RepositoryError::Unavailable`.
#[derive(Default)]
pub struct InMemoryCustomerRepository {
    customers: RwLock<HashMap<CustomerId, Customer>>,
    fail_lookups: AtomicBool,
    failing_lookups_left: AtomicUsize,
    fail_inserts: AtomicBool,
    fail_patches: AtomicBool,
    fail_stats: AtomicBool,
}

impl InMemoryCustomerRepository {
    pub fn set_fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }

    /// Fails only the next `count` lookups, then recovers.
    pub fn fail_next_lookups(&self, count: usize) {
        self.failing_lookups_left.store(count, Ordering::SeqCst);
    }

    fn lookup_unavailable(&self) -> bool {
        self.fail_lookups.load(Ordering::SeqCst)
            || self
                .failing_lookups_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_ok()
    }

    pub fn set_fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_patches(&self, fail: bool) {
        self.fail_patches.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_stats(&self, fail: bool) {
        self.fail_stats.store(fail, Ordering::SeqCst);
    }

    /// Stores a record without any uniqueness check, to model legacy rows.
    pub async fn insert_unchecked(&self, customer: Customer) {
        self.customers.write().await.insert(customer.id, customer);
    }

    async fn first_matching(
        &self,
        predicate: impl Fn(&Customer) -> bool,
    ) -> Result<Option<Customer>, RepositoryError> {
        if self.lookup_unavailable() {
            return Err(unavailable("lookups"));
        }
        let customers = self.customers.read().await;
        Ok(customers.values().filter(|c| predicate(*c)).min_by_key(|c| c.created_at).cloned())
    }

    fn email_taken(customers: &HashMap<CustomerId, Customer>, id: &CustomerId, email: &str) -> bool {
        let email = email.to_lowercase();
        customers.values().any(|other| {
            other.id != *id
                && other.email.as_deref().is_some_and(|e| e.to_lowercase() == email)
        })
    }
}

#[async_trait::async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, RepositoryError> {
        Ok(self.customers.read().await.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Customer>, RepositoryError> {
        let needle = email.trim().to_lowercase();
        self.first_matching(|c| c.email.as_deref().is_some_and(|e| e.to_lowercase() == needle))
            .await
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<Customer>, RepositoryError> {
        self.first_matching(|c| c.phone.as_deref() == Some(phone)).await
    }

    async fn find_by_phone_digits(
        &self,
        digits: &str,
    ) -> Result<Option<Customer>, RepositoryError> {
        self.first_matching(|c| {
            c.phone.as_deref().and_then(phone_digits).as_deref() == Some(digits)
        })
        .await
    }

    async fn search(&self, mode: &SearchMode) -> Result<Vec<Customer>, RepositoryError> {
        if self.lookup_unavailable() {
            return Err(unavailable("lookups"));
        }
        let customers = self.customers.read().await;
        let mut found: Vec<Customer> =
            customers.values().filter(|c| mode.matches(c)).cloned().collect();

        match mode {
            SearchMode::Recent { .. } => found.sort_by(|a, b| {
                a.last_order_date
                    .is_none()
                    .cmp(&b.last_order_date.is_none())
                    .then(b.last_order_date.cmp(&a.last_order_date))
                    .then(a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            }),
            SearchMode::Text { .. } => found.sort_by(|a, b| {
                b.total_orders
                    .cmp(&a.total_orders)
                    .then(a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            }),
        }

        found.truncate(mode.limit() as usize);
        Ok(found)
    }

    async fn list(&self, offset: u32, limit: u32) -> Result<Vec<Customer>, RepositoryError> {
        let customers = self.customers.read().await;
        let mut all: Vec<Customer> = customers.values().cloned().collect();
        all.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(all.into_iter().skip(offset as usize).take(limit as usize).collect())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(self.customers.read().await.len() as u64)
    }

    async fn list_ids(&self) -> Result<Vec<CustomerId>, RepositoryError> {
        let customers = self.customers.read().await;
        let mut all: Vec<&Customer> = customers.values().collect();
        all.sort_by_key(|c| c.created_at);
        Ok(all.into_iter().map(|c| c.id).collect())
    }

    async fn insert(&self, customer: Customer) -> Result<Customer, RepositoryError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(unavailable("inserts"));
        }
        let mut customers = self.customers.write().await;
        if let Some(email) = customer.email.as_deref() {
            if Self::email_taken(&customers, &customer.id, email) {
                return Err(RepositoryError::Conflict(format!("email `{email}` already exists")));
            }
        }
        customers.insert(customer.id, customer.clone());
        Ok(customer)
    }

    async fn apply_patch(
        &self,
        id: &CustomerId,
        patch: &CustomerPatch,
    ) -> Result<Option<Customer>, RepositoryError> {
        if self.fail_patches.load(Ordering::SeqCst) {
            return Err(unavailable("patches"));
        }
        let mut customers = self.customers.write().await;
        let Some(existing) = customers.get(id) else {
            return Ok(None);
        };

        let guarded = CustomerPatch {
            email: patch.email.clone().filter(|_| is_blank(&existing.email)),
            phone: patch.phone.clone().filter(|_| is_blank(&existing.phone)),
            whatsapp: patch.whatsapp.clone().filter(|_| is_blank(&existing.whatsapp)),
            instagram: patch.instagram.clone().filter(|_| is_blank(&existing.instagram)),
            preferred_contact: patch.preferred_contact.filter(|_| existing.preferred_contact.is_none()),
        };
        if let Some(email) = guarded.email.as_deref() {
            if Self::email_taken(&customers, id, email) {
                return Err(RepositoryError::Conflict(format!("email `{email}` already exists")));
            }
        }

        let Some(customer) = customers.get_mut(id) else {
            return Ok(None);
        };
        customer.apply_patch(&guarded, Utc::now());
        Ok(Some(customer.clone()))
    }

    async fn save_profile(&self, customer: &Customer) -> Result<Option<Customer>, RepositoryError> {
        let mut customers = self.customers.write().await;
        if !customers.contains_key(&customer.id) {
            return Ok(None);
        }
        if let Some(email) = customer.email.as_deref() {
            if Self::email_taken(&customers, &customer.id, email) {
                return Err(RepositoryError::Conflict(format!("email `{email}` already exists")));
            }
        }
        customers.insert(customer.id, customer.clone());
        Ok(Some(customer.clone()))
    }

    async fn update_stats(
        &self,
        id: &CustomerId,
        stats: &CustomerStats,
    ) -> Result<Option<Customer>, RepositoryError> {
        if self.fail_stats.load(Ordering::SeqCst) {
            return Err(unavailable("stats writes"));
        }
        let mut customers = self.customers.write().await;
        Ok(customers.get_mut(id).map(|customer| {
            customer.apply_stats(stats, Utc::now());
            customer.clone()
        }))
    }

    async fn delete(&self, id: &CustomerId) -> Result<bool, RepositoryError> {
        Ok(self.customers.write().await.remove(id).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<OrderId, Order>>,
    fail_reads: AtomicBool,
}

impl InMemoryOrderRepository {
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn check_reads(&self) -> Result<(), RepositoryError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(unavailable("order reads"));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        self.check_reads()?;
        Ok(self.orders.read().await.get(id).cloned())
    }

    async fn list_for_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<Order>, RepositoryError> {
        self.check_reads()?;
        let orders = self.orders.read().await;
        let mut history: Vec<Order> =
            orders.values().filter(|o| o.customer_id == *customer_id).cloned().collect();
        history.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.0.cmp(&b.id.0)));
        Ok(history)
    }

    async fn has_any_for_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<bool, RepositoryError> {
        self.check_reads()?;
        Ok(self.orders.read().await.values().any(|o| o.customer_id == *customer_id))
    }

    async fn insert(&self, order: Order) -> Result<Order, RepositoryError> {
        self.orders.write().await.insert(order.id, order.clone());
        Ok(order)
    }

    async fn delete(&self, id: &OrderId) -> Result<bool, RepositoryError> {
        Ok(self.orders.write().await.remove(id).is_some())
    }
}
