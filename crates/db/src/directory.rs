//! Client directory service.
//!
//! Orchestrates identity resolution, enrichment, statistics recompute,
//! search and guarded deletion on top of the repository traits.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use bakehouse_core::clients::{build_new_customer, diff_contact, SearchRequest};
use bakehouse_core::config::{ClientsConfig, LookupPolicy, PhoneMatching};
use bakehouse_core::domain::contact::{phone_digits, ContactInfo, OrderChannel};
use bakehouse_core::domain::customer::{
    Customer, CustomerId, CustomerStats, DeleteClientOutcome, ProfileUpdate,
};
use bakehouse_core::domain::order::Order;
use bakehouse_core::errors::{ApplicationError, DomainError};
use bakehouse_core::ClientSearchResult;

use crate::repositories::{CustomerRepository, OrderRepository, RepositoryError};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error("client lookup failed: {0}")]
    Lookup(#[source] RepositoryError),
    #[error("client creation failed: {0}")]
    Creation(#[source] RepositoryError),
    #[error("client statistics write failed: {0}")]
    StatsWrite(#[source] RepositoryError),
    #[error("{entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<DirectoryError> for ApplicationError {
    fn from(error: DirectoryError) -> Self {
        match error {
            DirectoryError::Validation(error) => Self::Domain(error),
            DirectoryError::NotFound { .. } => Self::NotFound(error.to_string()),
            DirectoryError::Conflict(message) => Self::Conflict(message),
            DirectoryError::Creation(RepositoryError::Conflict(message)) => {
                Self::Conflict(format!("client creation conflicted: {message}"))
            }
            DirectoryError::Lookup(_)
            | DirectoryError::Creation(_)
            | DirectoryError::StatsWrite(_)
            | DirectoryError::Repository(_) => Self::Persistence(error.to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedClient {
    pub customer: Customer,
    pub is_new: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ClientPage {
    pub items: Vec<Customer>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}

#[derive(Clone)]
pub struct ClientDirectory {
    customers: Arc<dyn CustomerRepository>,
    orders: Arc<dyn OrderRepository>,
    settings: ClientsConfig,
}

impl ClientDirectory {
    pub fn new(
        customers: Arc<dyn CustomerRepository>,
        orders: Arc<dyn OrderRepository>,
        settings: ClientsConfig,
    ) -> Self {
        Self { customers, orders, settings }
    }

    pub fn settings(&self) -> &ClientsConfig {
        &self.settings
    }

    pub(crate) fn orders(&self) -> &Arc<dyn OrderRepository> {
        &self.orders
    }

    /// Resolves contact info to a single customer, creating one when no
    /// existing record matches on email or phone.
    pub async fn find_or_create(
        &self,
        contact: &ContactInfo,
        channel: Option<OrderChannel>,
    ) -> Result<ResolvedClient, DirectoryError> {
        let contact = contact.normalized();
        if !contact.has_reachable_contact() {
            return Err(DomainError::MissingContact.into());
        }

        if let Some(existing) = self.find_match(&contact, self.settings.lookup_policy).await? {
            return Ok(self.enrich(existing, &contact, channel).await);
        }

        let candidate = build_new_customer(&contact, channel, Utc::now())?;
        match self.customers.insert(candidate).await {
            Ok(customer) => {
                info!(
                    event_name = "clients.created",
                    customer_id = %customer.id,
                    preferred_contact = customer.preferred_contact.map(|c| c.as_str()),
                    "client created"
                );
                Ok(ResolvedClient { customer, is_new: true })
            }
            Err(RepositoryError::Conflict(message)) => {
                debug!(
                    event_name = "clients.create.conflict",
                    reason = %message,
                    "client insert conflicted, retrying as match"
                );
                match self.find_match(&contact, LookupPolicy::FailClosed).await {
                    Ok(Some(existing)) => Ok(self.enrich(existing, &contact, channel).await),
                    Ok(None) => Err(DirectoryError::Creation(RepositoryError::Conflict(message))),
                    Err(DirectoryError::Lookup(error)) => Err(DirectoryError::Creation(error)),
                    Err(other) => Err(other),
                }
            }
            Err(error) => Err(DirectoryError::Creation(error)),
        }
    }

    async fn find_match(
        &self,
        contact: &ContactInfo,
        policy: LookupPolicy,
    ) -> Result<Option<Customer>, DirectoryError> {
        if let Some(email) = contact.email.as_deref() {
            let found = self.customers.find_by_email(email).await;
            if let Some(customer) = Self::settle_lookup(found, "email", policy)? {
                return Ok(Some(customer));
            }
        }

        if let Some(phone) = contact.phone.as_deref() {
            let found = match self.settings.phone_matching {
                PhoneMatching::Verbatim => self.customers.find_by_phone(phone).await,
                PhoneMatching::Digits => match phone_digits(phone) {
                    Some(digits) => self.customers.find_by_phone_digits(&digits).await,
                    None => Ok(None),
                },
            };
            if let Some(customer) = Self::settle_lookup(found, "phone", policy)? {
                return Ok(Some(customer));
            }
        }

        Ok(None)
    }

    fn settle_lookup(
        found: Result<Option<Customer>, RepositoryError>,
        field: &'static str,
        policy: LookupPolicy,
    ) -> Result<Option<Customer>, DirectoryError> {
        match found {
            Ok(customer) => Ok(customer),
            Err(error) => match policy {
                LookupPolicy::FailOpen => {
                    warn!(
                        event_name = "clients.match.lookup_failed",
                        field,
                        error = %error,
                        "client lookup failed, treating as no match"
                    );
                    Ok(None)
                }
                LookupPolicy::FailClosed => Err(DirectoryError::Lookup(error)),
            },
        }
    }

    async fn enrich(
        &self,
        existing: Customer,
        contact: &ContactInfo,
        channel: Option<OrderChannel>,
    ) -> ResolvedClient {
        let Some(patch) = diff_contact(&existing, contact, channel) else {
            return ResolvedClient { customer: existing, is_new: false };
        };

        match self.customers.apply_patch(&existing.id, &patch).await {
            Ok(Some(customer)) => {
                debug!(
                    event_name = "clients.enriched",
                    customer_id = %customer.id,
                    "client contact fields back-filled"
                );
                ResolvedClient { customer, is_new: false }
            }
            Ok(None) => {
                warn!(
                    event_name = "clients.enrich.write_failed",
                    customer_id = %existing.id,
                    "client vanished before enrichment"
                );
                ResolvedClient { customer: existing, is_new: false }
            }
            Err(error) => {
                warn!(
                    event_name = "clients.enrich.write_failed",
                    customer_id = %existing.id,
                    error = %error,
                    "client enrichment failed, returning unpatched record"
                );
                ResolvedClient { customer: existing, is_new: false }
            }
        }
    }

    /// Recomputes the aggregate columns from the full order history.
    pub async fn update_stats(&self, id: &CustomerId) -> Result<Customer, DirectoryError> {
        let orders = self.orders.list_for_customer(id).await?;
        let stats = CustomerStats::from_orders(&orders)?;

        let updated = self
            .customers
            .update_stats(id, &stats)
            .await
            .map_err(DirectoryError::StatsWrite)?
            .ok_or_else(|| DirectoryError::NotFound { entity: "client", id: id.to_string() })?;

        info!(
            event_name = "clients.stats.recomputed",
            customer_id = %id,
            total_orders = stats.total_orders,
            total_spent = %stats.total_spent,
            "client statistics recomputed"
        );
        Ok(updated)
    }

    /// Recomputes every customer and returns how many were refreshed.
    pub async fn recompute_all(&self) -> Result<usize, DirectoryError> {
        let ids = self.customers.list_ids().await?;
        let mut refreshed = 0;
        for id in &ids {
            match self.update_stats(id).await {
                Ok(_) => refreshed += 1,
                // Deleted between listing and recompute.
                Err(DirectoryError::NotFound { .. }) => {}
                Err(error) => return Err(error),
            }
        }
        Ok(refreshed)
    }

    pub async fn search(
        &self,
        query: &str,
        limit: Option<u32>,
    ) -> Result<Vec<ClientSearchResult>, DirectoryError> {
        let mode = SearchRequest::new(query, limit)
            .mode(self.settings.search_default_limit, self.settings.search_max_limit);
        let customers = self.customers.search(&mode).await?;
        Ok(customers.iter().map(ClientSearchResult::from).collect())
    }

    pub async fn get(&self, id: &CustomerId) -> Result<Option<Customer>, DirectoryError> {
        Ok(self.customers.find_by_id(id).await?)
    }

    /// One-based page of customers ordered by name.
    pub async fn list(&self, page: u32, per_page: u32) -> Result<ClientPage, DirectoryError> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, self.settings.search_max_limit.max(1));
        let offset = (page - 1).saturating_mul(per_page);

        let items = self.customers.list(offset, per_page).await?;
        let total = self.customers.count().await?;
        Ok(ClientPage { items, page, per_page, total })
    }

    pub async fn orders_for(&self, id: &CustomerId) -> Result<Vec<Order>, DirectoryError> {
        Ok(self.orders.list_for_customer(id).await?)
    }

    /// Explicit admin edit. Aggregates are not editable here.
    pub async fn update_profile(
        &self,
        id: &CustomerId,
        update: &ProfileUpdate,
    ) -> Result<Customer, DirectoryError> {
        let not_found = || DirectoryError::NotFound { entity: "client", id: id.to_string() };

        let existing = self.customers.find_by_id(id).await?.ok_or_else(not_found)?;
        let edited = update.apply(&existing, Utc::now())?;

        match self.customers.save_profile(&edited).await {
            Ok(Some(saved)) => {
                info!(event_name = "clients.profile.updated", customer_id = %id, "client profile updated");
                Ok(saved)
            }
            Ok(None) => Err(not_found()),
            Err(RepositoryError::Conflict(_)) => Err(DirectoryError::Conflict(format!(
                "email `{}` is already used by another client",
                edited.email.as_deref().unwrap_or_default()
            ))),
            Err(error) => Err(error.into()),
        }
    }

    /// Deletes a customer that owns no orders.
    pub async fn delete(&self, id: &CustomerId) -> Result<DeleteClientOutcome, DirectoryError> {
        if self.orders.has_any_for_customer(id).await? {
            info!(event_name = "clients.delete.blocked", customer_id = %id, "client delete refused");
            return Ok(DeleteClientOutcome::Blocked(
                "cannot delete a client with existing orders".to_string(),
            ));
        }

        if self.customers.delete(id).await? {
            info!(event_name = "clients.deleted", customer_id = %id, "client deleted");
            Ok(DeleteClientOutcome::Deleted)
        } else {
            Ok(DeleteClientOutcome::NotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use bakehouse_core::config::{ClientsConfig, LookupPolicy, PhoneMatching};
    use bakehouse_core::domain::contact::{ContactChannel, ContactInfo, OrderChannel};
    use bakehouse_core::clients::build_new_customer;
    use bakehouse_core::domain::customer::{
        Customer, CustomerId, DeleteClientOutcome, ProfileUpdate,
    };
    use bakehouse_core::domain::order::Order;
    use bakehouse_core::errors::DomainError;

    use super::{ClientDirectory, DirectoryError};
    use crate::repositories::{
        CustomerRepository, InMemoryCustomerRepository, InMemoryOrderRepository, OrderRepository,
        RepositoryError, SqlCustomerRepository, SqlOrderRepository,
    };
    use crate::{connect_with_settings, migrations};

    struct Harness {
        customers: Arc<InMemoryCustomerRepository>,
        orders: Arc<InMemoryOrderRepository>,
        directory: ClientDirectory,
    }

    fn harness_with(settings: ClientsConfig) -> Harness {
        let customers = Arc::new(InMemoryCustomerRepository::default());
        let orders = Arc::new(InMemoryOrderRepository::default());
        let directory = ClientDirectory::new(customers.clone(), orders.clone(), settings);
        Harness { customers, orders, directory }
    }

    fn harness() -> Harness {
        harness_with(ClientsConfig::default())
    }

    fn email(value: &str) -> ContactInfo {
        ContactInfo { email: Some(value.to_string()), ..ContactInfo::default() }
    }

    fn phone(value: &str) -> ContactInfo {
        ContactInfo { phone: Some(value.to_string()), ..ContactInfo::default() }
    }

    async fn place_order(h: &Harness, customer_id: CustomerId, cents: i64, day: u32) -> Order {
        let at = Utc.with_ymd_and_hms(2026, 6, day, 10, 0, 0).single().expect("timestamp");
        let order = Order::new(customer_id, OrderChannel::WalkIn, Decimal::new(cents, 2), at)
            .expect("order");
        h.orders.insert(order).await.expect("insert order")
    }

    #[tokio::test]
    async fn missing_contact_is_a_validation_error() {
        let h = harness();
        let contact = ContactInfo {
            name: Some("Nobody".to_string()),
            whatsapp: Some("+41790000000".to_string()),
            ..ContactInfo::default()
        };

        let error = h.directory.find_or_create(&contact, None).await.expect_err("invalid");
        assert!(matches!(error, DirectoryError::Validation(DomainError::MissingContact)));
        assert_eq!(h.customers.count().await.expect("count"), 0);
    }

    #[tokio::test]
    async fn resolving_twice_matches_the_same_customer() {
        let h = harness();
        let first = h.directory.find_or_create(&email("a@x.com"), None).await.expect("first");
        let second = h.directory.find_or_create(&email("A@X.com"), None).await.expect("second");

        assert!(first.is_new);
        assert!(!second.is_new);
        assert_eq!(first.customer.id, second.customer.id);
        assert_eq!(h.customers.count().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn phone_is_used_when_email_does_not_match() {
        let h = harness();
        let created = h.directory.find_or_create(&phone("079 111 22 33"), None).await.expect("a");

        let contact = ContactInfo {
            email: Some("new@example.ch".to_string()),
            phone: Some("079 111 22 33".to_string()),
            ..ContactInfo::default()
        };
        let matched = h.directory.find_or_create(&contact, None).await.expect("b");

        assert!(!matched.is_new);
        assert_eq!(matched.customer.id, created.customer.id);
        assert_eq!(matched.customer.email.as_deref(), Some("new@example.ch"));
    }

    fn legacy_customer(contact: &ContactInfo, day: u32) -> Customer {
        let at = Utc.with_ymd_and_hms(2025, 1, day, 8, 0, 0).single().expect("timestamp");
        build_new_customer(contact, None, at).expect("customer")
    }

    #[tokio::test]
    async fn duplicate_rows_resolve_to_the_oldest_record() {
        let h = harness();
        let newer = legacy_customer(&phone("021 555 00 00"), 20);
        let oldest = legacy_customer(&phone("021 555 00 00"), 3);
        let middle = legacy_customer(&phone("021 555 00 00"), 11);
        for customer in [newer, oldest.clone(), middle] {
            h.customers.insert_unchecked(customer).await;
        }

        let resolved =
            h.directory.find_or_create(&phone("021 555 00 00"), None).await.expect("resolve");

        assert!(!resolved.is_new);
        assert_eq!(resolved.customer.id, oldest.id);
        assert_eq!(h.customers.count().await.expect("count"), 3);
    }

    #[tokio::test]
    async fn duplicate_emails_resolve_to_the_oldest_record() {
        let h = harness();
        let oldest = legacy_customer(&email("twin@example.ch"), 2);
        h.customers.insert_unchecked(legacy_customer(&email("TWIN@example.ch"), 9)).await;
        h.customers.insert_unchecked(oldest.clone()).await;

        let resolved =
            h.directory.find_or_create(&email("Twin@Example.ch"), None).await.expect("resolve");
        assert_eq!(resolved.customer.id, oldest.id);
    }

    #[tokio::test]
    async fn email_match_wins_over_phone_match() {
        let h = harness();
        let by_email =
            h.directory.find_or_create(&email("anna@example.ch"), None).await.expect("a");
        let by_phone =
            h.directory.find_or_create(&phone("079 222 33 44"), None).await.expect("b");

        let contact = ContactInfo {
            email: Some("ANNA@EXAMPLE.CH".to_string()),
            phone: Some("079 222 33 44".to_string()),
            ..ContactInfo::default()
        };
        let resolved = h.directory.find_or_create(&contact, None).await.expect("resolve");

        assert!(!resolved.is_new);
        assert_eq!(resolved.customer.id, by_email.customer.id);
        assert_ne!(resolved.customer.id, by_phone.customer.id);
        assert_eq!(h.customers.count().await.expect("count"), 2);
    }

    #[tokio::test]
    async fn enrichment_never_overwrites_populated_fields() {
        let h = harness();
        let contact = ContactInfo {
            email: Some("a@x.com".to_string()),
            phone: Some("111".to_string()),
            ..ContactInfo::default()
        };
        h.directory.find_or_create(&contact, None).await.expect("create");

        let incoming = ContactInfo {
            email: Some("a@x.com".to_string()),
            phone: Some("222".to_string()),
            instagram: Some("@ax".to_string()),
            ..ContactInfo::default()
        };
        let resolved = h.directory.find_or_create(&incoming, None).await.expect("match");

        assert_eq!(resolved.customer.phone.as_deref(), Some("111"));
        assert_eq!(resolved.customer.instagram.as_deref(), Some("@ax"));
    }

    #[tokio::test]
    async fn new_customer_defaults_whatsapp_and_preference() {
        let h = harness();
        let resolved = h
            .directory
            .find_or_create(&phone("+41 79 555 66 77"), Some(OrderChannel::WalkIn))
            .await
            .expect("create");

        assert!(resolved.is_new);
        assert_eq!(resolved.customer.whatsapp.as_deref(), Some("+41 79 555 66 77"));
        assert_eq!(resolved.customer.preferred_contact, Some(ContactChannel::Phone));
        assert_eq!(resolved.customer.total_orders, 0);
    }

    #[tokio::test]
    async fn fail_open_lookup_proceeds_to_creation() {
        let h = harness();
        h.directory.find_or_create(&email("a@x.com"), None).await.expect("create");
        h.customers.set_fail_lookups(true);

        let resolved =
            h.directory.find_or_create(&email("b@x.com"), None).await.expect("fail open");
        assert!(resolved.is_new);
    }

    #[tokio::test]
    async fn fail_closed_lookup_surfaces_error() {
        let h = harness_with(ClientsConfig {
            lookup_policy: LookupPolicy::FailClosed,
            ..ClientsConfig::default()
        });
        h.customers.set_fail_lookups(true);

        let error = h.directory.find_or_create(&email("a@x.com"), None).await.expect_err("closed");
        assert!(matches!(error, DirectoryError::Lookup(RepositoryError::Unavailable(_))));
    }

    #[tokio::test]
    async fn insert_conflict_is_retried_as_match() {
        let h = harness();
        let created = h.directory.find_or_create(&email("a@x.com"), None).await.expect("create");

        // The failed lookup hides the existing row, so the insert trips the
        // unique email rule and the strict retry finds it.
        h.customers.fail_next_lookups(1);
        let contact = ContactInfo {
            email: Some("A@x.com".to_string()),
            instagram: Some("@ax".to_string()),
            ..ContactInfo::default()
        };
        let resolved = h.directory.find_or_create(&contact, None).await.expect("retried");

        assert!(!resolved.is_new);
        assert_eq!(resolved.customer.id, created.customer.id);
        assert_eq!(resolved.customer.instagram.as_deref(), Some("@ax"));
        assert_eq!(h.customers.count().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn insert_conflict_propagates_when_retry_cannot_look_up() {
        let h = harness();
        h.directory.find_or_create(&email("a@x.com"), None).await.expect("create");
        h.customers.set_fail_lookups(true);

        let error = h.directory.find_or_create(&email("a@x.com"), None).await.expect_err("retry");
        assert!(matches!(error, DirectoryError::Creation(RepositoryError::Unavailable(_))));
    }

    #[tokio::test]
    async fn enrichment_write_failure_returns_unpatched_record() {
        let h = harness();
        let created = h.directory.find_or_create(&email("a@x.com"), None).await.expect("create");
        h.customers.set_fail_patches(true);

        let incoming = ContactInfo {
            email: Some("a@x.com".to_string()),
            phone: Some("079 000 00 00".to_string()),
            ..ContactInfo::default()
        };
        let resolved = h.directory.find_or_create(&incoming, None).await.expect("degrades");

        assert!(!resolved.is_new);
        assert_eq!(resolved.customer, created.customer);
    }

    #[tokio::test]
    async fn creation_failure_propagates() {
        let h = harness();
        h.customers.set_fail_inserts(true);

        let error = h.directory.find_or_create(&email("a@x.com"), None).await.expect_err("fatal");
        assert!(matches!(error, DirectoryError::Creation(RepositoryError::Unavailable(_))));
    }

    #[tokio::test]
    async fn digit_phone_matching_ignores_formatting() {
        let h = harness_with(ClientsConfig {
            phone_matching: PhoneMatching::Digits,
            ..ClientsConfig::default()
        });
        let created = h.directory.find_or_create(&phone("079 123 45 67"), None).await.expect("a");
        let matched = h.directory.find_or_create(&phone("0791234567"), None).await.expect("b");
        assert_eq!(created.customer.id, matched.customer.id);

        let verbatim = harness();
        verbatim.directory.find_or_create(&phone("079 123 45 67"), None).await.expect("a");
        let other = verbatim.directory.find_or_create(&phone("0791234567"), None).await.expect("b");
        assert!(other.is_new);
    }

    #[tokio::test]
    async fn update_stats_is_idempotent_and_exact() {
        let h = harness();
        let customer = h.directory.find_or_create(&email("a@x.com"), None).await.expect("c");
        let id = customer.customer.id;
        place_order(&h, id, 1010, 4).await;
        place_order(&h, id, 5, 2).await;

        let first = h.directory.update_stats(&id).await.expect("first");
        let second = h.directory.update_stats(&id).await.expect("second");

        assert_eq!(first.stats(), second.stats());
        assert_eq!(first.total_orders, 2);
        assert_eq!(first.total_spent.to_string(), "10.15");
        assert_eq!(first.first_order_date, chrono::NaiveDate::from_ymd_opt(2026, 6, 2));
        assert_eq!(first.last_order_date, chrono::NaiveDate::from_ymd_opt(2026, 6, 4));
    }

    #[tokio::test]
    async fn update_stats_resets_after_last_order_removed() {
        let h = harness();
        let id = h.directory.find_or_create(&email("a@x.com"), None).await.expect("c").customer.id;
        let order = place_order(&h, id, 800, 1).await;
        h.directory.update_stats(&id).await.expect("stats");

        h.orders.delete(&order.id).await.expect("delete order");
        let reset = h.directory.update_stats(&id).await.expect("reset");

        assert_eq!(reset.total_orders, 0);
        assert_eq!(reset.total_spent.to_string(), "0");
        assert_eq!(reset.first_order_date, None);
        assert_eq!(reset.last_order_date, None);
    }

    #[tokio::test]
    async fn stats_write_failure_propagates() {
        let h = harness();
        let id = h.directory.find_or_create(&email("a@x.com"), None).await.expect("c").customer.id;
        h.customers.set_fail_stats(true);

        let error = h.directory.update_stats(&id).await.expect_err("fatal");
        assert!(matches!(error, DirectoryError::StatsWrite(_)));
    }

    #[tokio::test]
    async fn update_stats_for_unknown_client_is_not_found() {
        let h = harness();
        let error = h.directory.update_stats(&CustomerId::new()).await.expect_err("missing");
        assert!(matches!(error, DirectoryError::NotFound { entity: "client", .. }));
    }

    #[tokio::test]
    async fn recompute_all_refreshes_every_client() {
        let h = harness();
        let a = h.directory.find_or_create(&email("a@x.com"), None).await.expect("a").customer.id;
        let b = h.directory.find_or_create(&email("b@x.com"), None).await.expect("b").customer.id;
        place_order(&h, a, 300, 1).await;
        place_order(&h, b, 400, 2).await;
        place_order(&h, b, 100, 3).await;

        assert_eq!(h.directory.recompute_all().await.expect("recompute"), 2);
        let b = h.directory.get(&b).await.expect("get").expect("exists");
        assert_eq!(b.total_orders, 2);
        assert_eq!(b.total_spent.to_string(), "5.00");
    }

    #[tokio::test]
    async fn delete_is_refused_while_orders_exist() {
        let h = harness();
        let id = h.directory.find_or_create(&email("a@x.com"), None).await.expect("c").customer.id;
        let order = place_order(&h, id, 100, 1).await;

        let blocked = h.directory.delete(&id).await.expect("delete");
        assert!(!blocked.success());
        assert!(h.directory.get(&id).await.expect("get").is_some());

        h.orders.delete(&order.id).await.expect("remove order");
        assert_eq!(h.directory.delete(&id).await.expect("delete"), DeleteClientOutcome::Deleted);
        assert_eq!(h.directory.delete(&id).await.expect("again"), DeleteClientOutcome::NotFound);
    }

    #[tokio::test]
    async fn search_clamps_limit_and_falls_back_to_recent() {
        let h = harness();
        for n in 0..5 {
            h.directory.find_or_create(&email(&format!("c{n}@x.com")), None).await.expect("c");
        }

        let small = h.directory.search("", Some(2)).await.expect("recent");
        assert_eq!(small.len(), 2);

        let matched = h.directory.search("c3@", None).await.expect("text");
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].email.as_deref(), Some("c3@x.com"));
    }

    #[tokio::test]
    async fn list_pages_and_counts() {
        let h = harness();
        for n in 0..3 {
            h.directory.find_or_create(&email(&format!("p{n}@x.com")), None).await.expect("c");
        }

        let page = h.directory.list(2, 2).await.expect("page");
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.page, 2);
    }

    #[tokio::test]
    async fn profile_update_rejects_taken_email() {
        let h = harness();
        h.directory.find_or_create(&email("a@x.com"), None).await.expect("a");
        let b = h.directory.find_or_create(&email("b@x.com"), None).await.expect("b").customer.id;

        let update = ProfileUpdate { email: Some("A@x.com".to_string()), ..ProfileUpdate::default() };
        let error = h.directory.update_profile(&b, &update).await.expect_err("taken");
        assert!(matches!(error, DirectoryError::Conflict(_)));

        let rename = ProfileUpdate { name: Some("Bea".to_string()), ..ProfileUpdate::default() };
        let saved = h.directory.update_profile(&b, &rename).await.expect("rename");
        assert_eq!(saved.name, "Bea");
    }

    #[tokio::test]
    async fn sqlite_duplicate_phones_and_email_precedence() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let customers = Arc::new(SqlCustomerRepository::new(pool.clone()));
        let orders = Arc::new(SqlOrderRepository::new(pool));
        let directory = ClientDirectory::new(customers.clone(), orders, ClientsConfig::default());

        let oldest = legacy_customer(&phone("022 700 00 00"), 4);
        customers.insert(legacy_customer(&phone("022 700 00 00"), 15)).await.expect("newer");
        customers.insert(oldest.clone()).await.expect("oldest");

        let resolved = directory.find_or_create(&phone("022 700 00 00"), None).await.expect("phone");
        assert_eq!(resolved.customer.id, oldest.id);

        let by_email = directory.find_or_create(&email("lou@example.ch"), None).await.expect("email");
        let contact = ContactInfo {
            email: Some("LOU@example.ch".to_string()),
            phone: Some("022 700 00 00".to_string()),
            ..ContactInfo::default()
        };
        let resolved = directory.find_or_create(&contact, None).await.expect("both");
        assert!(!resolved.is_new);
        assert_eq!(resolved.customer.id, by_email.customer.id);
    }

    #[tokio::test]
    async fn sqlite_backed_directory_resolves_and_recomputes() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let customers = Arc::new(SqlCustomerRepository::new(pool.clone()));
        let orders = Arc::new(SqlOrderRepository::new(pool));
        let directory = ClientDirectory::new(customers, orders.clone(), ClientsConfig::default());

        let created = directory.find_or_create(&email("Zoe@Example.ch"), None).await.expect("new");
        let again = directory.find_or_create(&email("zoe@example.ch"), None).await.expect("match");
        assert_eq!(created.customer.id, again.customer.id);

        let order = Order::new(
            created.customer.id,
            OrderChannel::Email,
            Decimal::new(1250, 2),
            Utc::now(),
        )
        .expect("order");
        orders.insert(order).await.expect("insert order");

        let refreshed = directory.update_stats(&created.customer.id).await.expect("stats");
        assert_eq!(refreshed.total_spent.to_string(), "12.50");
        assert!(!directory.delete(&created.customer.id).await.expect("delete").success());
    }
}
