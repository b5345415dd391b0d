//! Client identity resolution primitives.
//!
//! Everything here is pure: storage-facing orchestration lives with the
//! repositories, which call into these functions to decide what to write.

pub mod enrichment;
pub mod preferred;
pub mod search;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::contact::{ContactInfo, OrderChannel};
use crate::domain::customer::{Customer, CustomerId};
use crate::errors::DomainError;

pub use enrichment::diff_contact;
pub use preferred::infer_preferred_contact;
pub use search::{ClientSearchResult, SearchMode, SearchRequest};

/// Builds the record for a contact that matched nobody.
///
/// WhatsApp falls back to the phone number when not given explicitly, and
/// a blank name falls back to the first populated contact value.
pub fn build_new_customer(
    contact: &ContactInfo,
    channel: Option<OrderChannel>,
    now: DateTime<Utc>,
) -> Result<Customer, DomainError> {
    let contact = contact.normalized();
    if !contact.has_reachable_contact() {
        return Err(DomainError::MissingContact);
    }

    let name = contact
        .name
        .clone()
        .or_else(|| contact.email.clone())
        .or_else(|| contact.phone.clone())
        .or_else(|| contact.instagram.clone())
        .ok_or(DomainError::MissingContact)?;

    Ok(Customer {
        id: CustomerId::new(),
        name,
        email: contact.email.clone(),
        phone: contact.phone.clone(),
        whatsapp: contact.whatsapp.clone().or_else(|| contact.phone.clone()),
        instagram: contact.instagram.clone(),
        preferred_contact: infer_preferred_contact(channel, &contact),
        notes: String::new(),
        total_orders: 0,
        total_spent: Decimal::ZERO,
        first_order_date: None,
        last_order_date: None,
        created_at: now,
        updated_at: now,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::build_new_customer;
    use crate::domain::contact::{ContactChannel, ContactInfo, OrderChannel};
    use crate::errors::DomainError;

    #[test]
    fn whatsapp_defaults_to_phone_on_creation() {
        let contact = ContactInfo {
            name: Some("Noé".to_string()),
            phone: Some("+41791234567".to_string()),
            ..ContactInfo::default()
        };

        let customer =
            build_new_customer(&contact, Some(OrderChannel::Whatsapp), Utc::now()).expect("build");

        assert_eq!(customer.whatsapp.as_deref(), Some("+41791234567"));
        assert_eq!(customer.preferred_contact, Some(ContactChannel::Whatsapp));
        assert_eq!(customer.total_orders, 0);
        assert_eq!(customer.total_spent.to_string(), "0");
    }

    #[test]
    fn explicit_whatsapp_is_kept() {
        let contact = ContactInfo {
            phone: Some("+41 21 000 00 00".to_string()),
            whatsapp: Some("+41 79 999 99 99".to_string()),
            ..ContactInfo::default()
        };

        let customer = build_new_customer(&contact, None, Utc::now()).expect("build");
        assert_eq!(customer.whatsapp.as_deref(), Some("+41 79 999 99 99"));
    }

    #[test]
    fn blank_name_falls_back_to_contact_value() {
        let contact = ContactInfo {
            name: Some("  ".to_string()),
            instagram: Some("@croissant_fan".to_string()),
            ..ContactInfo::default()
        };

        let customer =
            build_new_customer(&contact, Some(OrderChannel::Instagram), Utc::now()).expect("build");
        assert_eq!(customer.name, "@croissant_fan");
    }

    #[test]
    fn creation_requires_a_reachable_contact() {
        let contact = ContactInfo {
            name: Some("Anonymous".to_string()),
            whatsapp: Some("+41790000000".to_string()),
            ..ContactInfo::default()
        };

        let error = build_new_customer(&contact, None, Utc::now()).expect_err("no contact");
        assert_eq!(error, DomainError::MissingContact);
    }
}
