use crate::clients::preferred::infer_preferred_contact;
use crate::domain::contact::{non_blank, ContactInfo, OrderChannel};
use crate::domain::customer::{Customer, CustomerPatch};

/// Computes the back-fill for a matched customer.
///
/// Only empty fields are staged; populated fields are never overwritten.
/// Returns `None` when there is nothing to write.
pub fn diff_contact(
    existing: &Customer,
    incoming: &ContactInfo,
    channel: Option<OrderChannel>,
) -> Option<CustomerPatch> {
    let incoming = incoming.normalized();

    let patch = CustomerPatch {
        email: fill_if_empty(existing.email.as_deref(), incoming.email.as_deref()),
        phone: fill_if_empty(existing.phone.as_deref(), incoming.phone.as_deref()),
        whatsapp: fill_if_empty(existing.whatsapp.as_deref(), incoming.whatsapp.as_deref()),
        instagram: fill_if_empty(existing.instagram.as_deref(), incoming.instagram.as_deref()),
        preferred_contact: match (existing.preferred_contact, channel) {
            (None, Some(channel)) => infer_preferred_contact(Some(channel), &incoming),
            _ => None,
        },
    };

    (!patch.is_empty()).then_some(patch)
}

fn fill_if_empty(existing: Option<&str>, incoming: Option<&str>) -> Option<String> {
    match non_blank(existing) {
        Some(_) => None,
        None => non_blank(incoming),
    }
}
