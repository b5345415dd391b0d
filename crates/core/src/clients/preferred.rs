use crate::domain::contact::{non_blank, ContactChannel, ContactInfo, OrderChannel};

/// Picks the channel a customer should be reached on.
///
/// A preference the caller already declared always wins. Otherwise the
/// intake channel decides; phone and walk-in only yield `Phone` when a number
/// was actually collected. Unknown or missing channels fall back to the first
/// populated field among email, phone and instagram.
pub fn infer_preferred_contact(
    channel: Option<OrderChannel>,
    contact: &ContactInfo,
) -> Option<ContactChannel> {
    if let Some(declared) = contact.preferred_contact {
        return Some(declared);
    }

    let has_email = non_blank(contact.email.as_deref()).is_some();
    let has_phone = non_blank(contact.phone.as_deref()).is_some();
    let has_instagram = non_blank(contact.instagram.as_deref()).is_some();

    match channel {
        Some(OrderChannel::Instagram) => Some(ContactChannel::Instagram),
        Some(OrderChannel::Email) => Some(ContactChannel::Email),
        Some(OrderChannel::Whatsapp) => Some(ContactChannel::Whatsapp),
        Some(OrderChannel::Phone) | Some(OrderChannel::WalkIn) => {
            has_phone.then_some(ContactChannel::Phone)
        }
        Some(OrderChannel::Other) | None => {
            if has_email {
                Some(ContactChannel::Email)
            } else if has_phone {
                Some(ContactChannel::Phone)
            } else if has_instagram {
                Some(ContactChannel::Instagram)
            } else {
                None
            }
        }
    }
}
