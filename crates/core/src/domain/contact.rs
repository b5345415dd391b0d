use serde::{Deserialize, Serialize};

/// Channel a customer prefers to be reached on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactChannel {
    Email,
    Phone,
    Whatsapp,
    Instagram,
}

impl ContactChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Whatsapp => "whatsapp",
            Self::Instagram => "instagram",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "email" => Some(Self::Email),
            "phone" => Some(Self::Phone),
            "whatsapp" => Some(Self::Whatsapp),
            "instagram" => Some(Self::Instagram),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContactChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Channel an order or meeting request came in through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderChannel {
    Instagram,
    Email,
    Whatsapp,
    Phone,
    WalkIn,
    Other,
}

impl OrderChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instagram => "instagram",
            Self::Email => "email",
            Self::Whatsapp => "whatsapp",
            Self::Phone => "phone",
            Self::WalkIn => "walk_in",
            Self::Other => "other",
        }
    }

    /// Unknown channels collapse to `Other`.
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "instagram" => Self::Instagram,
            "email" => Self::Email,
            "whatsapp" => Self::Whatsapp,
            "phone" => Self::Phone,
            "walk_in" | "walkin" => Self::WalkIn,
            _ => Self::Other,
        }
    }
}

/// Raw contact details collected by an intake form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub whatsapp: Option<String>,
    #[serde(default)]
    pub instagram: Option<String>,
    #[serde(default)]
    pub preferred_contact: Option<ContactChannel>,
}

impl ContactInfo {
    /// Trims every field and drops blank values.
    pub fn normalized(&self) -> Self {
        Self {
            name: non_blank(self.name.as_deref()),
            email: non_blank(self.email.as_deref()),
            phone: non_blank(self.phone.as_deref()),
            whatsapp: non_blank(self.whatsapp.as_deref()),
            instagram: non_blank(self.instagram.as_deref()),
            preferred_contact: self.preferred_contact,
        }
    }

    /// True when at least one field usable for matching or reaching out is set.
    pub fn has_reachable_contact(&self) -> bool {
        [&self.email, &self.phone, &self.instagram]
            .into_iter()
            .any(|value| value.as_deref().is_some_and(|v| !v.trim().is_empty()))
    }
}

pub fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Digit-only projection of a phone number, `None` when it holds no digits.
pub fn phone_digits(phone: &str) -> Option<String> {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    (!digits.is_empty()).then_some(digits)
}
