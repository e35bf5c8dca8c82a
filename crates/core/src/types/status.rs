//! Status enums for various entities.
//!
//! Serialized forms match the values stored by the hosted backend, which
//! uses Spanish column values.

use serde::{Deserialize, Serialize};

/// Payment record status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    #[default]
    #[serde(rename = "pendiente")]
    Pending,
    #[serde(rename = "completado")]
    Completed,
    #[serde(rename = "fallido")]
    Failed,
}

/// How a payment was processed.
///
/// The storefront never contacts a payment network; every payment it records
/// is [`ProcessingMethod::Simulated`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ProcessingMethod {
    #[default]
    #[serde(rename = "simulado")]
    Simulated,
}

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    #[default]
    #[serde(rename = "pendiente")]
    Pending,
    #[serde(rename = "confirmado")]
    Confirmed,
    #[serde(rename = "enviado")]
    Shipped,
    #[serde(rename = "entregado")]
    Delivered,
    #[serde(rename = "cancelado")]
    Cancelled,
}

/// Card type chosen at payment time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CardType {
    #[default]
    #[serde(rename = "Crédito", alias = "credit")]
    Credit,
    #[serde(rename = "Débito", alias = "debit")]
    Debit,
}

impl std::fmt::Display for CardType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Credit => write!(f, "Crédito"),
            Self::Debit => write!(f, "Débito"),
        }
    }
}

/// Storefront user role, stored on the user's profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Regular customer.
    #[default]
    User,
    /// Can manage products and categories.
    Admin,
}

impl UserRole {
    /// Whether this role may use the catalog management endpoints.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid user role: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_values() {
        assert_eq!(
            serde_json::to_string(&PaymentStatus::Completed).unwrap(),
            "\"completado\""
        );
        assert_eq!(
            serde_json::to_string(&ProcessingMethod::Simulated).unwrap(),
            "\"simulado\""
        );
        assert_eq!(
            serde_json::to_string(&OrderStatus::Confirmed).unwrap(),
            "\"confirmado\""
        );
    }

    #[test]
    fn test_card_type_accepts_english_alias() {
        let t: CardType = serde_json::from_str("\"debit\"").unwrap();
        assert_eq!(t, CardType::Debit);
        let t: CardType = serde_json::from_str("\"Crédito\"").unwrap();
        assert_eq!(t, CardType::Credit);
    }

    #[test]
    fn test_user_role_round_trip() {
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert!("root".parse::<UserRole>().is_err());
        assert!(UserRole::Admin.is_admin());
        assert!(!UserRole::User.is_admin());
    }
}
