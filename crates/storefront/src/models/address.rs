//! Shipping address domain types.

use serde::Serialize;

use motostore_core::{AddressId, UserId};

/// Country used when the form leaves it blank.
pub const DEFAULT_COUNTRY: &str = "México";

/// A saved shipping address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub is_default: bool,
}

impl Address {
    /// Multi-line label as printed on a shipment.
    #[must_use]
    pub fn label(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.line1);
        out.push('\n');
        if let Some(line2) = &self.line2 {
            out.push_str(line2);
            out.push('\n');
        }
        out.push_str(&format!("{}, {}\n", self.city, self.state));
        out.push_str(&format!("CP: {}, {}", self.postal_code, self.country));
        out
    }
}

/// A validated address ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAddress {
    pub user_id: UserId,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub is_default: bool,
}
