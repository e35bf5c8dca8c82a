//! User profile.

use serde::Serialize;

use motostore_core::{UserId, UserRole};

/// Per-user profile row, created by the backend at sign-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub id: UserId,
    pub full_name: Option<String>,
    pub role: UserRole,
}
