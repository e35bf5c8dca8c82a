//! Repository implementations for the hosted backend.
//!
//! Row types keep the backend's (Spanish) column names through serde
//! renames and convert into the domain models at this boundary.

mod addresses;
mod auth;
mod cart;
mod catalog;
mod orders;
mod profiles;

use crate::backend::SupabaseClient;
use crate::db::{Result, Store};
use crate::models::AuthSession;

impl Store for SupabaseClient {
    fn scoped(&self, session: &AuthSession) -> Self {
        self.with_access_token(&session.access_token)
    }

    async fn health_check(&self) -> Result<()> {
        Self::health_check(self).await?;
        Ok(())
    }
}
