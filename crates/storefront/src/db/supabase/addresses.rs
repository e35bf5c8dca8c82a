//! Shipping addresses over PostgREST.

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use motostore_core::{AddressId, UserId};

use crate::backend::{Direction, Query, SupabaseClient};
use crate::db::{AddressRepository, Result};
use crate::models::{Address, NewAddress};

const ADDRESSES: &str = "direcciones_envio";

#[derive(Debug, Deserialize)]
struct AddressRow {
    id: AddressId,
    #[serde(rename = "usuario_id")]
    user_id: UserId,
    #[serde(rename = "linea_direccion_1")]
    line1: String,
    #[serde(rename = "linea_direccion_2", default)]
    line2: Option<String>,
    #[serde(rename = "ciudad")]
    city: String,
    #[serde(rename = "estado")]
    state: String,
    #[serde(rename = "codigo_postal")]
    postal_code: String,
    #[serde(rename = "pais")]
    country: String,
    #[serde(rename = "es_predeterminada", default)]
    is_default: bool,
}

impl From<AddressRow> for Address {
    fn from(row: AddressRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            line1: row.line1,
            line2: row.line2.filter(|line| !line.trim().is_empty()),
            city: row.city,
            state: row.state,
            postal_code: row.postal_code,
            country: row.country,
            is_default: row.is_default,
        }
    }
}

#[derive(Debug, Serialize)]
struct AddressWrite<'a> {
    #[serde(rename = "usuario_id")]
    user_id: UserId,
    #[serde(rename = "linea_direccion_1")]
    line1: &'a str,
    #[serde(rename = "linea_direccion_2")]
    line2: Option<&'a str>,
    #[serde(rename = "ciudad")]
    city: &'a str,
    #[serde(rename = "estado")]
    state: &'a str,
    #[serde(rename = "codigo_postal")]
    postal_code: &'a str,
    #[serde(rename = "pais")]
    country: &'a str,
    #[serde(rename = "es_predeterminada")]
    is_default: bool,
}

#[derive(Debug, Serialize)]
struct DefaultFlagWrite {
    es_predeterminada: bool,
}

impl AddressRepository for SupabaseClient {
    #[instrument(skip(self))]
    async fn list_addresses(&self, user: UserId) -> Result<Vec<Address>> {
        let rows: Vec<AddressRow> = self
            .select(
                &Query::table(ADDRESSES)
                    .select("*")
                    .eq("usuario_id", user)
                    .order("es_predeterminada", Direction::Desc),
            )
            .await?;
        Ok(rows.into_iter().map(Address::from).collect())
    }

    async fn find_address(&self, user: UserId, id: AddressId) -> Result<Option<Address>> {
        let row: Option<AddressRow> = self
            .select_first(
                Query::table(ADDRESSES)
                    .select("*")
                    .eq("id", id)
                    .eq("usuario_id", user),
            )
            .await?;
        Ok(row.map(Address::from))
    }

    #[instrument(skip(self))]
    async fn clear_default_addresses(&self, user: UserId) -> Result<()> {
        let _: Vec<IgnoredAny> = self
            .update(
                &Query::table(ADDRESSES).select("id").eq("usuario_id", user),
                &DefaultFlagWrite {
                    es_predeterminada: false,
                },
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self, address), fields(user_id = %address.user_id, is_default = address.is_default))]
    async fn insert_address(&self, address: &NewAddress) -> Result<Address> {
        let row: AddressRow = self
            .insert_one(
                ADDRESSES,
                &AddressWrite {
                    user_id: address.user_id,
                    line1: &address.line1,
                    line2: address.line2.as_deref(),
                    city: &address.city,
                    state: &address.state,
                    postal_code: &address.postal_code,
                    country: &address.country,
                    is_default: address.is_default,
                },
            )
            .await?;
        Ok(row.into())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_second_line_becomes_none() {
        let row: AddressRow = serde_json::from_str(
            r#"{
                "id": "44444444-4444-4444-8444-444444444444",
                "usuario_id": "55555555-5555-4555-8555-555555555555",
                "linea_direccion_1": "Av. Juárez 10",
                "linea_direccion_2": "",
                "ciudad": "Guadalajara",
                "estado": "Jalisco",
                "codigo_postal": "44100",
                "pais": "México",
                "es_predeterminada": true,
                "created_at": "2024-01-01T00:00:00Z"
            }"#,
        )
        .unwrap();

        let address = Address::from(row);
        assert_eq!(address.line2, None);
        assert!(address.is_default);
    }
}
