//! User profiles over PostgREST.

use serde::Deserialize;

use motostore_core::{UserId, UserRole};

use crate::backend::{Query, SupabaseClient};
use crate::db::{ProfileRepository, RepositoryError, Result};
use crate::models::Profile;

const PROFILES: &str = "perfiles";

#[derive(Debug, Deserialize)]
struct ProfileRow {
    id: UserId,
    #[serde(rename = "nombre_completo", default)]
    full_name: Option<String>,
    #[serde(rename = "rol", default)]
    role: Option<String>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = RepositoryError;

    fn try_from(row: ProfileRow) -> Result<Self> {
        let role = match row.role.as_deref() {
            None => UserRole::default(),
            Some(raw) => raw
                .parse::<UserRole>()
                .map_err(|e| RepositoryError::DataCorruption(format!("profile {}: {e}", row.id)))?,
        };
        Ok(Self {
            id: row.id,
            full_name: row.full_name.filter(|name| !name.trim().is_empty()),
            role,
        })
    }
}

impl ProfileRepository for SupabaseClient {
    async fn find_profile(&self, user: UserId) -> Result<Option<Profile>> {
        let row: Option<ProfileRow> = self
            .select_first(
                Query::table(PROFILES)
                    .select("id,nombre_completo,rol")
                    .eq("id", user),
            )
            .await?;
        row.map(Profile::try_from).transpose()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn row(role: Option<&str>) -> ProfileRow {
        ProfileRow {
            id: UserId::random(),
            full_name: Some("Ana López".to_string()),
            role: role.map(str::to_string),
        }
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!(Profile::try_from(row(Some("admin"))).unwrap().role, UserRole::Admin);
        assert_eq!(Profile::try_from(row(None)).unwrap().role, UserRole::User);
    }

    #[test]
    fn test_unknown_role_is_corruption() {
        assert!(matches!(
            Profile::try_from(row(Some("superuser"))),
            Err(RepositoryError::DataCorruption(_))
        ));
    }
}
