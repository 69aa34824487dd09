use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Provider,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Provider => "provider",
            Role::Admin => "admin",
        }
    }

    /// Unknown stored values degrade to `Member`.
    pub fn parse(s: &str) -> Self {
        match s {
            "admin" => Role::Admin,
            "provider" => Role::Provider,
            _ => Role::Member,
        }
    }
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub display_name: Option<String>,
    pub onboarding_name: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub voice_id: Option<String>,
    pub timezone: String,
    pub utc_offset_minutes: i32,
    pub notify_email: bool,
    pub notify_push: bool,
    pub notify_sms: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl User {
    pub fn role(&self) -> Role {
        Role::parse(&self.role)
    }

    /// Name used to address the user: display name, then the name given
    /// during onboarding, then nothing.
    pub fn preferred_name(&self) -> &str {
        [&self.display_name, &self.onboarding_name]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .unwrap_or("")
    }
}

/// Identity and role behind an authenticated request.
#[derive(Debug, Clone, FromRow)]
pub struct PrincipalRow {
    pub id: Uuid,
    pub role: String,
    pub is_active: bool,
}

#[cfg(test)]
pub fn sample_user() -> User {
    User {
        id: Uuid::new_v4(),
        email: "emma@example.com".into(),
        password_hash: "hash".into(),
        display_name: None,
        onboarding_name: None,
        role: "member".into(),
        is_active: true,
        voice_id: None,
        timezone: "UTC".into(),
        utc_offset_minutes: 0,
        notify_email: true,
        notify_push: true,
        notify_sms: false,
        created_at: OffsetDateTime::UNIX_EPOCH,
        updated_at: OffsetDateTime::UNIX_EPOCH,
    }
}
