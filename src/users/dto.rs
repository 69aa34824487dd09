use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{Role, User};

#[derive(Debug, Serialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub onboarding_name: Option<String>,
    pub role: Role,
    pub preferences: Preferences,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Preferences {
    pub voice_id: Option<String>,
    pub timezone: String,
    pub utc_offset_minutes: i32,
    pub notify_email: bool,
    pub notify_push: bool,
    pub notify_sms: bool,
}

impl From<User> for Profile {
    fn from(u: User) -> Self {
        let role = u.role();
        Self {
            id: u.id,
            email: u.email,
            display_name: u.display_name,
            onboarding_name: u.onboarding_name,
            role,
            preferences: Preferences {
                voice_id: u.voice_id,
                timezone: u.timezone,
                utc_offset_minutes: u.utc_offset_minutes,
                notify_email: u.notify_email,
                notify_push: u.notify_push,
                notify_sms: u.notify_sms,
            },
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub onboarding_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePreferencesRequest {
    pub voice_id: Option<String>,
    pub timezone: Option<String>,
    pub utc_offset_minutes: Option<i32>,
    pub notify_email: Option<bool>,
    pub notify_push: Option<bool>,
    pub notify_sms: Option<bool>,
}
