//! Per-user display preferences.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Column ordering a user chose for item listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub user_id: Uuid,
    /// Column names, left to right.
    pub column_order: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl UserPreferences {
    pub fn new(user_id: Uuid, column_order: Vec<String>) -> Self {
        Self {
            user_id,
            column_order,
            updated_at: Utc::now(),
        }
    }
}

/// Body of `PUT /user-preferences/{userId}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesUpdate {
    #[serde(default)]
    pub column_order: Vec<String>,
}
