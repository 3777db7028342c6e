//! Per-user display preferences, kept apart from the entity graph.

pub mod model;
pub mod routes;

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::error::TrackerError;
use crate::store::Database;
use model::UserPreferences;

pub use routes::{PreferencesRouteState, preferences_routes};

/// Keyed store of column orderings. Entries exist only once set.
pub struct PreferencesStore {
    db: Arc<dyn Database>,
}

impl PreferencesStore {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    pub async fn get(&self, user_id: Uuid) -> Result<UserPreferences, TrackerError> {
        self.db
            .get_preferences(user_id)
            .await?
            .ok_or_else(|| TrackerError::not_found("Preferences for user", user_id))
    }

    /// Replace the stored column order wholesale.
    pub async fn set(
        &self,
        user_id: Uuid,
        column_order: Vec<String>,
    ) -> Result<UserPreferences, TrackerError> {
        let prefs = UserPreferences::new(user_id, column_order);
        self.db.set_preferences(&prefs).await?;
        info!(user = %user_id, columns = prefs.column_order.len(), "Preferences saved");
        Ok(prefs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LibSqlBackend;

    async fn store() -> PreferencesStore {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        PreferencesStore::new(db)
    }

    #[tokio::test]
    async fn get_unset_is_not_found() {
        let prefs = store().await;
        let err = prefs.get(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, TrackerError::NotFound { .. }));
    }

    #[tokio::test]
    async fn set_needs_no_existing_user() {
        let prefs = store().await;
        let user_id = Uuid::new_v4();
        let stored = prefs
            .set(user_id, vec!["title".into(), "assignee".into()])
            .await
            .unwrap();
        assert_eq!(prefs.get(user_id).await.unwrap().column_order, stored.column_order);

        prefs.set(user_id, vec![]).await.unwrap();
        assert!(prefs.get(user_id).await.unwrap().column_order.is_empty());
    }
}
