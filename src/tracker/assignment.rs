//! Assignment policy: who may be put on a work item.
//!
//! A user is *eligible* for a group when they are active and either co-work
//! the group or belong to the group's organization. Eligibility is advisory
//! unless `enforce_eligibility` is set; absent or inactive users are always
//! rejected.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::TrackerError;
use crate::store::Database;
use crate::tracker::model::{User, WorkItem};

pub struct AssignmentPolicy {
    db: Arc<dyn Database>,
    enforce_eligibility: bool,
}

impl AssignmentPolicy {
    pub fn new(db: Arc<dyn Database>, enforce_eligibility: bool) -> Self {
        Self {
            db,
            enforce_eligibility,
        }
    }

    /// Active co-workers and organization members of a live group, each once.
    pub async fn eligible_assignees(&self, group_id: Uuid) -> Result<Vec<User>, TrackerError> {
        if self.db.get_group(group_id).await?.is_none() {
            return Err(TrackerError::not_found("Work item group", group_id));
        }
        Ok(self.db.list_eligible_assignees(group_id).await?)
    }

    /// Resolve `user_id` as an assignee for an item in `group_id`.
    pub async fn check_assignee(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<User, TrackerError> {
        let user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| TrackerError::InvalidAssignee {
                user_id,
                reason: "user does not exist".into(),
            })?;

        if !user.is_active {
            return Err(TrackerError::InvalidAssignee {
                user_id,
                reason: "user is inactive".into(),
            });
        }

        if self.enforce_eligibility
            && !self.db.is_group_co_worker_or_member(group_id, user_id).await?
        {
            return Err(TrackerError::InvalidAssignee {
                user_id,
                reason: "user is neither a co-worker of the group nor a member of its organization"
                    .into(),
            });
        }

        Ok(user)
    }

    /// Put `user_id` on the item, replacing any previous assignee.
    ///
    /// Only the assignee column is written, so a concurrent full update of
    /// the item keeps its other fields.
    pub async fn assign(&self, item_id: Uuid, user_id: Uuid) -> Result<WorkItem, TrackerError> {
        let item = self
            .db
            .get_work_item(item_id)
            .await?
            .ok_or_else(|| TrackerError::not_found("Work item", item_id))?;

        self.check_assignee(item.work_item_group_id, user_id).await?;

        if !self
            .db
            .set_work_item_assignee(item_id, user_id, Utc::now())
            .await?
        {
            return Err(TrackerError::not_found("Work item", item_id));
        }

        if item.assignee_id.is_some_and(|p| p != user_id) {
            debug!(item = %item_id, previous = ?item.assignee_id, "Replacing assignee");
        }
        info!(item = %item_id, user = %user_id, "Work item assigned");

        self.db
            .get_work_item(item_id)
            .await?
            .ok_or_else(|| TrackerError::not_found("Work item", item_id))
    }
}
