//! Tracker service: validated CRUD over organizations, users, groups and
//! work items.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::config::PagingConfig;
use crate::error::TrackerError;
use crate::store::Database;
use crate::tracker::assignment::AssignmentPolicy;
use crate::tracker::model::{
    GroupDetail, GroupSummary, GroupUpdate, NewOrganization, NewUser, NewWorkItem,
    NewWorkItemGroup, Organization, OrganizationDetail, OrganizationUpdate, User, UserUpdate,
    WorkItem, WorkItemGroup, WorkItemUpdate,
};

pub type TrackerResult<T> = std::result::Result<T, TrackerError>;

/// Entry point for every tracker operation. Cheap to share behind an `Arc`.
pub struct Tracker {
    pub(crate) db: Arc<dyn Database>,
    pub(crate) paging: PagingConfig,
    assignment: AssignmentPolicy,
}

impl Tracker {
    pub fn new(db: Arc<dyn Database>, paging: PagingConfig, enforce_eligibility: bool) -> Self {
        Self {
            assignment: AssignmentPolicy::new(Arc::clone(&db), enforce_eligibility),
            db,
            paging,
        }
    }

    // ── Organizations ───────────────────────────────────────────────

    pub async fn create_organization(&self, body: NewOrganization) -> TrackerResult<Organization> {
        let org = Organization::new(body.name);
        self.db.insert_organization(&org).await?;
        info!(id = %org.id, "Organization created");
        Ok(org)
    }

    pub async fn get_organization(&self, id: Uuid) -> TrackerResult<OrganizationDetail> {
        let organization = self.require_organization(id).await?;
        let member_ids = self.db.list_organization_member_ids(id).await?;
        Ok(OrganizationDetail {
            organization,
            member_ids,
        })
    }

    pub async fn list_organizations(&self) -> TrackerResult<Vec<Organization>> {
        Ok(self.db.list_organizations().await?)
    }

    pub async fn update_organization(
        &self,
        id: Uuid,
        body: OrganizationUpdate,
    ) -> TrackerResult<Organization> {
        let mut org = self.require_organization(id).await?;
        org.name = body.name;
        org.updated_at = Utc::now();
        if !self.db.update_organization(&org).await? {
            return Err(TrackerError::not_found("Organization", id));
        }
        Ok(org)
    }

    pub async fn add_organization_member(&self, org_id: Uuid, user_id: Uuid) -> TrackerResult<()> {
        self.require_organization(org_id).await?;
        self.require_user_for_relation(user_id).await?;
        self.db.add_organization_member(org_id, user_id).await?;
        info!(org = %org_id, user = %user_id, "Organization member added");
        Ok(())
    }

    /// Removing a user who is not a member is a no-op.
    pub async fn remove_organization_member(
        &self,
        org_id: Uuid,
        user_id: Uuid,
    ) -> TrackerResult<()> {
        self.require_organization(org_id).await?;
        self.require_user_for_relation(user_id).await?;
        if self.db.remove_organization_member(org_id, user_id).await? {
            info!(org = %org_id, user = %user_id, "Organization member removed");
        }
        Ok(())
    }

    async fn require_organization(&self, id: Uuid) -> TrackerResult<Organization> {
        self.db
            .get_organization(id)
            .await?
            .ok_or_else(|| TrackerError::not_found("Organization", id))
    }

    // ── Users ───────────────────────────────────────────────────────

    pub async fn create_user(&self, body: NewUser) -> TrackerResult<User> {
        validate_user_fields(&body.name, &body.email)?;
        let user = User::new(body.name.trim(), body.email.trim());
        self.db.insert_user(&user).await?;
        info!(id = %user.id, "User created");
        Ok(user)
    }

    /// Users are returned even when inactive.
    pub async fn get_user(&self, id: Uuid) -> TrackerResult<User> {
        self.db
            .get_user(id)
            .await?
            .ok_or_else(|| TrackerError::not_found("User", id))
    }

    pub async fn list_users(&self) -> TrackerResult<Vec<User>> {
        Ok(self.db.list_active_users().await?)
    }

    pub async fn update_user(&self, id: Uuid, body: UserUpdate) -> TrackerResult<User> {
        let mut user = self.get_user(id).await?;
        validate_user_fields(&body.name, &body.email)?;
        user.name = body.name.trim().to_string();
        user.email = body.email.trim().to_string();
        user.is_active = body.is_active;
        user.updated_at = Utc::now();
        if !self.db.update_user(&user).await? {
            return Err(TrackerError::not_found("User", id));
        }
        Ok(user)
    }

    /// Soft-delete: memberships and existing assignments stay in place.
    pub async fn deactivate_user(&self, id: Uuid) -> TrackerResult<()> {
        if !self.db.set_user_active(id, false).await? {
            return Err(TrackerError::not_found("User", id));
        }
        info!(id = %id, "User deactivated");
        Ok(())
    }

    async fn require_user_for_relation(&self, user_id: Uuid) -> TrackerResult<User> {
        self.db
            .get_user(user_id)
            .await?
            .ok_or_else(|| TrackerError::invalid(format!("User {user_id} does not exist")))
    }

    // ── Groups ──────────────────────────────────────────────────────

    pub async fn create_group(&self, body: NewWorkItemGroup) -> TrackerResult<WorkItemGroup> {
        if self.db.get_organization(body.organization_id).await?.is_none() {
            return Err(TrackerError::invalid(format!(
                "Organization {} does not exist",
                body.organization_id
            )));
        }

        let mut co_worker_ids: Vec<Uuid> = Vec::with_capacity(body.co_worker_ids.len());
        for user_id in body.co_worker_ids {
            if co_worker_ids.contains(&user_id) {
                continue;
            }
            self.require_user_for_relation(user_id).await?;
            co_worker_ids.push(user_id);
        }

        let group = WorkItemGroup::new(body.name, body.organization_id);
        self.db.insert_group(&group, &co_worker_ids).await?;
        info!(id = %group.id, org = %group.organization_id, "Work item group created");
        Ok(group)
    }

    pub async fn get_group(&self, id: Uuid) -> TrackerResult<GroupDetail> {
        let group = self.require_group(id).await?;
        let co_worker_ids = self.db.list_group_co_worker_ids(id).await?;
        let items = self.db.list_group_work_items(id).await?;
        Ok(GroupDetail {
            group,
            co_worker_ids,
            items,
        })
    }

    pub async fn list_groups(&self) -> TrackerResult<Vec<GroupSummary>> {
        Ok(self.db.list_group_summaries().await?)
    }

    pub async fn update_group(&self, id: Uuid, body: GroupUpdate) -> TrackerResult<WorkItemGroup> {
        let mut group = self.require_group(id).await?;
        group.name = body.name;
        group.last_updated = Utc::now();
        if !self.db.update_group(&group).await? {
            return Err(TrackerError::not_found("Work item group", id));
        }
        Ok(group)
    }

    /// Soft-delete the group and every item in it.
    pub async fn delete_group(&self, id: Uuid) -> TrackerResult<()> {
        if !self.db.soft_delete_group(id).await? {
            return Err(TrackerError::not_found("Work item group", id));
        }
        info!(id = %id, "Work item group deleted");
        Ok(())
    }

    pub async fn add_group_co_worker(&self, group_id: Uuid, user_id: Uuid) -> TrackerResult<()> {
        self.require_group(group_id).await?;
        self.require_user_for_relation(user_id).await?;
        self.db.add_group_co_worker(group_id, user_id).await?;
        info!(group = %group_id, user = %user_id, "Co-worker added");
        Ok(())
    }

    /// Removing a user who is not a co-worker is a no-op.
    pub async fn remove_group_co_worker(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> TrackerResult<()> {
        self.require_group(group_id).await?;
        self.require_user_for_relation(user_id).await?;
        if self.db.remove_group_co_worker(group_id, user_id).await? {
            info!(group = %group_id, user = %user_id, "Co-worker removed");
        }
        Ok(())
    }

    async fn require_group(&self, id: Uuid) -> TrackerResult<WorkItemGroup> {
        self.db
            .get_group(id)
            .await?
            .ok_or_else(|| TrackerError::not_found("Work item group", id))
    }

    // ── Work items ──────────────────────────────────────────────────

    pub async fn create_work_item(&self, body: NewWorkItem) -> TrackerResult<WorkItem> {
        let group_id = body.work_item_group_id;
        if self.db.get_group(group_id).await?.is_none() {
            return Err(TrackerError::invalid(format!(
                "Work item group {group_id} does not exist"
            )));
        }
        if let Some(user_id) = body.assignee_id {
            self.assignment.check_assignee(group_id, user_id).await?;
        }

        let mut item = WorkItem::new(group_id, body.title, body.state);
        item.assignee_id = body.assignee_id;
        item.properties = body.properties;
        self.db.insert_work_item(&item).await?;
        info!(id = %item.id, group = %group_id, "Work item created");
        Ok(item)
    }

    pub async fn get_work_item(&self, id: Uuid) -> TrackerResult<WorkItem> {
        self.db
            .get_work_item(id)
            .await?
            .ok_or_else(|| TrackerError::not_found("Work item", id))
    }

    /// Full overwrite of title, state, assignee and properties. The owning
    /// group is kept.
    pub async fn update_work_item(&self, id: Uuid, body: WorkItemUpdate) -> TrackerResult<WorkItem> {
        let mut item = self.get_work_item(id).await?;

        if let Some(user_id) = body.assignee_id {
            if item.assignee_id != Some(user_id) {
                self.assignment
                    .check_assignee(item.work_item_group_id, user_id)
                    .await?;
            }
        }

        item.title = body.title;
        item.state = body.state;
        item.assignee_id = body.assignee_id;
        item.properties = body.properties;
        item.updated_at = Utc::now();
        if !self.db.update_work_item(&item).await? {
            return Err(TrackerError::not_found("Work item", id));
        }
        Ok(item)
    }

    pub async fn delete_work_item(&self, id: Uuid) -> TrackerResult<()> {
        if !self.db.soft_delete_work_item(id).await? {
            return Err(TrackerError::not_found("Work item", id));
        }
        info!(id = %id, "Work item deleted");
        Ok(())
    }

    pub async fn assign(&self, item_id: Uuid, user_id: Uuid) -> TrackerResult<WorkItem> {
        self.assignment.assign(item_id, user_id).await
    }

    pub async fn eligible_assignees(&self, group_id: Uuid) -> TrackerResult<Vec<User>> {
        self.assignment.eligible_assignees(group_id).await
    }
}

fn validate_user_fields(name: &str, email: &str) -> TrackerResult<()> {
    if name.trim().is_empty() {
        return Err(TrackerError::invalid("User name must not be empty"));
    }
    if email.trim().is_empty() {
        return Err(TrackerError::invalid("User email must not be empty"));
    }
    Ok(())
}
