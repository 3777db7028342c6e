//! The `Database` trait: one async interface for all persistence.
//!
//! Reads of groups and work items only ever see rows that are not
//! soft-deleted; no method offers a way around that filter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::preferences::model::UserPreferences;
use crate::tracker::model::{GroupSummary, Organization, User, WorkItem, WorkItemGroup};

/// Backend-agnostic database trait covering the entity graph and preferences.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    // ── Organizations ───────────────────────────────────────────────

    async fn insert_organization(&self, org: &Organization) -> Result<(), DatabaseError>;

    async fn get_organization(&self, id: Uuid) -> Result<Option<Organization>, DatabaseError>;

    /// All organizations in creation order.
    async fn list_organizations(&self) -> Result<Vec<Organization>, DatabaseError>;

    /// Overwrite name and `updated_at`. Returns false if the row is absent.
    async fn update_organization(&self, org: &Organization) -> Result<bool, DatabaseError>;

    /// Add a member. Adding an existing member is a no-op.
    async fn add_organization_member(&self, org_id: Uuid, user_id: Uuid)
    -> Result<(), DatabaseError>;

    /// Returns true if a membership row was removed.
    async fn remove_organization_member(
        &self,
        org_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, DatabaseError>;

    async fn list_organization_member_ids(&self, org_id: Uuid) -> Result<Vec<Uuid>, DatabaseError>;

    // ── Users ───────────────────────────────────────────────────────

    async fn insert_user(&self, user: &User) -> Result<(), DatabaseError>;

    /// Get a user by id, active or not.
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;

    /// Active users in creation order.
    async fn list_active_users(&self) -> Result<Vec<User>, DatabaseError>;

    /// Overwrite name, email, active flag and `updated_at`.
    async fn update_user(&self, user: &User) -> Result<bool, DatabaseError>;

    /// Flip the active flag without touching memberships or assignments.
    async fn set_user_active(&self, id: Uuid, active: bool) -> Result<bool, DatabaseError>;

    // ── Groups ──────────────────────────────────────────────────────

    /// Insert a group and its initial co-workers in one transaction.
    async fn insert_group(
        &self,
        group: &WorkItemGroup,
        co_worker_ids: &[Uuid],
    ) -> Result<(), DatabaseError>;

    /// Get a live group.
    async fn get_group(&self, id: Uuid) -> Result<Option<WorkItemGroup>, DatabaseError>;

    /// Live groups with their live item counts, in creation order.
    async fn list_group_summaries(&self) -> Result<Vec<GroupSummary>, DatabaseError>;

    /// Overwrite name and `last_updated` of a live group.
    async fn update_group(&self, group: &WorkItemGroup) -> Result<bool, DatabaseError>;

    /// Soft-delete a live group and every live item in it, atomically.
    /// Returns false if the group was absent.
    async fn soft_delete_group(&self, id: Uuid) -> Result<bool, DatabaseError>;

    async fn add_group_co_worker(&self, group_id: Uuid, user_id: Uuid) -> Result<(), DatabaseError>;

    async fn remove_group_co_worker(&self, group_id: Uuid, user_id: Uuid)
    -> Result<bool, DatabaseError>;

    async fn list_group_co_worker_ids(&self, group_id: Uuid) -> Result<Vec<Uuid>, DatabaseError>;

    // ── Work items ──────────────────────────────────────────────────

    async fn insert_work_item(&self, item: &WorkItem) -> Result<(), DatabaseError>;

    /// Get a live work item.
    async fn get_work_item(&self, id: Uuid) -> Result<Option<WorkItem>, DatabaseError>;

    /// Live items of a group in insertion order.
    async fn list_group_work_items(&self, group_id: Uuid) -> Result<Vec<WorkItem>, DatabaseError>;

    /// Overwrite title, state, assignee, properties and `updated_at` of a
    /// live item. The owning group column is never written.
    async fn update_work_item(&self, item: &WorkItem) -> Result<bool, DatabaseError>;

    /// Replace only the assignee and `updated_at` of a live item.
    async fn set_work_item_assignee(
        &self,
        id: Uuid,
        user_id: Uuid,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError>;

    async fn soft_delete_work_item(&self, id: Uuid) -> Result<bool, DatabaseError>;

    // ── Assignment eligibility ──────────────────────────────────────

    /// Active users who co-work the group or belong to its organization,
    /// each once, in creation order.
    async fn list_eligible_assignees(&self, group_id: Uuid) -> Result<Vec<User>, DatabaseError>;

    /// Whether the user co-works the group or belongs to its organization.
    /// Ignores the active flag.
    async fn is_group_co_worker_or_member(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, DatabaseError>;

    // ── Preferences ─────────────────────────────────────────────────

    async fn get_preferences(&self, user_id: Uuid)
    -> Result<Option<UserPreferences>, DatabaseError>;

    /// Insert or wholesale replace.
    async fn set_preferences(&self, prefs: &UserPreferences) -> Result<(), DatabaseError>;
}
