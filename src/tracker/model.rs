//! Tracker data model: the entity records and the request bodies that
//! create or overwrite them.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single value in a work item's property bag.
///
/// Deserialization tries the variants in order, so JSON numbers become
/// `Number`, RFC 3339 strings become `Date`, and any other string is `Text`.
/// Numbers are held as `f64`: integers beyond 2^53 lose precision and come
/// back as the nearest representable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Number(f64),
    Date(DateTime<Utc>),
    Text(String),
}

impl PropertyValue {
    fn rank(&self) -> u8 {
        match self {
            PropertyValue::Number(_) => 0,
            PropertyValue::Date(_) => 1,
            PropertyValue::Text(_) => 2,
        }
    }

    /// Total order over property values: natural order within a variant,
    /// `Number < Date < Text` across variants.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (PropertyValue::Number(a), PropertyValue::Number(b)) => a.total_cmp(b),
            (PropertyValue::Date(a), PropertyValue::Date(b)) => a.cmp(b),
            (PropertyValue::Text(a), PropertyValue::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::Text(s.to_string())
    }
}

impl From<f64> for PropertyValue {
    fn from(n: f64) -> Self {
        PropertyValue::Number(n)
    }
}

impl From<DateTime<Utc>> for PropertyValue {
    fn from(d: DateTime<Utc>) -> Self {
        PropertyValue::Date(d)
    }
}

/// Extension fields attached to a work item, keyed by name.
pub type PropertyBag = BTreeMap<String, PropertyValue>;

/// An organization owning groups and grouping member users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// An organization together with its member ids.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationDetail {
    #[serde(flatten)]
    pub organization: Organization,
    pub member_ids: Vec<Uuid>,
}

/// A user. `is_active == false` is the soft-delete marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A group of work items owned by exactly one organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItemGroup {
    pub id: Uuid,
    pub name: String,
    pub organization_id: Uuid,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl WorkItemGroup {
    pub fn new(name: impl Into<String>, organization_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            organization_id,
            is_deleted: false,
            created_at: now,
            last_updated: now,
        }
    }
}

/// Row of the group listing: the group plus its live item count.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub id: Uuid,
    pub name: String,
    pub organization_id: Uuid,
    pub item_count: u64,
    pub last_updated: DateTime<Utc>,
}

/// A group with its co-workers and live items.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDetail {
    #[serde(flatten)]
    pub group: WorkItemGroup,
    pub co_worker_ids: Vec<Uuid>,
    pub items: Vec<WorkItem>,
}

/// A trackable unit of work inside a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItem {
    pub id: Uuid,
    pub title: String,
    /// Free-form workflow state; no transitions are enforced.
    pub state: String,
    pub assignee_id: Option<Uuid>,
    /// Owning group. Never rewritten after creation.
    pub work_item_group_id: Uuid,
    pub is_deleted: bool,
    #[serde(default)]
    pub properties: PropertyBag,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkItem {
    pub fn new(group_id: Uuid, title: impl Into<String>, state: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            state: state.into(),
            assignee_id: None,
            work_item_group_id: group_id,
            is_deleted: false,
            properties: PropertyBag::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder: set assignee.
    pub fn with_assignee(mut self, user_id: Uuid) -> Self {
        self.assignee_id = Some(user_id);
        self
    }

    /// Builder: set one property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

// ── Request bodies ──────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrganization {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationUpdate {
    pub name: String,
}

/// Missing fields deserialize as empty so validation can report them as a
/// client error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkItemGroup {
    pub name: String,
    pub organization_id: Uuid,
    #[serde(default)]
    pub co_worker_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupUpdate {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkItem {
    pub title: String,
    #[serde(default)]
    pub state: String,
    pub work_item_group_id: Uuid,
    #[serde(default)]
    pub assignee_id: Option<Uuid>,
    #[serde(default)]
    pub properties: PropertyBag,
}

/// Full overwrite of a work item's mutable fields. The owning group is not
/// part of it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItemUpdate {
    pub title: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub assignee_id: Option<Uuid>,
    #[serde(default)]
    pub properties: PropertyBag,
}
