//! libSQL implementation of the async `Database` trait.
//!
//! Supports local file and in-memory databases. Identities are stored as
//! UUID text, timestamps as RFC 3339 text, flags as 0/1 integers and the
//! work-item property bag as a JSON object.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::preferences::model::UserPreferences;
use crate::store::migrations;
use crate::store::traits::Database;
use crate::tracker::model::{
    GroupSummary, Organization, PropertyBag, User, WorkItem, WorkItemGroup,
};

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations. Multi-row
/// writes run in a transaction on that connection, so writers take `gate`
/// exclusively and readers share it; a reader never observes a transaction
/// half-applied.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
    gate: RwLock<()>,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    DatabaseError::Pool(format!("Failed to create database directory: {e}"))
                })?;
            }
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db)?;
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let backend = Self::from_database(db)?;
        backend.run_migrations().await?;
        Ok(backend)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
            gate: RwLock::new(()),
        })
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }

    async fn query_users(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
        context: &str,
    ) -> Result<Vec<User>, DatabaseError> {
        let _read = self.gate.read().await;
        let mut rows = self
            .conn()
            .query(sql, params)
            .await
            .map_err(|e| DatabaseError::from_libsql(context, e))?;

        let mut users = Vec::new();
        while let Some(row) = next_row(&mut rows, context).await? {
            users.push(row_to_user(&row)?);
        }
        Ok(users)
    }

    async fn query_ids(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
        context: &str,
    ) -> Result<Vec<Uuid>, DatabaseError> {
        let _read = self.gate.read().await;
        let mut rows = self
            .conn()
            .query(sql, params)
            .await
            .map_err(|e| DatabaseError::from_libsql(context, e))?;

        let mut ids = Vec::new();
        while let Some(row) = next_row(&mut rows, context).await? {
            let raw: String = row
                .get(0)
                .map_err(|e| DatabaseError::Query(format!("{context}.id: {e}")))?;
            ids.push(parse_uuid(&raw, context)?);
        }
        Ok(ids)
    }

    /// Run a single write statement and return the affected row count.
    async fn write(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
        context: &str,
    ) -> Result<u64, DatabaseError> {
        let _write = self.gate.write().await;
        self.conn()
            .execute(sql, params)
            .await
            .map_err(|e| DatabaseError::from_libsql(context, e))
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str, field: &str) -> Result<DateTime<Utc>, DatabaseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(ndt.and_utc());
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(ndt.and_utc());
    }
    Err(DatabaseError::Query(format!("{field}: bad timestamp {s:?}")))
}

fn parse_uuid(s: &str, context: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|e| DatabaseError::Query(format!("{context}: bad id {s:?}: {e}")))
}

async fn next_row(
    rows: &mut libsql::Rows,
    context: &str,
) -> Result<Option<libsql::Row>, DatabaseError> {
    rows.next()
        .await
        .map_err(|e| DatabaseError::Query(format!("{context} row: {e}")))
}

fn text(row: &libsql::Row, idx: i32, field: &str) -> Result<String, DatabaseError> {
    row.get::<String>(idx)
        .map_err(|e| DatabaseError::Query(format!("{field}: {e}")))
}

fn timestamp(row: &libsql::Row, idx: i32, field: &str) -> Result<DateTime<Utc>, DatabaseError> {
    parse_datetime(&text(row, idx, field)?, field)
}

fn integer(row: &libsql::Row, idx: i32, field: &str) -> Result<i64, DatabaseError> {
    row.get::<i64>(idx)
        .map_err(|e| DatabaseError::Query(format!("{field}: {e}")))
}

fn flag(row: &libsql::Row, idx: i32, field: &str) -> Result<bool, DatabaseError> {
    match integer(row, idx, field)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(DatabaseError::Query(format!("{field}: bad flag {other}"))),
    }
}

/// Read a nullable text column; anything other than NULL or text is an error.
fn opt_text(row: &libsql::Row, idx: i32, field: &str) -> Result<Option<String>, DatabaseError> {
    match row
        .get_value(idx)
        .map_err(|e| DatabaseError::Query(format!("{field}: {e}")))?
    {
        libsql::Value::Null => Ok(None),
        libsql::Value::Text(s) => Ok(Some(s)),
        other => Err(DatabaseError::Query(format!(
            "{field}: expected text, got {other:?}"
        ))),
    }
}

const ORG_COLUMNS: &str = "id, name, created_at, updated_at";

const USER_COLUMNS: &str = "id, name, email, is_active, created_at, updated_at";

const GROUP_COLUMNS: &str = "id, name, organization_id, is_deleted, created_at, last_updated";

const ITEM_COLUMNS: &str = "id, title, state, assignee_id, work_item_group_id, is_deleted, properties, created_at, updated_at";

fn row_to_organization(row: &libsql::Row) -> Result<Organization, DatabaseError> {
    Ok(Organization {
        id: parse_uuid(&text(row, 0, "organization.id")?, "organization.id")?,
        name: text(row, 1, "organization.name")?,
        created_at: timestamp(row, 2, "organization.created_at")?,
        updated_at: timestamp(row, 3, "organization.updated_at")?,
    })
}

fn row_to_user(row: &libsql::Row) -> Result<User, DatabaseError> {
    Ok(User {
        id: parse_uuid(&text(row, 0, "user.id")?, "user.id")?,
        name: text(row, 1, "user.name")?,
        email: text(row, 2, "user.email")?,
        is_active: flag(row, 3, "user.is_active")?,
        created_at: timestamp(row, 4, "user.created_at")?,
        updated_at: timestamp(row, 5, "user.updated_at")?,
    })
}

fn row_to_group(row: &libsql::Row) -> Result<WorkItemGroup, DatabaseError> {
    Ok(WorkItemGroup {
        id: parse_uuid(&text(row, 0, "group.id")?, "group.id")?,
        name: text(row, 1, "group.name")?,
        organization_id: parse_uuid(&text(row, 2, "group.organization_id")?, "group.organization_id")?,
        is_deleted: flag(row, 3, "group.is_deleted")?,
        created_at: timestamp(row, 4, "group.created_at")?,
        last_updated: timestamp(row, 5, "group.last_updated")?,
    })
}

fn row_to_work_item(row: &libsql::Row) -> Result<WorkItem, DatabaseError> {
    let assignee_id = opt_text(row, 3, "work_item.assignee_id")?
        .filter(|s| !s.is_empty())
        .map(|s| parse_uuid(&s, "work_item.assignee_id"))
        .transpose()?;

    let properties_str = text(row, 6, "work_item.properties")?;
    let properties: PropertyBag = serde_json::from_str(&properties_str)
        .map_err(|e| DatabaseError::Serialization(format!("work_item.properties: {e}")))?;

    Ok(WorkItem {
        id: parse_uuid(&text(row, 0, "work_item.id")?, "work_item.id")?,
        title: text(row, 1, "work_item.title")?,
        state: text(row, 2, "work_item.state")?,
        assignee_id,
        work_item_group_id: parse_uuid(
            &text(row, 4, "work_item.work_item_group_id")?,
            "work_item.work_item_group_id",
        )?,
        is_deleted: flag(row, 5, "work_item.is_deleted")?,
        properties,
        created_at: timestamp(row, 7, "work_item.created_at")?,
        updated_at: timestamp(row, 8, "work_item.updated_at")?,
    })
}

/// Convert an optional id to a libsql Value.
fn opt_id(id: Option<Uuid>) -> libsql::Value {
    match id {
        Some(id) => libsql::Value::Text(id.to_string()),
        None => libsql::Value::Null,
    }
}

fn serialize_properties(properties: &PropertyBag) -> Result<String, DatabaseError> {
    serde_json::to_string(properties).map_err(|e| DatabaseError::Serialization(e.to_string()))
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        let _write = self.gate.write().await;
        migrations::run_migrations(self.conn()).await
    }

    // ── Organizations ───────────────────────────────────────────────

    async fn insert_organization(&self, org: &Organization) -> Result<(), DatabaseError> {
        self.write(
            "INSERT INTO organizations (id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                org.id.to_string(),
                org.name.as_str(),
                org.created_at.to_rfc3339(),
                org.updated_at.to_rfc3339(),
            ],
            "insert_organization",
        )
        .await?;
        debug!(id = %org.id, "Organization created");
        Ok(())
    }

    async fn get_organization(&self, id: Uuid) -> Result<Option<Organization>, DatabaseError> {
        let _read = self.gate.read().await;
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {ORG_COLUMNS} FROM organizations WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::from_libsql("get_organization", e))?;

        match next_row(&mut rows, "get_organization").await? {
            Some(row) => Ok(Some(row_to_organization(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_organizations(&self) -> Result<Vec<Organization>, DatabaseError> {
        let _read = self.gate.read().await;
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {ORG_COLUMNS} FROM organizations ORDER BY rowid"),
                (),
            )
            .await
            .map_err(|e| DatabaseError::from_libsql("list_organizations", e))?;

        let mut orgs = Vec::new();
        while let Some(row) = next_row(&mut rows, "list_organizations").await? {
            orgs.push(row_to_organization(&row)?);
        }
        Ok(orgs)
    }

    async fn update_organization(&self, org: &Organization) -> Result<bool, DatabaseError> {
        let count = self
            .write(
                "UPDATE organizations SET name = ?1, updated_at = ?2 WHERE id = ?3",
                params![org.name.as_str(), org.updated_at.to_rfc3339(), org.id.to_string()],
                "update_organization",
            )
            .await?;
        Ok(count > 0)
    }

    async fn add_organization_member(
        &self,
        org_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), DatabaseError> {
        self.write(
            "INSERT OR IGNORE INTO organization_members (organization_id, user_id) VALUES (?1, ?2)",
            params![org_id.to_string(), user_id.to_string()],
            "add_organization_member",
        )
        .await?;
        Ok(())
    }

    async fn remove_organization_member(
        &self,
        org_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, DatabaseError> {
        let count = self
            .write(
                "DELETE FROM organization_members WHERE organization_id = ?1 AND user_id = ?2",
                params![org_id.to_string(), user_id.to_string()],
                "remove_organization_member",
            )
            .await?;
        Ok(count > 0)
    }

    async fn list_organization_member_ids(
        &self,
        org_id: Uuid,
    ) -> Result<Vec<Uuid>, DatabaseError> {
        self.query_ids(
            "SELECT user_id FROM organization_members WHERE organization_id = ?1 ORDER BY rowid",
            params![org_id.to_string()],
            "list_organization_member_ids",
        )
        .await
    }

    // ── Users ───────────────────────────────────────────────────────

    async fn insert_user(&self, user: &User) -> Result<(), DatabaseError> {
        self.write(
            "INSERT INTO users (id, name, email, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user.id.to_string(),
                user.name.as_str(),
                user.email.as_str(),
                user.is_active as i64,
                user.created_at.to_rfc3339(),
                user.updated_at.to_rfc3339(),
            ],
            "insert_user",
        )
        .await?;
        debug!(id = %user.id, "User created");
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let mut users = self
            .query_users(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id.to_string()],
                "get_user",
            )
            .await?;
        Ok(users.pop())
    }

    async fn list_active_users(&self) -> Result<Vec<User>, DatabaseError> {
        self.query_users(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE is_active = 1 ORDER BY rowid"),
            (),
            "list_active_users",
        )
        .await
    }

    async fn update_user(&self, user: &User) -> Result<bool, DatabaseError> {
        let count = self
            .write(
                "UPDATE users SET name = ?1, email = ?2, is_active = ?3, updated_at = ?4 WHERE id = ?5",
                params![
                    user.name.as_str(),
                    user.email.as_str(),
                    user.is_active as i64,
                    user.updated_at.to_rfc3339(),
                    user.id.to_string(),
                ],
                "update_user",
            )
            .await?;
        Ok(count > 0)
    }

    async fn set_user_active(&self, id: Uuid, active: bool) -> Result<bool, DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let count = self
            .write(
                "UPDATE users SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
                params![active as i64, now, id.to_string()],
                "set_user_active",
            )
            .await?;
        Ok(count > 0)
    }

    // ── Groups ──────────────────────────────────────────────────────

    async fn insert_group(
        &self,
        group: &WorkItemGroup,
        co_worker_ids: &[Uuid],
    ) -> Result<(), DatabaseError> {
        let _write = self.gate.write().await;
        let tx = self
            .conn()
            .transaction()
            .await
            .map_err(|e| DatabaseError::from_libsql("insert_group begin", e))?;

        let inserted = async {
            tx.execute(
                "INSERT INTO work_item_groups (id, name, organization_id, is_deleted, created_at, last_updated)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    group.id.to_string(),
                    group.name.as_str(),
                    group.organization_id.to_string(),
                    group.is_deleted as i64,
                    group.created_at.to_rfc3339(),
                    group.last_updated.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::from_libsql("insert_group", e))?;

            for user_id in co_worker_ids {
                tx.execute(
                    "INSERT OR IGNORE INTO group_co_workers (group_id, user_id) VALUES (?1, ?2)",
                    params![group.id.to_string(), user_id.to_string()],
                )
                .await
                .map_err(|e| DatabaseError::from_libsql("insert_group co_worker", e))?;
            }
            Ok::<(), DatabaseError>(())
        }
        .await;

        if let Err(e) = inserted {
            if let Err(rb) = tx.rollback().await {
                warn!(error = %rb, "insert_group rollback failed");
            }
            return Err(e);
        }

        tx.commit()
            .await
            .map_err(|e| DatabaseError::from_libsql("insert_group commit", e))?;
        debug!(id = %group.id, co_workers = co_worker_ids.len(), "Group created");
        Ok(())
    }

    async fn get_group(&self, id: Uuid) -> Result<Option<WorkItemGroup>, DatabaseError> {
        let _read = self.gate.read().await;
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {GROUP_COLUMNS} FROM work_item_groups WHERE id = ?1 AND is_deleted = 0"),
                params![id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::from_libsql("get_group", e))?;

        match next_row(&mut rows, "get_group").await? {
            Some(row) => Ok(Some(row_to_group(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_group_summaries(&self) -> Result<Vec<GroupSummary>, DatabaseError> {
        let _read = self.gate.read().await;
        let mut rows = self
            .conn()
            .query(
                "SELECT g.id, g.name, g.organization_id, g.last_updated,
                        (SELECT COUNT(*) FROM work_items i
                          WHERE i.work_item_group_id = g.id AND i.is_deleted = 0)
                 FROM work_item_groups g
                 WHERE g.is_deleted = 0
                 ORDER BY g.rowid",
                (),
            )
            .await
            .map_err(|e| DatabaseError::from_libsql("list_group_summaries", e))?;

        let mut groups = Vec::new();
        while let Some(row) = next_row(&mut rows, "list_group_summaries").await? {
            groups.push(GroupSummary {
                id: parse_uuid(&text(&row, 0, "group.id")?, "group.id")?,
                name: text(&row, 1, "group.name")?,
                organization_id: parse_uuid(
                    &text(&row, 2, "group.organization_id")?,
                    "group.organization_id",
                )?,
                last_updated: timestamp(&row, 3, "group.last_updated")?,
                item_count: integer(&row, 4, "group.item_count")?.max(0) as u64,
            });
        }
        Ok(groups)
    }

    async fn update_group(&self, group: &WorkItemGroup) -> Result<bool, DatabaseError> {
        let count = self
            .write(
                "UPDATE work_item_groups SET name = ?1, last_updated = ?2 WHERE id = ?3 AND is_deleted = 0",
                params![
                    group.name.as_str(),
                    group.last_updated.to_rfc3339(),
                    group.id.to_string(),
                ],
                "update_group",
            )
            .await?;
        Ok(count > 0)
    }

    async fn soft_delete_group(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let _write = self.gate.write().await;
        let now = Utc::now().to_rfc3339();
        let tx = self
            .conn()
            .transaction()
            .await
            .map_err(|e| DatabaseError::from_libsql("soft_delete_group begin", e))?;

        let cascaded = async {
            let groups = tx
                .execute(
                    "UPDATE work_item_groups SET is_deleted = 1, last_updated = ?1 WHERE id = ?2 AND is_deleted = 0",
                    params![now.as_str(), id.to_string()],
                )
                .await
                .map_err(|e| DatabaseError::from_libsql("soft_delete_group", e))?;
            if groups == 0 {
                return Ok::<(u64, u64), DatabaseError>((0, 0));
            }
            let items = tx
                .execute(
                    "UPDATE work_items SET is_deleted = 1, updated_at = ?1 WHERE work_item_group_id = ?2 AND is_deleted = 0",
                    params![now.as_str(), id.to_string()],
                )
                .await
                .map_err(|e| DatabaseError::from_libsql("soft_delete_group items", e))?;
            Ok::<(u64, u64), DatabaseError>((groups, items))
        }
        .await;

        let (groups, items) = match cascaded {
            Ok(counts) => counts,
            Err(e) => {
                if let Err(rb) = tx.rollback().await {
                    warn!(error = %rb, "soft_delete_group rollback failed");
                }
                return Err(e);
            }
        };

        tx.commit()
            .await
            .map_err(|e| DatabaseError::from_libsql("soft_delete_group commit", e))?;

        if groups > 0 {
            debug!(id = %id, items, "Group soft-deleted");
        }
        Ok(groups > 0)
    }

    async fn add_group_co_worker(&self, group_id: Uuid, user_id: Uuid) -> Result<(), DatabaseError> {
        self.write(
            "INSERT OR IGNORE INTO group_co_workers (group_id, user_id) VALUES (?1, ?2)",
            params![group_id.to_string(), user_id.to_string()],
            "add_group_co_worker",
        )
        .await?;
        Ok(())
    }

    async fn remove_group_co_worker(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, DatabaseError> {
        let count = self
            .write(
                "DELETE FROM group_co_workers WHERE group_id = ?1 AND user_id = ?2",
                params![group_id.to_string(), user_id.to_string()],
                "remove_group_co_worker",
            )
            .await?;
        Ok(count > 0)
    }

    async fn list_group_co_worker_ids(&self, group_id: Uuid) -> Result<Vec<Uuid>, DatabaseError> {
        self.query_ids(
            "SELECT user_id FROM group_co_workers WHERE group_id = ?1 ORDER BY rowid",
            params![group_id.to_string()],
            "list_group_co_worker_ids",
        )
        .await
    }

    // ── Work items ──────────────────────────────────────────────────

    async fn insert_work_item(&self, item: &WorkItem) -> Result<(), DatabaseError> {
        let properties = serialize_properties(&item.properties)?;
        self.write(
            "INSERT INTO work_items (id, title, state, assignee_id, work_item_group_id, is_deleted, properties, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                item.id.to_string(),
                item.title.as_str(),
                item.state.as_str(),
                opt_id(item.assignee_id),
                item.work_item_group_id.to_string(),
                item.is_deleted as i64,
                properties,
                item.created_at.to_rfc3339(),
                item.updated_at.to_rfc3339(),
            ],
            "insert_work_item",
        )
        .await?;
        debug!(id = %item.id, group = %item.work_item_group_id, "Work item created");
        Ok(())
    }

    async fn get_work_item(&self, id: Uuid) -> Result<Option<WorkItem>, DatabaseError> {
        let _read = self.gate.read().await;
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {ITEM_COLUMNS} FROM work_items WHERE id = ?1 AND is_deleted = 0"),
                params![id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::from_libsql("get_work_item", e))?;

        match next_row(&mut rows, "get_work_item").await? {
            Some(row) => Ok(Some(row_to_work_item(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_group_work_items(&self, group_id: Uuid) -> Result<Vec<WorkItem>, DatabaseError> {
        let _read = self.gate.read().await;
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {ITEM_COLUMNS} FROM work_items \
                     WHERE work_item_group_id = ?1 AND is_deleted = 0 \
                     ORDER BY rowid"
                ),
                params![group_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::from_libsql("list_group_work_items", e))?;

        let mut items = Vec::new();
        while let Some(row) = next_row(&mut rows, "list_group_work_items").await? {
            items.push(row_to_work_item(&row)?);
        }
        Ok(items)
    }

    async fn update_work_item(&self, item: &WorkItem) -> Result<bool, DatabaseError> {
        let properties = serialize_properties(&item.properties)?;
        let count = self
            .write(
                "UPDATE work_items SET title = ?1, state = ?2, assignee_id = ?3, properties = ?4, updated_at = ?5
                 WHERE id = ?6 AND is_deleted = 0",
                params![
                    item.title.as_str(),
                    item.state.as_str(),
                    opt_id(item.assignee_id),
                    properties,
                    item.updated_at.to_rfc3339(),
                    item.id.to_string(),
                ],
                "update_work_item",
            )
            .await?;
        Ok(count > 0)
    }

    async fn set_work_item_assignee(
        &self,
        id: Uuid,
        user_id: Uuid,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let count = self
            .write(
                "UPDATE work_items SET assignee_id = ?1, updated_at = ?2 WHERE id = ?3 AND is_deleted = 0",
                params![user_id.to_string(), updated_at.to_rfc3339(), id.to_string()],
                "set_work_item_assignee",
            )
            .await?;
        Ok(count > 0)
    }

    async fn soft_delete_work_item(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let count = self
            .write(
                "UPDATE work_items SET is_deleted = 1, updated_at = ?1 WHERE id = ?2 AND is_deleted = 0",
                params![now, id.to_string()],
                "soft_delete_work_item",
            )
            .await?;
        Ok(count > 0)
    }

    // ── Assignment eligibility ──────────────────────────────────────

    async fn list_eligible_assignees(&self, group_id: Uuid) -> Result<Vec<User>, DatabaseError> {
        self.query_users(
            &format!(
                "SELECT {USER_COLUMNS} FROM users
                 WHERE is_active = 1 AND (
                     id IN (SELECT user_id FROM group_co_workers WHERE group_id = ?1)
                     OR id IN (
                         SELECT m.user_id FROM organization_members m
                         JOIN work_item_groups g ON g.organization_id = m.organization_id
                         WHERE g.id = ?1 AND g.is_deleted = 0
                     )
                 )
                 ORDER BY rowid"
            ),
            params![group_id.to_string()],
            "list_eligible_assignees",
        )
        .await
    }

    async fn is_group_co_worker_or_member(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, DatabaseError> {
        let _read = self.gate.read().await;
        let mut rows = self
            .conn()
            .query(
                "SELECT EXISTS (
                     SELECT 1 FROM group_co_workers WHERE group_id = ?1 AND user_id = ?2
                 ) OR EXISTS (
                     SELECT 1 FROM organization_members m
                     JOIN work_item_groups g ON g.organization_id = m.organization_id
                     WHERE g.id = ?1 AND m.user_id = ?2
                 )",
                params![group_id.to_string(), user_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::from_libsql("is_group_co_worker_or_member", e))?;

        match next_row(&mut rows, "is_group_co_worker_or_member").await? {
            Some(row) => flag(&row, 0, "is_group_co_worker_or_member"),
            None => Ok(false),
        }
    }

    // ── Preferences ─────────────────────────────────────────────────

    async fn get_preferences(
        &self,
        user_id: Uuid,
    ) -> Result<Option<UserPreferences>, DatabaseError> {
        let _read = self.gate.read().await;
        let mut rows = self
            .conn()
            .query(
                "SELECT column_order, updated_at FROM user_preferences WHERE user_id = ?1",
                params![user_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::from_libsql("get_preferences", e))?;

        match next_row(&mut rows, "get_preferences").await? {
            Some(row) => {
                let columns_str = text(&row, 0, "preferences.columns")?;
                let column_order: Vec<String> = serde_json::from_str(&columns_str)
                    .map_err(|e| DatabaseError::Serialization(format!("column_order: {e}")))?;
                Ok(Some(UserPreferences {
                    user_id,
                    column_order,
                    updated_at: timestamp(&row, 1, "preferences.updated_at")?,
                }))
            }
            None => Ok(None),
        }
    }

    async fn set_preferences(&self, prefs: &UserPreferences) -> Result<(), DatabaseError> {
        let columns = serde_json::to_string(&prefs.column_order)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        self.write(
            "INSERT INTO user_preferences (user_id, column_order, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT (user_id) DO UPDATE SET column_order = ?2, updated_at = ?3",
            params![
                prefs.user_id.to_string(),
                columns,
                prefs.updated_at.to_rfc3339(),
            ],
            "set_preferences",
        )
        .await?;
        Ok(())
    }
}
