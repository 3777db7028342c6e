//! Work-item listing: filter by group, typed sort, then paginate.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::config::PagingConfig;
use crate::error::TrackerError;
use crate::tracker::model::WorkItem;
use crate::tracker::service::{Tracker, TrackerResult};

const PROPERTY_PREFIX: &str = "properties.";

/// A field work items can be ordered by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortField {
    Id,
    Title,
    State,
    AssigneeId,
    CreatedAt,
    UpdatedAt,
    /// A property-bag key, matched case-sensitively.
    Property(String),
}

impl FromStr for SortField {
    type Err = TrackerError;

    /// Built-in names are case-insensitive and accept camelCase or
    /// snake_case; `properties.<key>` selects a property.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.len() > PROPERTY_PREFIX.len()
            && trimmed.is_char_boundary(PROPERTY_PREFIX.len())
            && trimmed[..PROPERTY_PREFIX.len()].eq_ignore_ascii_case(PROPERTY_PREFIX)
        {
            return Ok(SortField::Property(
                trimmed[PROPERTY_PREFIX.len()..].to_string(),
            ));
        }

        let normalized: String = trimmed
            .chars()
            .filter(|c| *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "id" => Ok(SortField::Id),
            "title" => Ok(SortField::Title),
            "state" => Ok(SortField::State),
            "assigneeid" => Ok(SortField::AssigneeId),
            "createdat" => Ok(SortField::CreatedAt),
            "updatedat" => Ok(SortField::UpdatedAt),
            _ => Err(TrackerError::invalid(format!("Unknown sort field: {raw}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// `desc` in any case is descending; anything else is ascending.
    pub fn from_param(raw: Option<&str>) -> Self {
        match raw {
            Some(s) if s.trim().eq_ignore_ascii_case("desc") => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

/// Query string of `GET /work-item-groups/{id}/work-items`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

/// A validated listing request.
#[derive(Debug, Clone, PartialEq)]
pub struct ListRequest {
    pub page: u32,
    pub page_size: u32,
    pub sort_by: Option<SortField>,
    pub order: SortOrder,
}

impl ListRequest {
    /// Clamp paging into range and parse the sort field.
    pub fn from_query(query: &ListQuery, paging: &PagingConfig) -> TrackerResult<Self> {
        let max = i64::from(paging.max_page_size.max(1));
        let page = query.page.unwrap_or(1).clamp(1, i64::from(u32::MAX));
        let page_size = query
            .page_size
            .unwrap_or(i64::from(paging.default_page_size))
            .clamp(1, max);

        let sort_by = match query.sort_by.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => Some(s.parse::<SortField>()?),
            _ => None,
        };

        Ok(Self {
            page: page as u32,
            page_size: page_size as u32,
            sort_by,
            order: SortOrder::from_param(query.sort_order.as_deref()),
        })
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Matching items before pagination.
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
    pub items: Vec<T>,
}

fn compare(a: &WorkItem, b: &WorkItem, field: &SortField, order: SortOrder) -> Ordering {
    match field {
        SortField::Id => order.apply(a.id.cmp(&b.id)),
        SortField::Title => order.apply(a.title.cmp(&b.title)),
        SortField::State => order.apply(a.state.cmp(&b.state)),
        // None < Some, so unassigned items lead an ascending sort.
        SortField::AssigneeId => order.apply(a.assignee_id.cmp(&b.assignee_id)),
        SortField::CreatedAt => order.apply(a.created_at.cmp(&b.created_at)),
        SortField::UpdatedAt => order.apply(a.updated_at.cmp(&b.updated_at)),
        SortField::Property(key) => match (a.properties.get(key), b.properties.get(key)) {
            (Some(x), Some(y)) => order.apply(x.compare(y)),
            // Missing keys trail in both directions.
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    }
}

/// Stable sort; equal keys keep their incoming order.
pub fn sort_items(items: &mut [WorkItem], field: &SortField, order: SortOrder) {
    items.sort_by(|a, b| compare(a, b, field, order));
}

/// Slice out page `page` (1-based) of `page_size` items.
pub fn paginate<T>(items: Vec<T>, page: u32, page_size: u32) -> Vec<T> {
    let size = page_size.max(1) as usize;
    let skip = (page.max(1) as usize - 1).saturating_mul(size);
    items.into_iter().skip(skip).take(size).collect()
}

impl Tracker {
    /// Live items of a group, sorted and paginated. A missing group yields
    /// an empty page.
    pub async fn list_work_items(
        &self,
        group_id: Uuid,
        query: &ListQuery,
    ) -> TrackerResult<Page<WorkItem>> {
        let request = ListRequest::from_query(query, &self.paging)?;
        let mut items = self.db.list_group_work_items(group_id).await?;

        if let Some(field) = &request.sort_by {
            sort_items(&mut items, field, request.order);
        }

        let total_count = items.len() as u64;
        let items = paginate(items, request.page, request.page_size);
        debug!(
            group = %group_id,
            total_count,
            page = request.page,
            returned = items.len(),
            "Listed work items"
        );

        Ok(Page {
            total_count,
            page: request.page,
            page_size: request.page_size,
            items,
        })
    }
}
