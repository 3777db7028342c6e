//! Work-item tracker: entities, their service layer and HTTP routes.

pub mod assignment;
pub mod listing;
pub mod model;
pub mod routes;
pub mod service;

pub use assignment::AssignmentPolicy;
pub use listing::{ListQuery, Page, SortField, SortOrder};
pub use routes::{TrackerRouteState, tracker_routes};
pub use service::{Tracker, TrackerResult};
