//! yatt-tasks: work-item tracking service.

pub mod config;
pub mod error;
pub mod preferences;
pub mod server;
pub mod store;
pub mod tracker;
