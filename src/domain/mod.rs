pub mod user;
pub mod game;
pub mod announcement;
pub mod registration;

pub use user::*;
pub use game::*;
pub use announcement::*;
pub use registration::*;

use std::collections::BTreeMap;
use serde::Serialize;

/// Action name → allowed, as reported to clients.
pub type PermissionMap = BTreeMap<String, bool>;

/// A record annotated with the caller's permissions on it.
#[derive(Debug, Clone, Serialize)]
pub struct WithPermissions<T> {
    #[serde(flatten)]
    pub record: T,
    pub permissions: PermissionMap,
}

/// One page of search or listing results plus the unpaginated total.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub count: i64,
}
