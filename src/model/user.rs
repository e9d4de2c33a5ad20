use serde::{Deserialize, Serialize};

use crate::model::role::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub role: Role,
    /// The manager this user reports to; drives "managed employee" checks
    pub manager_id: Option<u64>,
    pub is_active: bool,
}
