use serde::{Deserialize, Serialize};

/// Actor token claims issued by the upstream identity service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    /// username
    pub sub: String,
    /// `employee`, `manager` or `admin`
    pub role: String,
    pub exp: usize,
}
