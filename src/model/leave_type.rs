use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "code": "annual",
        "name": "Annual Leave",
        "max_days": 20,
        "is_active": true,
        "has_default_balance": true
    })
)]
pub struct LeaveType {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "annual")]
    pub code: String,

    #[schema(example = "Annual Leave")]
    pub name: String,

    /// 0 means unlimited and untracked
    #[schema(example = 20)]
    pub max_days: i32,

    pub is_active: bool,

    pub has_default_balance: bool,
}

impl LeaveType {
    /// Only capped leave types are counted against the balance ledger
    pub fn is_tracked(&self) -> bool {
        self.max_days > 0
    }
}
