use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Holiday {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Christmas Day")]
    pub name: String,
    #[schema(example = "2025-12-25", format = "date", value_type = String)]
    pub date: NaiveDate,
    /// When set, only month and day matter and the holiday repeats every year
    pub is_recurring: bool,
}
