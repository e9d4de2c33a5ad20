use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RequestStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Draft => "draft",
            RequestStatus::Submitted => "submitted",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RequestKind {
    Timesheet,
    Expense,
    Leave,
}

impl RequestKind {
    /// Resolves the plural collection name used in URLs (`timesheets`, `expenses`, `leaves`)
    pub fn from_plural(segment: &str) -> Option<Self> {
        match segment {
            "timesheets" => Some(RequestKind::Timesheet),
            "expenses" => Some(RequestKind::Expense),
            "leaves" => Some(RequestKind::Leave),
            _ => None,
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            RequestKind::Timesheet => "timesheets",
            RequestKind::Expense => "expenses",
            RequestKind::Leave => "leaves",
        }
    }

    /// Capitalised name for messages ("Timesheet not found")
    pub fn title(&self) -> &'static str {
        match self {
            RequestKind::Timesheet => "Timesheet",
            RequestKind::Expense => "Expense",
            RequestKind::Leave => "Leave",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TimesheetDetails {
    #[schema(example = 42)]
    pub project_id: u64,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = 7.5)]
    pub hours: f64,
    #[schema(example = "Integration work")]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ExpenseDetails {
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = 120.5)]
    pub amount: f64,
    #[schema(example = "Client dinner")]
    pub description: String,
    /// Opaque reference handed out by the upload service
    #[schema(example = "receipts/2026/01/abc.pdf", nullable = true)]
    pub receipt_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LeaveDetails {
    #[schema(example = 1)]
    pub leave_type_id: u64,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-07", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Family trip")]
    pub reason: String,
    /// Stamped when the leave is submitted
    #[schema(format = "date-time", value_type = String, nullable = true)]
    pub applied_at: Option<DateTime<Utc>>,
}

/// Kind-specific payload of a request; the tag doubles as the kind discriminant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RequestDetails {
    Timesheet(TimesheetDetails),
    Expense(ExpenseDetails),
    Leave(LeaveDetails),
}

impl RequestDetails {
    pub fn kind(&self) -> RequestKind {
        match self {
            RequestDetails::Timesheet(_) => RequestKind::Timesheet,
            RequestDetails::Expense(_) => RequestKind::Expense,
            RequestDetails::Leave(_) => RequestKind::Leave,
        }
    }

    pub fn as_leave(&self) -> Option<&LeaveDetails> {
        match self {
            RequestDetails::Leave(leave) => Some(leave),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: u64,
    /// The employee the request is about; fixed at creation
    pub owner_id: u64,
    pub status: RequestStatus,
    pub approver_id: Option<u64>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub details: RequestDetails,
}

impl Request {
    pub fn kind(&self) -> RequestKind {
        self.details.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strum::IntoEnumIterator;

    #[test]
    fn plural_segments_round_trip_to_tables() {
        for kind in RequestKind::iter() {
            assert_eq!(RequestKind::from_plural(kind.table()), Some(kind));
        }
        assert_eq!(RequestKind::from_plural("payrolls"), None);
    }

    #[test]
    fn serializes_with_kind_tag_and_flat_details() {
        let now = Utc::now();
        let request = Request {
            id: 7,
            owner_id: 3,
            status: RequestStatus::Draft,
            approver_id: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
            details: RequestDetails::Expense(ExpenseDetails {
                date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
                amount: 12.5,
                description: "Taxi".into(),
                receipt_ref: Some("r-1".into()),
            }),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["kind"], json!("expense"));
        assert_eq!(value["status"], json!("draft"));
        assert_eq!(value["receipt_ref"], json!("r-1"));
        assert_eq!(value["owner_id"], json!(3));
    }

    #[test]
    fn status_strings_match_serde_names() {
        for status in [
            RequestStatus::Draft,
            RequestStatus::Submitted,
            RequestStatus::Approved,
            RequestStatus::Rejected,
        ] {
            assert_eq!(serde_json::to_value(status).unwrap(), json!(status.as_str()));
            assert_eq!(status.as_str().parse::<RequestStatus>().unwrap(), status);
        }
    }
}
