//! Persistence boundary for the workflow.
//!
//! Two backends implement [`WorkflowStore`]: MySQL through sqlx for the
//! running service, and an in-memory map set for tests and local runs.

pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::model::{
    holiday::Holiday,
    leave_balance::LeaveBalance,
    leave_type::LeaveType,
    request::{Request, RequestDetails, RequestKind, RequestStatus},
    user::User,
};
use crate::workflow::{authz::ListScope, error::WorkflowResult};

/// Approver fields written by approve/reject
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub approver_id: u64,
    /// `None` clears any earlier reason
    pub rejection_reason: Option<String>,
}

/// Days taken from the ledger in the same write as a leave approval
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalanceDebit {
    pub user_id: u64,
    pub leave_type_id: u64,
    pub year: i32,
    pub days: i32,
}

/// A guarded status change. Stores apply it only while the request is
/// still in `from`, and report `false` when it is not.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub kind: RequestKind,
    pub id: u64,
    pub from: RequestStatus,
    pub to: RequestStatus,
    pub decision: Option<Decision>,
    pub applied_at: Option<DateTime<Utc>>,
    pub debit: Option<BalanceDebit>,
}

#[async_trait]
pub trait WorkflowStore: Send + Sync {
    async fn find_user(&self, id: u64) -> WorkflowResult<Option<User>>;

    /// Active users whose manager is `manager_id`
    async fn managed_user_ids(&self, manager_id: u64) -> WorkflowResult<Vec<u64>>;

    async fn active_user_ids(&self) -> WorkflowResult<Vec<u64>>;

    /// Inserts a new draft request
    async fn insert_request(&self, owner_id: u64, details: &RequestDetails) -> WorkflowResult<Request>;

    async fn find_request(&self, kind: RequestKind, id: u64) -> WorkflowResult<Option<Request>>;

    /// Rewrites the kind-specific fields while the request is still a draft
    async fn update_draft(&self, id: u64, details: &RequestDetails) -> WorkflowResult<bool>;

    async fn delete_draft(&self, kind: RequestKind, id: u64) -> WorkflowResult<bool>;

    async fn transition(&self, change: &Transition) -> WorkflowResult<bool>;

    async fn list_requests(&self, kind: RequestKind, scope: &ListScope) -> WorkflowResult<Vec<Request>>;

    async fn find_leave_type(&self, id: u64) -> WorkflowResult<Option<LeaveType>>;

    async fn active_leave_types(&self) -> WorkflowResult<Vec<LeaveType>>;

    async fn find_balance(&self, user_id: u64, leave_type_id: u64, year: i32) -> WorkflowResult<Option<i32>>;

    async fn balances_for_user(&self, user_id: u64, year: i32) -> WorkflowResult<Vec<LeaveBalance>>;

    /// Atomically adds `delta` to the row, creating it when missing
    async fn adjust_balance(&self, user_id: u64, leave_type_id: u64, delta: i32, year: i32) -> WorkflowResult<i32>;

    /// Returns `true` when the row was created, `false` when one already existed
    async fn insert_balance_if_absent(&self, balance: &LeaveBalance) -> WorkflowResult<bool>;

    /// Recurring holidays plus one-off holidays dated in `year`
    async fn holidays_for_year(&self, year: i32) -> WorkflowResult<Vec<Holiday>>;

    async fn all_holidays(&self) -> WorkflowResult<Vec<Holiday>>;

    async fn insert_holiday(&self, name: &str, date: NaiveDate, is_recurring: bool) -> WorkflowResult<Holiday>;
}
