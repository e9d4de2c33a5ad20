//! Per (user, leave type, year) counters of remaining leave days.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::model::leave_balance::LeaveBalance;
use crate::store::WorkflowStore;
use crate::workflow::error::WorkflowResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum InitStatus {
    Created,
    AlreadyExists,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct InitOutcome {
    #[schema(example = 1)]
    pub leave_type_id: u64,
    #[schema(example = "annual")]
    pub code: String,
    pub status: InitStatus,
    /// Seeded balance when created
    #[schema(nullable = true)]
    pub balance: Option<i32>,
    #[schema(nullable = true)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct UserInitOutcome {
    pub user_id: u64,
    pub outcomes: Vec<InitOutcome>,
}

/// Starting allowance for a leave type: its cap when set, else a per-code default
pub fn default_allowance(code: &str, max_days: i32) -> i32 {
    if max_days > 0 {
        return max_days;
    }

    match code {
        "annual" => 20,
        "sick" => 12,
        "medical" => 15,
        "casual" => 7,
        "maternity" => 180,
        "paternity" => 14,
        _ => 10,
    }
}

pub struct LeaveLedger {
    store: Arc<dyn WorkflowStore>,
}

impl LeaveLedger {
    pub fn new(store: Arc<dyn WorkflowStore>) -> Self {
        Self { store }
    }

    /// Current balance; 0 when no row exists
    pub async fn check(&self, user_id: u64, leave_type_id: u64, year: i32) -> WorkflowResult<i32> {
        Ok(self
            .store
            .find_balance(user_id, leave_type_id, year)
            .await?
            .unwrap_or(0))
    }

    /// Adds `delta` (negative to debit) and returns the new balance
    pub async fn adjust(&self, user_id: u64, leave_type_id: u64, delta: i32, year: i32) -> WorkflowResult<i32> {
        let balance = self
            .store
            .adjust_balance(user_id, leave_type_id, delta, year)
            .await?;
        info!(user_id, leave_type_id, year, delta, balance, "Leave balance adjusted");
        Ok(balance)
    }

    pub async fn balances(&self, user_id: u64, year: i32) -> WorkflowResult<Vec<LeaveBalance>> {
        self.store.balances_for_user(user_id, year).await
    }

    /// Seeds a row for every active leave type with a default balance that
    /// the user does not have yet for `year`. Existing rows are left alone.
    pub async fn initialize_defaults(&self, user_id: u64, year: i32) -> WorkflowResult<Vec<InitOutcome>> {
        let leave_types = self.store.active_leave_types().await?;
        let mut outcomes = Vec::new();

        for leave_type in leave_types.into_iter().filter(|lt| lt.has_default_balance) {
            let balance = default_allowance(&leave_type.code, leave_type.max_days);
            let row = LeaveBalance {
                user_id,
                leave_type_id: leave_type.id,
                year,
                balance,
            };

            let outcome = match self.store.insert_balance_if_absent(&row).await {
                Ok(true) => InitOutcome {
                    leave_type_id: leave_type.id,
                    code: leave_type.code,
                    status: InitStatus::Created,
                    balance: Some(balance),
                    error: None,
                },
                Ok(false) => InitOutcome {
                    leave_type_id: leave_type.id,
                    code: leave_type.code,
                    status: InitStatus::AlreadyExists,
                    balance: None,
                    error: None,
                },
                Err(e) => {
                    warn!(error = %e, user_id, leave_type_id = leave_type.id, year, "Failed to seed leave balance");
                    InitOutcome {
                        leave_type_id: leave_type.id,
                        code: leave_type.code,
                        status: InitStatus::Error,
                        balance: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    pub async fn initialize_defaults_for_all_active_users(&self, year: i32) -> WorkflowResult<Vec<UserInitOutcome>> {
        let user_ids = self.store.active_user_ids().await?;
        let mut results = Vec::with_capacity(user_ids.len());

        for user_id in user_ids {
            let outcomes = self.initialize_defaults(user_id, year).await?;
            results.push(UserInitOutcome { user_id, outcomes });
        }

        info!(year, users = results.len(), "Default leave balances initialized");
        Ok(results)
    }
}
