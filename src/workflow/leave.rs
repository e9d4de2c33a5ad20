//! Leave catalog, ledger and holiday operations exposed next to the lifecycle.

use chrono::NaiveDate;
use tracing::info;

use crate::model::{
    holiday::Holiday, leave_balance::LeaveBalance, leave_type::LeaveType, request::RequestKind,
    role::Role,
};
use crate::workflow::{
    Workflow,
    authz::{Actor, Operation, Owner},
    calendar,
    error::{WorkflowError, WorkflowResult},
    ledger::{InitOutcome, UserInitOutcome},
};

fn require_admin(actor: &Actor, action: &str) -> WorkflowResult<()> {
    if actor.role == Role::Admin {
        Ok(())
    } else {
        Err(WorkflowError::Forbidden(format!("Only admins can {action}")))
    }
}

impl Workflow {
    pub async fn leave_types(&self) -> WorkflowResult<Vec<LeaveType>> {
        self.store.active_leave_types().await
    }

    /// Balances of `user_id` (the actor when omitted) for `year`, visible
    /// under the same rules as viewing that user's leave.
    pub async fn leave_balances(
        &self,
        actor: &Actor,
        user_id: Option<u64>,
        year: i32,
    ) -> WorkflowResult<Vec<LeaveBalance>> {
        let user_id = user_id.unwrap_or(actor.id);
        let owner = self.load_user(user_id).await?;
        self.authorize(actor, Operation::View, RequestKind::Leave, &Owner::from(&owner))?;
        self.ledger.balances(owner.id, year).await
    }

    pub async fn adjust_balance(
        &self,
        actor: &Actor,
        user_id: u64,
        leave_type_id: u64,
        delta: i32,
        year: i32,
    ) -> WorkflowResult<i32> {
        require_admin(actor, "adjust leave balances")?;
        self.load_user(user_id).await?;
        self.store
            .find_leave_type(leave_type_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("Leave type"))?;

        let balance = self.ledger.adjust(user_id, leave_type_id, delta, year).await?;
        info!(actor_id = actor.id, user_id, leave_type_id, year, delta, "Manual balance adjustment");
        Ok(balance)
    }

    pub async fn initialize_balances(
        &self,
        actor: &Actor,
        user_id: u64,
        year: i32,
    ) -> WorkflowResult<Vec<InitOutcome>> {
        require_admin(actor, "initialize leave balances")?;
        self.load_user(user_id).await?;
        self.ledger.initialize_defaults(user_id, year).await
    }

    pub async fn initialize_all_balances(&self, actor: &Actor, year: i32) -> WorkflowResult<Vec<UserInitOutcome>> {
        require_admin(actor, "initialize leave balances")?;
        self.ledger.initialize_defaults_for_all_active_users(year).await
    }

    pub async fn list_holidays(&self) -> WorkflowResult<Vec<Holiday>> {
        self.store.all_holidays().await
    }

    pub async fn add_holiday(
        &self,
        actor: &Actor,
        name: &str,
        date: NaiveDate,
        is_recurring: bool,
    ) -> WorkflowResult<Holiday> {
        require_admin(actor, "add holidays")?;
        let name = name.trim();
        if name.is_empty() {
            return Err(WorkflowError::Validation("name must not be empty".into()));
        }

        let holiday = self.store.insert_holiday(name, date, is_recurring).await?;
        self.holidays.invalidate();
        info!(actor_id = actor.id, holiday_id = holiday.id, %date, is_recurring, "Holiday added");
        Ok(holiday)
    }

    pub async fn working_days(&self, start: NaiveDate, end: NaiveDate) -> WorkflowResult<i32> {
        calendar::validate_range(start, end)?;
        self.holidays.working_days(start, end).await
    }
}
