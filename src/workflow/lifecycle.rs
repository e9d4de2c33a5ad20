//! Shared request lifecycle.
//!
//! | from      | operation | to        |
//! |-----------|-----------|-----------|
//! | -         | create    | draft     |
//! | draft     | update    | draft     |
//! | draft     | delete    | (removed) |
//! | draft     | submit    | submitted |
//! | submitted | approve   | approved  |
//! | submitted | reject    | rejected  |
//!
//! Every operation checks the authorization matrix first and the status
//! guard second; nothing is written when either fails.

use chrono::{Datelike, NaiveDate, Utc};
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;

use crate::model::{
    leave_type::LeaveType,
    request::{
        ExpenseDetails, LeaveDetails, Request, RequestDetails, RequestKind, RequestStatus,
        TimesheetDetails,
    },
    role::Role,
};
use crate::store::{BalanceDebit, Decision, Transition};
use crate::workflow::{
    Workflow,
    authz::{self, Actor, Operation, Owner, StatusFilter},
    calendar,
    error::{WorkflowError, WorkflowResult},
    notify::WorkflowEvent,
};

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct TimesheetPatch {
    #[schema(example = 42)]
    pub project_id: Option<u64>,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub date: Option<NaiveDate>,
    #[schema(example = 6.0)]
    pub hours: Option<f64>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ExpensePatch {
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub date: Option<NaiveDate>,
    #[schema(example = 99.9)]
    pub amount: Option<f64>,
    pub description: Option<String>,
    pub receipt_ref: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct LeavePatch {
    #[schema(example = 1)]
    pub leave_type_id: Option<u64>,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: Option<NaiveDate>,
    #[schema(example = "2026-01-06", format = "date", value_type = String)]
    pub end_date: Option<NaiveDate>,
    pub reason: Option<String>,
}

/// Partial update of a draft; absent fields keep their value
#[derive(Debug, Clone)]
pub enum RequestPatch {
    Timesheet(TimesheetPatch),
    Expense(ExpensePatch),
    Leave(LeavePatch),
}

impl RequestPatch {
    pub fn kind(&self) -> RequestKind {
        match self {
            RequestPatch::Timesheet(_) => RequestKind::Timesheet,
            RequestPatch::Expense(_) => RequestKind::Expense,
            RequestPatch::Leave(_) => RequestKind::Leave,
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            RequestPatch::Timesheet(p) => {
                p.project_id.is_none() && p.date.is_none() && p.hours.is_none() && p.description.is_none()
            }
            RequestPatch::Expense(p) => {
                p.date.is_none() && p.amount.is_none() && p.description.is_none() && p.receipt_ref.is_none()
            }
            RequestPatch::Leave(p) => {
                p.leave_type_id.is_none() && p.start_date.is_none() && p.end_date.is_none() && p.reason.is_none()
            }
        }
    }

    fn apply(self, current: &RequestDetails) -> WorkflowResult<RequestDetails> {
        match (self, current) {
            (RequestPatch::Timesheet(p), RequestDetails::Timesheet(t)) => {
                Ok(RequestDetails::Timesheet(TimesheetDetails {
                    project_id: p.project_id.unwrap_or(t.project_id),
                    date: p.date.unwrap_or(t.date),
                    hours: p.hours.unwrap_or(t.hours),
                    description: p.description.unwrap_or_else(|| t.description.clone()),
                }))
            }
            (RequestPatch::Expense(p), RequestDetails::Expense(e)) => {
                Ok(RequestDetails::Expense(ExpenseDetails {
                    date: p.date.unwrap_or(e.date),
                    amount: p.amount.unwrap_or(e.amount),
                    description: p.description.unwrap_or_else(|| e.description.clone()),
                    receipt_ref: p.receipt_ref.or_else(|| e.receipt_ref.clone()),
                }))
            }
            (RequestPatch::Leave(p), RequestDetails::Leave(l)) => Ok(RequestDetails::Leave(LeaveDetails {
                leave_type_id: p.leave_type_id.unwrap_or(l.leave_type_id),
                start_date: p.start_date.unwrap_or(l.start_date),
                end_date: p.end_date.unwrap_or(l.end_date),
                reason: p.reason.unwrap_or_else(|| l.reason.clone()),
                applied_at: l.applied_at,
            })),
            (patch, details) => Err(WorkflowError::Validation(format!(
                "Cannot apply a {} update to a {}",
                patch.kind(),
                details.kind()
            ))),
        }
    }
}

/// Field-level checks shared by create and update
pub fn validate_details(details: &RequestDetails) -> WorkflowResult<()> {
    match details {
        RequestDetails::Timesheet(t) => {
            if !(t.hours > 0.0 && t.hours <= 24.0) {
                return Err(WorkflowError::Validation(
                    "hours must be greater than 0 and at most 24".into(),
                ));
            }
            require_text("description", &t.description)
        }
        RequestDetails::Expense(e) => {
            if !(e.amount > 0.0 && e.amount.is_finite()) {
                return Err(WorkflowError::Validation("amount must be greater than 0".into()));
            }
            require_text("description", &e.description)
        }
        RequestDetails::Leave(l) => {
            calendar::validate_range(l.start_date, l.end_date)?;
            require_text("reason", &l.reason)
        }
    }
}

fn require_text(field: &str, value: &str) -> WorkflowResult<()> {
    if value.trim().is_empty() {
        Err(WorkflowError::Validation(format!("{field} must not be empty")))
    } else {
        Ok(())
    }
}

fn require_status(request: &Request, expected: RequestStatus, done: &str) -> WorkflowResult<()> {
    if request.status == expected {
        Ok(())
    } else {
        Err(WorkflowError::InvalidState(format!(
            "Only {} {}s can be {}",
            expected,
            request.kind(),
            done
        )))
    }
}

fn leave_span_changed(before: &LeaveDetails, after: &LeaveDetails) -> bool {
    before.leave_type_id != after.leave_type_id
        || before.start_date != after.start_date
        || before.end_date != after.end_date
}

impl Workflow {
    pub(crate) async fn active_leave_type(&self, leave_type_id: u64) -> WorkflowResult<LeaveType> {
        let leave_type = self
            .store
            .find_leave_type(leave_type_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("Leave type"))?;

        if !leave_type.is_active {
            return Err(WorkflowError::Validation(format!(
                "Leave type '{}' is not active",
                leave_type.name
            )));
        }
        Ok(leave_type)
    }

    /// Cap and balance checks for a leave application. Untracked leave
    /// types never touch the ledger.
    async fn ensure_leave_allowance(&self, owner_id: u64, leave: &LeaveDetails) -> WorkflowResult<()> {
        let leave_type = self.active_leave_type(leave.leave_type_id).await?;
        if !leave_type.is_tracked() {
            return Ok(());
        }

        calendar::validate_range(leave.start_date, leave.end_date)?;
        let days = self.holidays.working_days(leave.start_date, leave.end_date).await?;
        if days > leave_type.max_days {
            return Err(WorkflowError::BusinessRule(format!(
                "{} of {} working days exceeds the maximum of {} days",
                leave_type.name, days, leave_type.max_days
            )));
        }

        let year = leave.start_date.year();
        let balance = self.ledger.check(owner_id, leave_type.id, year).await?;
        if days > balance {
            return Err(WorkflowError::BusinessRule(format!(
                "Insufficient {} balance for {}: requested {} days, available {} days, short by {} days",
                leave_type.name,
                year,
                days,
                balance,
                days - balance
            )));
        }
        Ok(())
    }

    /// Days to take from the ledger when this leave is approved
    async fn approval_debit(&self, owner_id: u64, leave: &LeaveDetails) -> WorkflowResult<Option<BalanceDebit>> {
        let leave_type = self
            .store
            .find_leave_type(leave.leave_type_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("Leave type"))?;
        if !leave_type.is_tracked() {
            return Ok(None);
        }

        let days = self.holidays.working_days(leave.start_date, leave.end_date).await?;
        Ok(Some(BalanceDebit {
            user_id: owner_id,
            leave_type_id: leave_type.id,
            year: leave.start_date.year(),
            days,
        }))
    }

    async fn apply_transition(&self, request: &Request, transition: Transition, done: &str) -> WorkflowResult<Request> {
        if !self.store.transition(&transition).await? {
            // lost a race with another writer
            return Err(WorkflowError::InvalidState(format!(
                "Only {} {}s can be {}",
                transition.from,
                request.kind(),
                done
            )));
        }
        self.fetch(request.kind(), request.id).await
    }

    pub async fn create(
        &self,
        actor: &Actor,
        target_user_id: Option<u64>,
        details: RequestDetails,
    ) -> WorkflowResult<Request> {
        let kind = details.kind();
        let owner_id = authz::resolve_create_target(actor, kind, target_user_id)?;
        let owner = self.load_user(owner_id).await?;
        self.authorize(actor, Operation::Create, kind, &Owner::from(&owner))?;

        if !owner.is_active {
            return Err(WorkflowError::Validation(format!(
                "Cannot create a {kind} for an inactive user"
            )));
        }
        validate_details(&details)?;
        if let RequestDetails::Leave(leave) = &details {
            self.ensure_leave_allowance(owner.id, leave).await?;
        }

        let request = self.store.insert_request(owner.id, &details).await?;
        info!(
            kind = %kind,
            request_id = request.id,
            owner_id = owner.id,
            actor_id = actor.id,
            "Request created"
        );
        self.publish(WorkflowEvent::Created, &request, actor);
        Ok(request)
    }

    pub async fn get(&self, actor: &Actor, kind: RequestKind, id: u64) -> WorkflowResult<Request> {
        let request = self.fetch(kind, id).await?;
        let owner = self.owner_of(request.owner_id).await?;
        self.authorize(actor, Operation::View, kind, &owner)?;
        Ok(request)
    }

    pub async fn list(&self, actor: &Actor, kind: RequestKind, status: Option<&str>) -> WorkflowResult<Vec<Request>> {
        let filter = StatusFilter::parse(status)?;
        let managed = if actor.role == Role::Manager && kind == RequestKind::Leave && filter == StatusFilter::All {
            self.store.managed_user_ids(actor.id).await?
        } else {
            Vec::new()
        };

        let scope = authz::list_scope(actor, kind, filter, &managed);
        self.store.list_requests(kind, &scope).await
    }

    pub async fn update(
        &self,
        actor: &Actor,
        kind: RequestKind,
        id: u64,
        patch: RequestPatch,
    ) -> WorkflowResult<Request> {
        let request = self.fetch(kind, id).await?;
        let owner = self.owner_of(request.owner_id).await?;
        self.authorize(actor, Operation::Update, kind, &owner)?;
        require_status(&request, RequestStatus::Draft, "updated")?;

        if patch.is_empty() {
            return Err(WorkflowError::Validation("No fields provided for update".into()));
        }
        let details = patch.apply(&request.details)?;
        validate_details(&details)?;
        if let (RequestDetails::Leave(before), RequestDetails::Leave(after)) = (&request.details, &details) {
            if leave_span_changed(before, after) {
                self.ensure_leave_allowance(request.owner_id, after).await?;
            }
        }

        if !self.store.update_draft(id, &details).await? {
            return Err(WorkflowError::InvalidState(format!(
                "Only draft {kind}s can be updated"
            )));
        }
        info!(kind = %kind, request_id = id, actor_id = actor.id, "Request updated");
        self.fetch(kind, id).await
    }

    pub async fn delete(&self, actor: &Actor, kind: RequestKind, id: u64) -> WorkflowResult<()> {
        let request = self.fetch(kind, id).await?;
        let owner = self.owner_of(request.owner_id).await?;
        self.authorize(actor, Operation::Delete, kind, &owner)?;
        require_status(&request, RequestStatus::Draft, "deleted")?;

        if !self.store.delete_draft(kind, id).await? {
            return Err(WorkflowError::InvalidState(format!(
                "Only draft {kind}s can be deleted"
            )));
        }
        info!(kind = %kind, request_id = id, actor_id = actor.id, "Request deleted");
        Ok(())
    }

    pub async fn submit(&self, actor: &Actor, kind: RequestKind, id: u64) -> WorkflowResult<Request> {
        let request = self.fetch(kind, id).await?;
        let owner = self.owner_of(request.owner_id).await?;
        self.authorize(actor, Operation::Submit, kind, &owner)?;
        require_status(&request, RequestStatus::Draft, "submitted")?;

        let transition = Transition {
            kind,
            id,
            from: RequestStatus::Draft,
            to: RequestStatus::Submitted,
            decision: None,
            applied_at: (kind == RequestKind::Leave).then(Utc::now),
            debit: None,
        };
        let submitted = self.apply_transition(&request, transition, "submitted").await?;

        info!(kind = %kind, request_id = id, actor_id = actor.id, "Request submitted");
        self.publish(WorkflowEvent::Submitted, &submitted, actor);
        Ok(submitted)
    }

    /// Approves a submitted request. Tracked leave is debited here without
    /// re-checking the balance, so concurrent approvals can take it below zero.
    pub async fn approve(&self, actor: &Actor, kind: RequestKind, id: u64) -> WorkflowResult<Request> {
        let request = self.fetch(kind, id).await?;
        let owner = self.owner_of(request.owner_id).await?;
        self.authorize(actor, Operation::Approve, kind, &owner)?;
        require_status(&request, RequestStatus::Submitted, "approved")?;

        let debit = match request.details.as_leave() {
            Some(leave) => self.approval_debit(request.owner_id, leave).await?,
            None => None,
        };

        let transition = Transition {
            kind,
            id,
            from: RequestStatus::Submitted,
            to: RequestStatus::Approved,
            decision: Some(Decision {
                approver_id: actor.id,
                rejection_reason: None,
            }),
            applied_at: None,
            debit,
        };
        let approved = self.apply_transition(&request, transition, "approved").await?;

        info!(
            kind = %kind,
            request_id = id,
            approver_id = actor.id,
            debited_days = debit.map(|d| d.days),
            "Request approved"
        );
        self.publish(WorkflowEvent::Approved, &approved, actor);
        Ok(approved)
    }

    pub async fn reject(&self, actor: &Actor, kind: RequestKind, id: u64, reason: &str) -> WorkflowResult<Request> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(WorkflowError::Validation("Rejection reason is required".into()));
        }

        let request = self.fetch(kind, id).await?;
        let owner = self.owner_of(request.owner_id).await?;
        self.authorize(actor, Operation::Reject, kind, &owner)?;
        require_status(&request, RequestStatus::Submitted, "rejected")?;

        let transition = Transition {
            kind,
            id,
            from: RequestStatus::Submitted,
            to: RequestStatus::Rejected,
            decision: Some(Decision {
                approver_id: actor.id,
                rejection_reason: Some(reason.to_string()),
            }),
            applied_at: None,
            debit: None,
        };
        let rejected = self.apply_transition(&request, transition, "rejected").await?;

        info!(kind = %kind, request_id = id, approver_id = actor.id, "Request rejected");
        self.publish(WorkflowEvent::Rejected, &rejected, actor);
        Ok(rejected)
    }
}
