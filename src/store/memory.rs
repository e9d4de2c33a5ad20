use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};

use crate::model::{
    holiday::Holiday,
    leave_balance::LeaveBalance,
    leave_type::LeaveType,
    request::{Request, RequestDetails, RequestKind, RequestStatus},
    user::User,
};
use crate::store::{Transition, WorkflowStore};
use crate::workflow::{authz::ListScope, error::WorkflowResult};

#[derive(Default)]
struct MemoryState {
    users: BTreeMap<u64, User>,
    requests: HashMap<(RequestKind, u64), Request>,
    next_request_id: HashMap<RequestKind, u64>,
    leave_types: BTreeMap<u64, LeaveType>,
    balances: HashMap<(u64, u64, i32), i32>,
    holidays: Vec<Holiday>,
}

/// Map-backed store. Each call holds the lock for its whole
/// read-modify-write, which gives it the same atomicity as the SQL backend.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    pub fn add_user(&self, user: User) {
        self.lock().users.insert(user.id, user);
    }

    pub fn add_leave_type(&self, leave_type: LeaveType) {
        self.lock().leave_types.insert(leave_type.id, leave_type);
    }

    #[cfg(test)]
    pub fn set_balance(&self, user_id: u64, leave_type_id: u64, year: i32, balance: i32) {
        self.lock().balances.insert((user_id, leave_type_id, year), balance);
    }

    /// Seeds the leave types the SQL migration ships with
    pub fn with_default_leave_types(self) -> Self {
        for (id, code, name, max_days) in [
            (1, "annual", "Annual Leave", 20),
            (2, "sick", "Sick Leave", 12),
            (3, "casual", "Casual Leave", 7),
            (4, "unpaid", "Unpaid Leave", 0),
        ] {
            self.add_leave_type(LeaveType {
                id,
                code: code.to_string(),
                name: name.to_string(),
                max_days,
                is_active: true,
                has_default_balance: max_days > 0,
            });
        }
        self
    }
}

fn matches_scope(request: &Request, scope: &ListScope) -> bool {
    match scope {
        ListScope::Owners { owner_ids, status } => {
            owner_ids.contains(&request.owner_id) && status.is_none_or(|s| request.status == s)
        }
        ListScope::AwaitingDecision { exclude_owner } => {
            request.status == RequestStatus::Submitted && request.owner_id != *exclude_owner
        }
    }
}

#[async_trait]
impl WorkflowStore for MemoryStore {
    async fn find_user(&self, id: u64) -> WorkflowResult<Option<User>> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn managed_user_ids(&self, manager_id: u64) -> WorkflowResult<Vec<u64>> {
        Ok(self
            .lock()
            .users
            .values()
            .filter(|u| u.is_active && u.manager_id == Some(manager_id))
            .map(|u| u.id)
            .collect())
    }

    async fn active_user_ids(&self) -> WorkflowResult<Vec<u64>> {
        Ok(self
            .lock()
            .users
            .values()
            .filter(|u| u.is_active)
            .map(|u| u.id)
            .collect())
    }

    async fn insert_request(&self, owner_id: u64, details: &RequestDetails) -> WorkflowResult<Request> {
        let mut state = self.lock();
        let kind = details.kind();
        let next = state.next_request_id.entry(kind).or_insert(0);
        *next += 1;
        let id = *next;

        let now = Utc::now();
        let request = Request {
            id,
            owner_id,
            status: RequestStatus::Draft,
            approver_id: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
            details: details.clone(),
        };
        state.requests.insert((kind, id), request.clone());
        Ok(request)
    }

    async fn find_request(&self, kind: RequestKind, id: u64) -> WorkflowResult<Option<Request>> {
        Ok(self.lock().requests.get(&(kind, id)).cloned())
    }

    async fn update_draft(&self, id: u64, details: &RequestDetails) -> WorkflowResult<bool> {
        let mut state = self.lock();
        match state.requests.get_mut(&(details.kind(), id)) {
            Some(request) if request.status == RequestStatus::Draft => {
                request.details = details.clone();
                request.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_draft(&self, kind: RequestKind, id: u64) -> WorkflowResult<bool> {
        let mut state = self.lock();
        let is_draft = state
            .requests
            .get(&(kind, id))
            .is_some_and(|r| r.status == RequestStatus::Draft);
        if is_draft {
            state.requests.remove(&(kind, id));
        }
        Ok(is_draft)
    }

    async fn transition(&self, change: &Transition) -> WorkflowResult<bool> {
        let mut state = self.lock();
        let Some(request) = state.requests.get_mut(&(change.kind, change.id)) else {
            return Ok(false);
        };
        if request.status != change.from {
            return Ok(false);
        }

        request.status = change.to;
        request.updated_at = Utc::now();
        if let Some(decision) = &change.decision {
            request.approver_id = Some(decision.approver_id);
            request.rejection_reason = decision.rejection_reason.clone();
        }
        if let (Some(applied_at), RequestDetails::Leave(leave)) = (change.applied_at, &mut request.details) {
            leave.applied_at = Some(applied_at);
        }
        if let Some(debit) = change.debit {
            *state
                .balances
                .entry((debit.user_id, debit.leave_type_id, debit.year))
                .or_insert(0) -= debit.days;
        }
        Ok(true)
    }

    async fn list_requests(&self, kind: RequestKind, scope: &ListScope) -> WorkflowResult<Vec<Request>> {
        let state = self.lock();
        let mut requests: Vec<Request> = state
            .requests
            .values()
            .filter(|r| r.kind() == kind && matches_scope(r, scope))
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(requests)
    }

    async fn find_leave_type(&self, id: u64) -> WorkflowResult<Option<LeaveType>> {
        Ok(self.lock().leave_types.get(&id).cloned())
    }

    async fn active_leave_types(&self) -> WorkflowResult<Vec<LeaveType>> {
        Ok(self
            .lock()
            .leave_types
            .values()
            .filter(|lt| lt.is_active)
            .cloned()
            .collect())
    }

    async fn find_balance(&self, user_id: u64, leave_type_id: u64, year: i32) -> WorkflowResult<Option<i32>> {
        Ok(self.lock().balances.get(&(user_id, leave_type_id, year)).copied())
    }

    async fn balances_for_user(&self, user_id: u64, year: i32) -> WorkflowResult<Vec<LeaveBalance>> {
        let mut balances: Vec<LeaveBalance> = self
            .lock()
            .balances
            .iter()
            .filter(|((user, _, y), _)| *user == user_id && *y == year)
            .map(|(&(user_id, leave_type_id, year), &balance)| LeaveBalance {
                user_id,
                leave_type_id,
                year,
                balance,
            })
            .collect();
        balances.sort_by_key(|b| b.leave_type_id);
        Ok(balances)
    }

    async fn adjust_balance(&self, user_id: u64, leave_type_id: u64, delta: i32, year: i32) -> WorkflowResult<i32> {
        let mut state = self.lock();
        let balance = state.balances.entry((user_id, leave_type_id, year)).or_insert(0);
        *balance += delta;
        Ok(*balance)
    }

    async fn insert_balance_if_absent(&self, balance: &LeaveBalance) -> WorkflowResult<bool> {
        let mut state = self.lock();
        let key = (balance.user_id, balance.leave_type_id, balance.year);
        if state.balances.contains_key(&key) {
            return Ok(false);
        }
        state.balances.insert(key, balance.balance);
        Ok(true)
    }

    async fn holidays_for_year(&self, year: i32) -> WorkflowResult<Vec<Holiday>> {
        Ok(self
            .lock()
            .holidays
            .iter()
            .filter(|h| h.is_recurring || h.date.year() == year)
            .cloned()
            .collect())
    }

    async fn all_holidays(&self) -> WorkflowResult<Vec<Holiday>> {
        let mut holidays = self.lock().holidays.clone();
        holidays.sort_by_key(|h| h.date);
        Ok(holidays)
    }

    async fn insert_holiday(&self, name: &str, date: NaiveDate, is_recurring: bool) -> WorkflowResult<Holiday> {
        let mut state = self.lock();
        let holiday = Holiday {
            id: state.holidays.len() as u64 + 1,
            name: name.to_string(),
            date,
            is_recurring,
        };
        state.holidays.push(holiday.clone());
        Ok(holiday)
    }
}
