//! Approval workflow for timesheet, expense and leave requests.
//!
//! - `calendar`: working-day counting over a holiday calendar
//! - `authz`: who may act on whose request
//! - `ledger`: per-user leave balances
//! - `lifecycle`: the draft → submitted → approved/rejected state machine
//! - `leave`: leave catalog, balance and holiday operations
//! - `notify`: fire-and-forget notifications on transitions

pub mod authz;
pub mod calendar;
pub mod error;
pub mod leave;
pub mod ledger;
pub mod lifecycle;
pub mod notify;

#[cfg(test)]
mod lifecycle_tests;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::model::{
    request::{Request, RequestKind},
    user::User,
};
use crate::store::WorkflowStore;
use crate::utils::holiday_cache::HolidayCache;

use authz::{Actor, Operation, Owner, Verdict};
use error::{WorkflowError, WorkflowResult};
use ledger::LeaveLedger;
use notify::{Notification, NotificationSink, WorkflowEvent};

pub struct Workflow {
    store: Arc<dyn WorkflowStore>,
    ledger: LeaveLedger,
    holidays: HolidayCache,
    notifier: Arc<dyn NotificationSink>,
}

impl Workflow {
    pub fn new(
        store: Arc<dyn WorkflowStore>,
        notifier: Arc<dyn NotificationSink>,
        holiday_ttl: Duration,
    ) -> Self {
        Self {
            ledger: LeaveLedger::new(store.clone()),
            holidays: HolidayCache::new(store.clone(), holiday_ttl),
            store,
            notifier,
        }
    }

    async fn load_user(&self, user_id: u64) -> WorkflowResult<User> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("User"))
    }

    /// Owner relation for an existing request. A removed user keeps
    /// ownership but no longer has a manager.
    async fn owner_of(&self, user_id: u64) -> WorkflowResult<Owner> {
        Ok(match self.store.find_user(user_id).await? {
            Some(user) => Owner::from(&user),
            None => Owner {
                id: user_id,
                manager_id: None,
            },
        })
    }

    async fn fetch(&self, kind: RequestKind, id: u64) -> WorkflowResult<Request> {
        self.store
            .find_request(kind, id)
            .await?
            .ok_or_else(|| WorkflowError::not_found(kind.title()))
    }

    fn authorize(&self, actor: &Actor, operation: Operation, kind: RequestKind, owner: &Owner) -> WorkflowResult<()> {
        let verdict = authz::can_perform(actor, operation, kind, owner);
        debug!(
            actor_id = actor.id,
            role = %actor.role,
            operation = ?operation,
            kind = %kind,
            owner_id = owner.id,
            allowed = verdict.is_allowed(),
            "Authorization decision"
        );
        if let Verdict::Deny(reason) = &verdict {
            warn!(actor_id = actor.id, owner_id = owner.id, reason = %reason, "Operation denied");
        }
        verdict.into_result()
    }

    fn publish(&self, event: WorkflowEvent, request: &Request, actor: &Actor) {
        let notification = Notification::new(event, request, actor.id);
        let notifier = self.notifier.clone();
        actix_web::rt::spawn(async move {
            if let Err(e) = notifier.notify(&notification).await {
                warn!(
                    error = %e,
                    event = %notification.event,
                    request_id = notification.request_id,
                    "Notification delivery failed"
                );
            }
        });
    }
}
