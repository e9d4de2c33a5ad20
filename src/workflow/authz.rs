//! Decides who may act on whose request.
//!
//! Every function here is pure: the engine loads the owner record and hands
//! it in, and a denial comes back as a [`Verdict::Deny`] carrying the
//! message for the caller.

use crate::model::{
    request::{RequestKind, RequestStatus},
    role::Role,
    user::User,
};
use crate::workflow::error::{WorkflowError, WorkflowResult};

/// The authenticated caller, threaded explicitly into every decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: u64,
    pub role: Role,
}

/// The user a request is about, with the relation used for managed-employee checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner {
    pub id: u64,
    pub manager_id: Option<u64>,
}

impl From<&User> for Owner {
    fn from(user: &User) -> Self {
        Owner {
            id: user.id,
            manager_id: user.manager_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    View,
    Update,
    Delete,
    Submit,
    Approve,
    Reject,
}

impl Operation {
    fn verb(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::View => "view",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Submit => "submit",
            Operation::Approve => "approve",
            Operation::Reject => "reject",
        }
    }

    fn is_decision(&self) -> bool {
        matches!(self, Operation::Approve | Operation::Reject)
    }

    /// Operations an admin may not perform on their own requests
    fn is_mutation(&self) -> bool {
        matches!(self, Operation::Create | Operation::Update | Operation::Delete)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny(String),
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allow)
    }

    pub fn into_result(self) -> WorkflowResult<()> {
        match self {
            Verdict::Allow => Ok(()),
            Verdict::Deny(reason) => Err(WorkflowError::Forbidden(reason)),
        }
    }
}

pub fn can_perform(actor: &Actor, operation: Operation, kind: RequestKind, owner: &Owner) -> Verdict {
    let is_self = owner.id == actor.id;
    let is_managed = owner.manager_id == Some(actor.id);

    match actor.role {
        Role::Employee => {
            if operation.is_decision() {
                Verdict::Deny(format!("Employees cannot {} {}s", operation.verb(), kind))
            } else if is_self {
                Verdict::Allow
            } else if operation == Operation::Create {
                Verdict::Deny(format!("Employees can create {kind}s only for themselves"))
            } else {
                Verdict::Deny(format!(
                    "Employees can {} only their own {}s",
                    operation.verb(),
                    kind
                ))
            }
        }
        Role::Manager => {
            // Decisions are not limited to managed employees; see DESIGN.md
            if operation.is_decision() || is_self || is_managed {
                Verdict::Allow
            } else {
                Verdict::Deny(format!(
                    "Manager can {} {} only for self or managed employees",
                    operation.verb(),
                    kind
                ))
            }
        }
        Role::Admin => {
            if operation.is_mutation() && is_self {
                Verdict::Deny(format!(
                    "Admin cannot {} their own {}; admins act only on other users' requests",
                    operation.verb(),
                    kind
                ))
            } else {
                Verdict::Allow
            }
        }
    }
}

/// Picks the owner of a new request.
///
/// Employees and managers default to themselves; admins must name a target.
pub fn resolve_create_target(
    actor: &Actor,
    kind: RequestKind,
    target_user_id: Option<u64>,
) -> WorkflowResult<u64> {
    match (actor.role, target_user_id) {
        (Role::Admin, None) => Err(WorkflowError::Validation(format!(
            "Admin must specify user_id when creating a {kind}"
        ))),
        (_, Some(target)) => Ok(target),
        (_, None) => Ok(actor.id),
    }
}

/// Status filter from the `?status=` query parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Unfiltered,
    All,
    Only(RequestStatus),
}

impl StatusFilter {
    pub fn parse(raw: Option<&str>) -> WorkflowResult<Self> {
        match raw.map(str::trim) {
            None | Some("") => Ok(StatusFilter::Unfiltered),
            Some("all") => Ok(StatusFilter::All),
            Some(other) => other
                .parse::<RequestStatus>()
                .map(StatusFilter::Only)
                .map_err(|_| WorkflowError::Validation(format!("Unknown status filter '{other}'"))),
        }
    }
}

/// Which rows a list call may return
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListScope {
    /// Requests owned by any of these users, optionally with one status
    Owners {
        owner_ids: Vec<u64>,
        status: Option<RequestStatus>,
    },
    /// The approval queue: submitted requests of everyone but the actor
    AwaitingDecision { exclude_owner: u64 },
}

/// Employees only ever see their own requests. Approvers get the queue of
/// submitted requests, except on leave lists filtered with `all`, which show
/// their own requests plus (for managers) their managed employees'.
pub fn list_scope(actor: &Actor, kind: RequestKind, filter: StatusFilter, managed: &[u64]) -> ListScope {
    if !actor.role.is_approver() {
        return ListScope::Owners {
            owner_ids: vec![actor.id],
            status: match filter {
                StatusFilter::Only(status) => Some(status),
                _ => None,
            },
        };
    }

    if kind == RequestKind::Leave && filter == StatusFilter::All {
        let mut owner_ids = vec![actor.id];
        if actor.role == Role::Manager {
            owner_ids.extend(managed.iter().copied().filter(|id| *id != actor.id));
        }
        return ListScope::Owners {
            owner_ids,
            status: None,
        };
    }

    ListScope::AwaitingDecision {
        exclude_owner: actor.id,
    }
}
