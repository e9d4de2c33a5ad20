use async_trait::async_trait;
use serde::Serialize;
use strum_macros::Display;
use tracing::info;

use crate::model::request::{Request, RequestKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WorkflowEvent {
    Created,
    Submitted,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub event: WorkflowEvent,
    pub kind: RequestKind,
    pub request_id: u64,
    pub owner_id: u64,
    pub actor_id: u64,
}

impl Notification {
    pub fn new(event: WorkflowEvent, request: &Request, actor_id: u64) -> Self {
        Notification {
            event,
            kind: request.kind(),
            request_id: request.id,
            owner_id: request.owner_id,
            actor_id,
        }
    }
}

/// Delivery channel for lifecycle notifications.
///
/// Runs on a spawned task after the transition is stored, so the caller never
/// waits for delivery. Errors are logged and never undo the transition.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()>;
}

/// Writes notifications to the application log
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn notify(&self, n: &Notification) -> anyhow::Result<()> {
        info!(
            event = %n.event,
            kind = %n.kind,
            request_id = n.request_id,
            owner_id = n.owner_id,
            actor_id = n.actor_id,
            "Workflow notification"
        );
        Ok(())
    }
}
