//! Audit recorder
//!
//! Best-effort and detached: the entry is appended on a spawned task, the caller
//! never awaits the sink, and a failing sink is only logged. Every entry is also
//! emitted as a structured tracing event, so decisions stay visible when the
//! sink is down or persistence is disabled.

use crate::store::AuditSink;
use atlvs_core::models::NewAuditLogEntry;
use std::sync::Arc;
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct AuditRecorder {
    sink: Arc<dyn AuditSink>,
    persist: bool,
}

impl AuditRecorder {
    pub fn new(sink: Arc<dyn AuditSink>, persist: bool) -> Self {
        Self { sink, persist }
    }

    /// Record an entry. The returned handle is only useful to tests that need to
    /// wait for the append; production callers drop it.
    pub fn record(&self, entry: NewAuditLogEntry) -> Option<JoinHandle<()>> {
        tracing::info!(
            target: "atlvs::audit",
            organization_id = %entry.organization_id,
            actor_id = ?entry.actor_id,
            action = %entry.action,
            resource_type = %entry.resource_type,
            resource_id = ?entry.resource_id,
            outcome = entry.outcome.as_str(),
            "Access decision"
        );

        if !self.persist {
            return None;
        }

        let sink = self.sink.clone();
        Some(tokio::spawn(async move {
            let organization_id = entry.organization_id;
            let action = entry.action.clone();
            if let Err(e) = sink.append(entry).await {
                tracing::warn!(
                    error = %e,
                    organization_id = %organization_id,
                    action = %action,
                    "Failed to append audit log entry"
                );
            }
        }))
    }
}
