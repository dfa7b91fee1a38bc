use crate::handle::{SdkError, SdkHandle};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, error};
use uuid::Uuid;

/// A call issued before the SDK was ready.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCall {
    pub id: Uuid,
    pub method: String,
    pub args: Vec<Value>,
    pub queued_at: DateTime<Utc>,
}

impl PendingCall {
    pub fn new(method: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            method: method.into(),
            args,
            queued_at: Utc::now(),
        }
    }
}

/// FIFO of calls waiting for bootstrap.
#[derive(Debug, Default)]
pub struct PendingQueue {
    calls: VecDeque<PendingCall>,
}

impl PendingQueue {
    pub fn push(&mut self, call: PendingCall) {
        self.calls.push_back(call);
    }

    pub fn pop(&mut self) -> Option<PendingCall> {
        self.calls.pop_front()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub dispatched: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Dispatches queued calls one at a time until `next` runs dry.
///
/// Each call is attempted once and given at most `call_timeout` to settle.
/// Unknown methods are skipped; rejected or stalled calls are logged and
/// counted as failed. None of these stops the pass.
pub async fn replay<F>(
    handle: &dyn SdkHandle,
    call_timeout: Duration,
    mut next: F,
) -> ReplaySummary
where
    F: FnMut() -> Option<PendingCall>,
{
    let mut summary = ReplaySummary::default();
    while let Some(call) = next() {
        if !handle.has_method(&call.method) {
            let err = SdkError::MissingMethod(call.method.clone());
            error!(call_id = %call.id, method = %call.method, "{err}");
            summary.skipped += 1;
            continue;
        }
        let waited_ms = (Utc::now() - call.queued_at).num_milliseconds();
        debug!(call_id = %call.id, method = %call.method, waited_ms, "replaying queued call");
        match tokio::time::timeout(call_timeout, handle.call(&call.method, call.args)).await {
            Ok(Ok(_)) => summary.dispatched += 1,
            Ok(Err(err)) => {
                error!(call_id = %call.id, method = %call.method, error = %err, "queued call failed");
                summary.failed += 1;
            }
            Err(_) => {
                error!(
                    call_id = %call.id,
                    method = %call.method,
                    ?call_timeout,
                    "queued call did not settle; moving on"
                );
                summary.failed += 1;
            }
        }
    }
    summary
}
