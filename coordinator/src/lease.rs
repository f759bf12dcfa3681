// coordinator/src/lease.rs
//
// Timeout-based failure detection. Every assignment arms one of
// these; a worker that crashes, hangs or drops off the network simply
// never reports in time and loses the lease.

use common::{TaskId, TaskKind};
use tracing::warn;

use crate::state::AppState;

/// Single-shot lease timer, tied to the one assignment it was armed
/// for by `(task_id, kind)`. Completion does not cancel it; the
/// reclaim guard turns a late fire into a no-op.
pub async fn reclaim_after(state: AppState, task_id: TaskId, kind: TaskKind) {
    tokio::time::sleep(state.lease).await;

    let mut registry = state.registry.lock().unwrap();
    if registry.reclaim(task_id, kind) {
        warn!("lease expired on {:?} task {}, rescheduling", kind, task_id);
    }
}
