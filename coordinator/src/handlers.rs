use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use common::{JobDoneReply, TaskDoneReply, TaskDoneRequest, TaskReply, TaskRequest};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::lease;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/tasks/request", post(request_task))
        .route("/api/v1/tasks/done", post(report_done))
        .route("/api/v1/job/done", get(job_done))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/* ---------------- handlers HTTP ---------------- */

async fn health() -> &'static str {
    "ok"
}

// One lock acquisition covers the phase check, the flip and the scan;
// the lease timer is armed after the lock is released.
async fn request_task(
    State(state): State<AppState>,
    Json(req): Json<TaskRequest>,
) -> Json<TaskReply> {
    let (task, terminate) = {
        let mut registry = state.registry.lock().unwrap();
        registry.select_task_for_worker(&req.worker_id)
    };

    if let Some(ref assignment) = task {
        info!(
            "assigned {:?} task {} to worker {}",
            assignment.kind, assignment.task_id, req.worker_id
        );
        tokio::spawn(lease::reclaim_after(
            state.clone(),
            assignment.task_id,
            assignment.kind,
        ));
    } else if terminate {
        info!("job finished, telling worker {} to exit", req.worker_id);
    } else {
        debug!("no idle task for worker {}, asked to retry", req.worker_id);
    }

    Json(TaskReply { task, terminate })
}

async fn report_done(
    State(state): State<AppState>,
    Json(req): Json<TaskDoneRequest>,
) -> Json<TaskDoneReply> {
    let mut registry = state.registry.lock().unwrap();

    if registry.report_done(&req.worker_id, req.task_id, req.kind) {
        info!(
            "worker {} finished {:?} task {}",
            req.worker_id, req.kind, req.task_id
        );
    } else {
        // Reassigned, already finished, or a prior-phase id. Dropping
        // the report keeps the current holder's state intact.
        debug!(
            "ignoring stale done report from worker {} for {:?} task {}",
            req.worker_id, req.kind, req.task_id
        );
    }

    Json(TaskDoneReply {
        terminate: registry.is_done(),
    })
}

async fn job_done(State(state): State<AppState>) -> Json<JobDoneReply> {
    let done = state.registry.lock().unwrap().is_done();
    Json(JobDoneReply { done })
}
