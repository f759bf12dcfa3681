use serde::{Deserialize, Serialize};

use crate::task::{TaskId, TaskKind, WorkerId};

/* --------- request-task --------- */

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRequest {
    pub worker_id: WorkerId,
}

/// Everything a worker needs to run one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAssignment {
    pub task_id: TaskId,
    pub kind: TaskKind,
    /// Input file for map tasks. Reduce tasks derive their partition
    /// from `task_id` instead.
    pub input: Option<String>,
    pub n_reduce: u32,
    pub n_map: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskReply {
    pub task: Option<TaskAssignment>,
    /// True means the whole job is finished and the worker may exit.
    /// `task: None, terminate: false` means "nothing right now, retry".
    pub terminate: bool,
}

/* --------- report-done --------- */

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDoneRequest {
    pub worker_id: WorkerId,
    pub task_id: TaskId,
    /// Task ids are reused across phases, so the report carries the
    /// kind the worker believes it completed.
    pub kind: TaskKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDoneReply {
    /// Advisory: the job finished with this report.
    pub terminate: bool,
}

/* --------- job probe --------- */

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDoneReply {
    pub done: bool,
}
