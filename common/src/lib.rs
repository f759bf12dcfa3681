pub mod rpc;
pub mod task;

pub use rpc::{
    JobDoneReply, TaskAssignment, TaskDoneReply, TaskDoneRequest, TaskReply, TaskRequest,
};
pub use task::{TaskId, TaskKind, TaskStatus, WorkerId};
