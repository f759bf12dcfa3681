pub mod handlers;
pub mod lease;
pub mod state;

/// How long a worker may sit on an assignment before it is reclaimed.
pub const DEFAULT_TASK_LEASE_SECS: u64 = 10;
