// coordinator/src/state.rs

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{TaskAssignment, TaskId, TaskKind, TaskStatus, WorkerId};
use tracing::info;

/// One work unit. Records are built once per phase: map records at
/// construction, reduce records at the phase flip.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub id: TaskId,
    /// Input file for map tasks; reduce tasks derive their partition
    /// from `id`.
    pub input: Option<String>,
    pub status: TaskStatus,
    pub kind: TaskKind,
    /// Holder of the current lease, meaningful only while InProgress.
    pub worker: Option<WorkerId>,
}

/// Canonical scheduling state. Only reachable through the one lock in
/// `AppState`; every public method runs start-to-finish under it, so
/// callers never observe a half-applied decision.
#[derive(Debug)]
pub struct Registry {
    tasks: Vec<TaskRecord>,
    phase: TaskKind,
    n_map: u32,
    n_reduce: u32,
}

impl Registry {
    pub fn new(inputs: Vec<String>, n_reduce: u32) -> Self {
        let tasks: Vec<TaskRecord> = inputs
            .into_iter()
            .enumerate()
            .map(|(i, input)| TaskRecord {
                id: i as TaskId,
                input: Some(input),
                status: TaskStatus::NotStarted,
                kind: TaskKind::Map,
                worker: None,
            })
            .collect();

        Registry {
            n_map: tasks.len() as u32,
            tasks,
            phase: TaskKind::Map,
            n_reduce,
        }
    }

    fn all_done(&self, kind: TaskKind) -> bool {
        self.tasks
            .iter()
            .filter(|t| t.kind == kind)
            .all(|t| t.status == TaskStatus::Finished)
    }

    /// Rebuilds the registry with one record per reduce partition.
    /// Runs under the same lock acquisition as the scan that hands the
    /// new records out.
    fn enter_reduce_phase(&mut self) {
        self.phase = TaskKind::Reduce;
        // No map output means nothing to reduce.
        let partitions = if self.n_map == 0 { 0 } else { self.n_reduce };
        self.tasks = (0..partitions)
            .map(|id| TaskRecord {
                id,
                input: None,
                status: TaskStatus::NotStarted,
                kind: TaskKind::Reduce,
                worker: None,
            })
            .collect();
        info!(
            "all map tasks finished, entering reduce phase ({} partitions)",
            partitions
        );
    }

    /// Scheduling policy: flip the phase if it is exhausted, then hand
    /// out the first idle task of the current phase. `(None, true)`
    /// means the whole job is over and the worker may exit;
    /// `(None, false)` means everything is in flight, retry later.
    pub fn select_task_for_worker(
        &mut self,
        worker: &WorkerId,
    ) -> (Option<TaskAssignment>, bool) {
        if self.phase == TaskKind::Map && self.all_done(TaskKind::Map) {
            self.enter_reduce_phase();
        }

        for task in self.tasks.iter_mut() {
            if task.status == TaskStatus::NotStarted && task.kind == self.phase {
                task.status = TaskStatus::InProgress;
                task.worker = Some(worker.clone());
                let assignment = TaskAssignment {
                    task_id: task.id,
                    kind: task.kind,
                    input: task.input.clone(),
                    n_reduce: self.n_reduce,
                    n_map: self.n_map,
                };
                return (Some(assignment), false);
            }
        }

        if self.phase == TaskKind::Reduce && self.all_done(TaskKind::Reduce) {
            return (None, true);
        }

        (None, false)
    }

    /// Completion is accepted only from the worker currently holding
    /// the lease, and only for the kind it was assigned as — task ids
    /// are reused across phases, so a very late map report must not
    /// finish the same-numbered reduce task. Everything else is a
    /// silent no-op.
    pub fn report_done(&mut self, worker: &WorkerId, task_id: TaskId, kind: TaskKind) -> bool {
        for task in self.tasks.iter_mut() {
            if task.id == task_id
                && task.kind == kind
                && task.status == TaskStatus::InProgress
                && task.worker.as_deref() == Some(worker.as_str())
            {
                task.status = TaskStatus::Finished;
                task.worker = None;
                return true;
            }
        }
        false
    }

    /// Lease expiry. Puts the task back up for grabs unless it already
    /// finished or the phase flipped underneath the timer. No worker
    /// check: the timer is tied to the one assignment it was armed
    /// for, and a new assignment can only exist after this one ended.
    pub fn reclaim(&mut self, task_id: TaskId, kind: TaskKind) -> bool {
        for task in self.tasks.iter_mut() {
            if task.id == task_id && task.kind == kind && task.status == TaskStatus::InProgress {
                task.status = TaskStatus::NotStarted;
                task.worker = None;
                return true;
            }
        }
        false
    }

    /// True iff both phases ran to completion. Vacuously true for an
    /// empty input set.
    pub fn is_done(&self) -> bool {
        match self.phase {
            TaskKind::Map => self.tasks.is_empty(),
            TaskKind::Reduce => self.all_done(TaskKind::Reduce),
        }
    }

    #[cfg(test)]
    pub(crate) fn task(&self, task_id: TaskId, kind: TaskKind) -> Option<&TaskRecord> {
        self.tasks.iter().find(|t| t.id == task_id && t.kind == kind)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Mutex<Registry>>,
    pub lease: Duration,
}

impl AppState {
    pub fn new(inputs: Vec<String>, n_reduce: u32, lease: Duration) -> Self {
        AppState {
            registry: Arc::new(Mutex::new(Registry::new(inputs, n_reduce))),
            lease,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(id: &str) -> WorkerId {
        id.to_string()
    }

    fn two_file_registry() -> Registry {
        Registry::new(vec!["pg-a.txt".into(), "pg-b.txt".into()], 1)
    }

    #[test]
    fn hands_out_distinct_map_tasks() {
        let mut reg = two_file_registry();

        let (a, term_a) = reg.select_task_for_worker(&w("w1"));
        let (b, term_b) = reg.select_task_for_worker(&w("w2"));
        let a = a.unwrap();
        let b = b.unwrap();

        assert!(!term_a && !term_b);
        assert_eq!(a.kind, TaskKind::Map);
        assert_eq!(b.kind, TaskKind::Map);
        assert_ne!(a.task_id, b.task_id);
        assert_eq!(a.n_map, 2);
        assert_eq!(a.n_reduce, 1);
        assert_eq!(a.input.as_deref(), Some("pg-a.txt"));
    }

    #[test]
    fn full_job_walkthrough() {
        // Scenario: 2 inputs, 1 reduce partition.
        let mut reg = two_file_registry();

        let (a, _) = reg.select_task_for_worker(&w("w1"));
        let (b, _) = reg.select_task_for_worker(&w("w2"));
        assert!(reg.report_done(&w("w1"), a.unwrap().task_id, TaskKind::Map));
        assert!(reg.report_done(&w("w2"), b.unwrap().task_id, TaskKind::Map));
        assert!(!reg.is_done());

        // Next request flips the phase and hands out the single
        // reduce task, with a reused id.
        let (r, term) = reg.select_task_for_worker(&w("w1"));
        let r = r.unwrap();
        assert!(!term);
        assert_eq!(r.kind, TaskKind::Reduce);
        assert_eq!(r.task_id, 0);
        assert_eq!(r.input, None);

        assert!(reg.report_done(&w("w1"), r.task_id, TaskKind::Reduce));
        assert!(reg.is_done());

        // Further requests tell workers to exit.
        let (none, term) = reg.select_task_for_worker(&w("w2"));
        assert!(none.is_none());
        assert!(term);
    }

    #[test]
    fn no_reduce_task_while_a_map_task_is_unfinished() {
        let mut reg = two_file_registry();

        let (a, _) = reg.select_task_for_worker(&w("w1"));
        let (_b, _) = reg.select_task_for_worker(&w("w2"));
        assert!(reg.report_done(&w("w1"), a.unwrap().task_id, TaskKind::Map));

        // One map task is still in flight: no new work, no terminate.
        let (task, term) = reg.select_task_for_worker(&w("w1"));
        assert!(task.is_none());
        assert!(!term);
    }

    #[test]
    fn stale_report_after_reassignment_is_ignored() {
        let mut reg = Registry::new(vec!["pg-a.txt".into()], 1);

        let (a, _) = reg.select_task_for_worker(&w("w1"));
        let id = a.unwrap().task_id;

        // Lease expired, task went back to the pool and w2 picked it up.
        assert!(reg.reclaim(id, TaskKind::Map));
        let (b, _) = reg.select_task_for_worker(&w("w2"));
        assert_eq!(b.unwrap().task_id, id);

        // w1 comes back from the dead; its claim must not stick.
        assert!(!reg.report_done(&w("w1"), id, TaskKind::Map));
        let task = reg.task(id, TaskKind::Map).unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.worker.as_deref(), Some("w2"));

        assert!(reg.report_done(&w("w2"), id, TaskKind::Map));
    }

    #[test]
    fn duplicate_report_and_late_reclaim_leave_finished_alone() {
        let mut reg = Registry::new(vec!["pg-a.txt".into()], 1);

        let (a, _) = reg.select_task_for_worker(&w("w1"));
        let id = a.unwrap().task_id;
        assert!(reg.report_done(&w("w1"), id, TaskKind::Map));

        assert!(!reg.report_done(&w("w1"), id, TaskKind::Map));
        assert!(!reg.reclaim(id, TaskKind::Map));
        assert_eq!(
            reg.task(id, TaskKind::Map).unwrap().status,
            TaskStatus::Finished
        );
    }

    #[test]
    fn late_map_report_does_not_finish_same_numbered_reduce_task() {
        let mut reg = Registry::new(vec!["pg-a.txt".into()], 1);

        // w1 stalls on map 0; w2 redoes it and the phase flips.
        let (_a, _) = reg.select_task_for_worker(&w("w1"));
        assert!(reg.reclaim(0, TaskKind::Map));
        let (_b, _) = reg.select_task_for_worker(&w("w2"));
        assert!(reg.report_done(&w("w2"), 0, TaskKind::Map));

        // w2 now holds reduce 0, same numeric id.
        let (r, _) = reg.select_task_for_worker(&w("w2"));
        assert_eq!(r.unwrap().task_id, 0);

        // w1's ancient map report names id 0; the reduce record must
        // not budge.
        assert!(!reg.report_done(&w("w1"), 0, TaskKind::Map));
        assert_eq!(
            reg.task(0, TaskKind::Reduce).unwrap().status,
            TaskStatus::InProgress
        );
        assert!(!reg.is_done());
    }

    #[test]
    fn empty_input_set_is_vacuously_done() {
        let mut reg = Registry::new(Vec::new(), 4);
        assert!(reg.is_done());

        // A request flips straight through to termination without
        // inventing reduce partitions for nonexistent map output.
        let (task, term) = reg.select_task_for_worker(&w("w1"));
        assert!(task.is_none());
        assert!(term);
        assert!(reg.is_done());
    }
}
