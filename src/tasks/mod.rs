//! Progress reporting and cancellation for long-running import work.
//!
//! Workers send [`TaskUpdate`]s over an `mpsc` channel and poll a shared
//! cancel flag; the caller holds the other ends in a [`TaskHandle`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Instant;

/// Kind of background work, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskType {
    PhotoExtraction,
    Commit,
}

impl TaskType {
    pub fn display_name(&self) -> &'static str {
        match self {
            TaskType::PhotoExtraction => "Photo Extraction",
            TaskType::Commit => "Import Commit",
        }
    }
}

/// Progress information for a task.
#[derive(Debug, Clone)]
pub struct TaskProgress {
    pub current: usize,
    pub total: usize,
    pub current_item: Option<String>,
}

impl TaskProgress {
    pub fn new(current: usize, total: usize) -> Self {
        Self {
            current,
            total,
            current_item: None,
        }
    }

    pub fn with_item(mut self, item: impl Into<String>) -> Self {
        self.current_item = Some(item.into());
        self
    }

    /// Progress percentage (0-100).
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            0
        } else {
            ((self.current as f64 / self.total as f64) * 100.0).min(100.0) as u8
        }
    }
}

/// Update messages sent from workers via channels.
#[derive(Debug, Clone)]
pub enum TaskUpdate {
    Started { total: usize },
    Progress(TaskProgress),
    Completed { message: String },
    Cancelled,
    Failed { error: String },
}

impl TaskUpdate {
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            TaskUpdate::Completed { .. } | TaskUpdate::Cancelled | TaskUpdate::Failed { .. }
        )
    }
}

pub fn is_cancelled(flag: &AtomicBool) -> bool {
    flag.load(Ordering::SeqCst)
}

/// Caller side of a running task.
pub struct TaskHandle {
    pub task_type: TaskType,
    pub cancel_flag: Arc<AtomicBool>,
    receiver: mpsc::Receiver<TaskUpdate>,
    started_at: Instant,
}

impl TaskHandle {
    /// Create a handle plus the sender a worker reports through.
    pub fn new(task_type: TaskType) -> (Self, mpsc::Sender<TaskUpdate>) {
        let (tx, receiver) = mpsc::channel();
        let handle = Self {
            task_type,
            cancel_flag: Arc::new(AtomicBool::new(false)),
            receiver,
            started_at: Instant::now(),
        };
        (handle, tx)
    }

    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::SeqCst);
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// Block on updates until every sender is dropped.
    pub fn updates(&self) -> mpsc::Iter<'_, TaskUpdate> {
        self.receiver.iter()
    }

    /// Drain every update sent so far without blocking.
    pub fn poll(&self) -> Vec<TaskUpdate> {
        self.receiver.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percent() {
        assert_eq!(TaskProgress::new(0, 0).percent(), 0);
        assert_eq!(TaskProgress::new(1, 4).percent(), 25);
        assert_eq!(TaskProgress::new(9, 4).percent(), 100);
    }

    #[test]
    fn test_handle_receives_updates_and_cancels() {
        let (handle, tx) = TaskHandle::new(TaskType::PhotoExtraction);
        tx.send(TaskUpdate::Started { total: 2 }).unwrap();
        tx.send(TaskUpdate::Progress(TaskProgress::new(1, 2).with_item("a.jpg"))).unwrap();

        let updates = handle.poll();
        assert_eq!(updates.len(), 2);
        assert!(!updates.iter().any(TaskUpdate::is_final));
        assert!(handle.poll().is_empty());

        assert!(!is_cancelled(&handle.cancel_flag));
        handle.cancel();
        assert!(is_cancelled(&handle.cancel_flag));
    }
}
