use std::collections::VecDeque;

use actix_web::web::Bytes;
use tokio::sync::{Mutex, Notify, oneshot};

use crate::grading::{GradeError, Scope, Verdict};

/// A submission waiting for a worker
pub struct GradeJob {
    pub session_id: u64,
    pub exercise_id: u32,
    pub submission: Bytes,
    pub scope: Scope,
    pub responder: oneshot::Sender<Result<Verdict, GradeError>>,
}

pub struct JobQueue {
    queue: Mutex<VecDeque<GradeJob>>,
    notify: Notify,
}

impl JobQueue {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        }
    }

    pub async fn push(&self, job: GradeJob) {
        self.queue.lock().await.push_back(job);
        self.notify.notify_one();
    }

    pub async fn pop(&self) -> GradeJob {
        loop {
            if let Some(job) = self.queue.lock().await.pop_front() {
                return job;
            }
            self.notify.notified().await;
        }
    }

    pub async fn len(&self) -> usize {
        self.queue.lock().await.len()
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}
