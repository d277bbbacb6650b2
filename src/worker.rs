use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::grading::{CaseRunner, Grader};
use crate::queue::JobQueue;
use crate::tracker::SessionTracker;

pub async fn worker<R: CaseRunner>(
    id: u8,
    grader: Arc<Grader<R>>,
    queue: Arc<JobQueue>,
    tracker: Arc<SessionTracker>,
    token: CancellationToken,
) -> anyhow::Result<()> {
    log::info!("Worker {id} initialized");

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                log::info!("Worker {id} received shutdown signal, stopping");
                break;
            }

            job = queue.pop() => {
                let session_id = job.session_id;
                let exercise_id = job.exercise_id;

                if job.responder.is_closed() {
                    log::debug!("Session {session_id} abandoned by its caller, skipped");
                    tracker.finish(session_id);
                    continue;
                }

                log::info!("Worker {id} got session {session_id} (exercise {exercise_id})");
                tracker.mark_running(session_id);

                let result = grader.grade(exercise_id, &job.submission, &job.scope).await;
                tracker.finish(session_id);

                if let Err(e) = &result {
                    log::error!("Session {session_id} produced no verdict ({}): {e}", e.kind());
                }
                if job.responder.send(result).is_err() {
                    log::warn!("Failed to send session {session_id} result back to server");
                } else {
                    log::debug!("Session {session_id} result sent back from worker {id}");
                }
            }
        };
    }

    log::info!("Worker {id} has shut down gracefully");
    Ok(())
}
