use actix_web::{HttpResponse, Responder, post, web};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use super::{ErrorResponse, ErrorResponseWithMessage};
use crate::create_timestamp;
use crate::grading::{GradeError, Scope, Verdict};
use crate::queue::{GradeJob, JobQueue};
use crate::tracker::SessionTracker;

#[derive(Serialize, Deserialize, Debug)]
pub struct GradeResponse {
    pub exercise_id: u32,
    pub score: u32,
    /// Output of the first failing fixture, absent on full score
    pub output: Option<String>,
    pub graded_time: String,
}

#[post("/exercises/{id}/grade")]
pub async fn grade_handler(
    job_queue: web::Data<JobQueue>,
    tracker: web::Data<SessionTracker>,
    shutdown: web::Data<CancellationToken>,
    path: web::Path<(u32,)>,
    body: web::Bytes,
) -> impl Responder {
    let exercise_id = path.into_inner().0;
    if body.is_empty() {
        return HttpResponse::BadRequest().json(ErrorResponseWithMessage {
            reason: "ERR_INVALID_ARGUMENT".to_string(),
            code: 1,
            message: "Submission is empty.".to_string(),
        });
    }

    // Dropping this handler (client gone, server stopping) cancels the session
    let token = shutdown.child_token();
    let _cancel_on_drop = token.clone().drop_guard();
    let session_id = tracker.register(exercise_id, token.clone());

    let (tx, rx) = oneshot::channel();
    job_queue
        .push(GradeJob {
            session_id,
            exercise_id,
            submission: body,
            scope: Scope::new(token),
            responder: tx,
        })
        .await;
    log::debug!("Queued session {session_id} for exercise {exercise_id}");

    // Workers stop popping once the server shuts down; jobs still queued
    // then never get an answer
    let received = tokio::select! {
        res = rx => res,
        _ = shutdown.cancelled() => {
            tracker.finish(session_id);
            log::warn!("Session {session_id} abandoned: server is shutting down");
            return HttpResponse::ServiceUnavailable().json(ErrorResponseWithMessage {
                reason: "ERR_INTERNAL".to_string(),
                code: 6,
                message: "Server is shutting down.".to_string(),
            });
        }
    };

    match received {
        Ok(Ok(verdict)) => HttpResponse::Ok().json(verdict_response(exercise_id, &verdict)),
        Ok(Err(e)) => grade_error_response(&e),
        Err(e) => {
            tracker.finish(session_id);
            log::error!("Failed to receive result of session {session_id}: {e}");
            HttpResponse::InternalServerError().json(ErrorResponse {
                reason: "ERR_INTERNAL".to_string(),
                code: 6,
            })
        }
    }
}

fn verdict_response(exercise_id: u32, verdict: &Verdict) -> GradeResponse {
    GradeResponse {
        exercise_id,
        score: verdict.score(),
        output: verdict
            .output()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned()),
        graded_time: create_timestamp(),
    }
}

fn grade_error_response(err: &GradeError) -> HttpResponse {
    log::error!("No verdict for exercise {}: {}", err.exercise_id(), err.kind());
    let message = err.to_string();
    match err {
        GradeError::Enumeration { .. } => HttpResponse::NotFound().json(ErrorResponseWithMessage {
            reason: "ERR_NOT_FOUND".to_string(),
            code: 3,
            message,
        }),
        GradeError::Execution { .. } => {
            HttpResponse::InternalServerError().json(ErrorResponseWithMessage {
                reason: "ERR_EXTERNAL".to_string(),
                code: 5,
                message,
            })
        }
        GradeError::Staging { .. } => {
            HttpResponse::InternalServerError().json(ErrorResponseWithMessage {
                reason: "ERR_INTERNAL".to_string(),
                code: 6,
                message,
            })
        }
    }
}
