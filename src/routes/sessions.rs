use actix_web::{HttpResponse, Responder, delete, get, web};

use super::ErrorResponseWithMessage;
use crate::tracker::SessionTracker;

#[get("/sessions")]
pub async fn get_sessions_handler(tracker: web::Data<SessionTracker>) -> impl Responder {
    HttpResponse::Ok().json(tracker.list())
}

#[delete("/sessions/{id}")]
pub async fn delete_session_handler(
    tracker: web::Data<SessionTracker>,
    path: web::Path<(u64,)>,
) -> impl Responder {
    let session_id = path.into_inner().0;
    if tracker.cancel(session_id) {
        log::info!("Session {session_id} cancelled on request");
        HttpResponse::Ok().finish()
    } else {
        HttpResponse::NotFound().json(ErrorResponseWithMessage {
            reason: "ERR_NOT_FOUND".to_string(),
            code: 3,
            message: format!("Session {session_id} not found."),
        })
    }
}
