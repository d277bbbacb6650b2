mod grade;
mod sessions;

pub use grade::*;
pub use sessions::*;

use actix_web::error::{InternalError, PathError};
use actix_web::{HttpRequest, HttpResponse, Responder, post};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub reason: String,
    pub code: u32,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponseWithMessage {
    pub reason: String,
    pub code: u32,
    pub message: String,
}

impl ErrorResponse {
    fn invalid_argument() -> Self {
        Self {
            reason: "ERR_INVALID_ARGUMENT".to_string(),
            code: 1,
        }
    }
}

pub fn path_error_handler(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    let response = HttpResponse::BadRequest().json(ErrorResponse::invalid_argument());
    InternalError::from_response(err, response).into()
}

/// NOTE: DO NOT REMOVE: used in automatic testing
#[post("/internal/exit")]
#[allow(unreachable_code)]
pub async fn exit() -> impl Responder {
    log::info!("Shutdown as requested");
    std::process::exit(0);
    "Exited".to_string()
}
