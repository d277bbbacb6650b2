use std::sync::Arc;

use actix_web::{App, HttpServer, dev::Server, middleware, web};
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::queue::JobQueue;
use crate::routes::{
    delete_session_handler, exit, get_sessions_handler, grade_handler, path_error_handler,
};
use crate::tracker::SessionTracker;

/// Registers every route and error handler of the grading API
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::PathConfig::default().error_handler(path_error_handler))
        .service(grade_handler)
        .service(get_sessions_handler)
        .service(delete_session_handler)
        .service(exit);
}

pub fn build_server(
    server_config: ServerConfig,
    job_queue: Arc<JobQueue>,
    tracker: Arc<SessionTracker>,
    shutdown: CancellationToken,
) -> std::io::Result<Server> {
    let job_queue = web::Data::from(job_queue);
    let tracker = web::Data::from(tracker);
    let shutdown = web::Data::new(shutdown);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(job_queue.clone())
            .app_data(tracker.clone())
            .app_data(shutdown.clone())
            .wrap(middleware::Logger::default())
            .configure(configure_routes)
    })
    .bind((
        server_config
            .bind_address
            .unwrap_or("127.0.0.1".to_string()),
        server_config.bind_port.unwrap_or(12345),
    ))?
    .run();

    Ok(server)
}
