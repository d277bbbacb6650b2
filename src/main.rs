use std::sync::Arc;

use clap::Parser;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use grader::config::{CliArgs, Config};
use grader::queue::JobQueue;
use grader::tracker::SessionTracker;
use grader::web_server::build_server;
use grader::worker::worker;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = CliArgs::parse();
    let n_workers = cli.workers;

    if n_workers == 0 {
        panic!("The number of workers must not be 0");
    }

    let Config {
        server: server_config,
        grading: grading_config,
    } = cli.to_config().expect("Failed to load configuration");

    let grader = grading_config
        .build_grader()
        .expect("Failed to set up grader");
    log::info!(
        "Grading with interpreter {:?}, limits {:?}",
        grading_config.interpreter,
        grader.limits()
    );

    let grader = Arc::new(grader);
    let job_queue = Arc::new(JobQueue::new());
    let tracker = Arc::new(SessionTracker::new());
    let shutdown_token = CancellationToken::new();

    // ======= PREPARATION END, EXECUTION START =======

    let mut workers = JoinSet::new();
    for i in 1..=n_workers {
        workers.spawn(worker(
            i,
            grader.clone(),
            job_queue.clone(),
            tracker.clone(),
            shutdown_token.clone(),
        ));
    }

    let server = build_server(
        server_config,
        job_queue,
        tracker,
        shutdown_token.clone(),
    )?;

    let server_handle = server.handle();
    let server_task = actix_web::rt::spawn(server);

    // ===== EXECUTION END, WAITING FOR SHUTDOWN ======

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            log::info!("Ctrl-c received, shutting down...");
        }
        res_server = server_task => {
            log::error!("Server terminated unexpectedly: {:?}", res_server);
        }
        Some(res_worker) = workers.join_next() => {
            log::error!("A worker terminated unexpectedly: {:?}", res_worker);
        }
    }

    // 1. Cancel every in-flight session and tell workers to stop
    shutdown_token.cancel();
    log::info!("Shutdown signal sent to workers, waiting for them to finish...");

    // 2. Shutdown actix-web server gracefully
    server_handle.stop(true).await;

    // 3. Wait until every worker terminates
    while let Some(res) = workers.join_next().await {
        if let Err(e) = res {
            if e.is_panic() {
                log::error!("Worker handle panicked: {:?}", e);
            } else {
                log::error!("Worker handle finished with error: {:?}", e);
            }
        }
    }

    log::info!("Shutdown complete");
    Ok(())
}
