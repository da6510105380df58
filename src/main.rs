use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::info;
use std::sync::Arc;
use std::time::Duration;

use audiolens::config_loader;
use audiolens::engine::WhisperCli;
use audiolens::handlers::{health, history, job_status, upload};
use audiolens::media::Ffmpeg;
use audiolens::{AppConfig, JobStore, Transcriber, TranscriptCache, WorkerPool};

const DEFAULT_AUDIOLENS_HOST: &str = "127.0.0.1";
const DEFAULT_AUDIOLENS_PORT: &str = "8000";

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    // Merge the optional config file into the environment, then load config
    config_loader::load_config();
    let config = AppConfig::default();
    config.ensure_storage_dir()?;

    // Durable state: job registry recovered from disk, transcript cache
    let jobs = JobStore::load(&config.jobs_file());
    let cache = TranscriptCache::new(&config.storage_dir);

    let engine = WhisperCli::default();
    info!("Whisper model size: {}", engine.model());

    // Background transcription workers
    let transcriber = Arc::new(Transcriber::new(
        Arc::new(Ffmpeg::default()),
        Arc::new(engine),
        cache.clone(),
        jobs.clone(),
        config.chunk_duration,
        config.storage_dir.clone(),
    ));
    let pool = WorkerPool::start(
        config.workers,
        Duration::from_secs(config.job_timeout_secs),
        transcriber,
        jobs.clone(),
    );

    // Server settings
    let host = std::env::var("AUDIOLENS_HOST")
        .unwrap_or_else(|_| DEFAULT_AUDIOLENS_HOST.to_string());
    let port = std::env::var("AUDIOLENS_PORT")
        .unwrap_or_else(|_| DEFAULT_AUDIOLENS_PORT.to_string());

    info!("Starting audiolens server on http://{}:{}", host, port);
    info!("Storage directory: {}", config.storage_dir.display());
    info!(
        "Chunk duration: {}s, workers: {}",
        config.chunk_duration, config.workers
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(jobs.clone()))
            .app_data(web::Data::new(cache.clone()))
            .app_data(web::Data::new(pool.clone()))
            .service(upload)
            .service(job_status)
            .service(history)
            .service(health)
    })
    .bind(format!("{}:{}", host, port))?
    .run()
    .await
}
