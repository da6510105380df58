// API route handlers
//
// This module implements the HTTP surface: upload acceptance, job status,
// completed-job history and the liveness probe.

use actix_multipart::Multipart;
use actix_web::{get, post, web, HttpResponse};
use log::info;
use uuid::Uuid;

use crate::cache::TranscriptCache;
use crate::config::AppConfig;
use crate::error::HandlerError;
use crate::handlers::form::extract_upload;
use crate::job_store::{Job, JobStatus, JobStore};
use crate::models::{HistoryEntry, StatusResponse, UploadResponse};
use crate::pipeline::QueuedJob;
use crate::storage::{file_ext, file_stem};
use crate::worker::WorkerPool;

/// Handler for uploads
///
/// Accepts a multipart form with a document and an audio part, stores both
/// content-addressed, registers a job and either completes it from the
/// transcript cache or hands it to the background workers.
#[post("/upload")]
pub async fn upload(
    form: Multipart,
    config: web::Data<AppConfig>,
    jobs: web::Data<JobStore>,
    cache: web::Data<TranscriptCache>,
    pool: web::Data<WorkerPool>,
) -> Result<HttpResponse, HandlerError> {
    let parts = extract_upload(form, &config).await?;
    let job_id = Uuid::new_v4().to_string();

    let audio_hash = parts.audio.upload.sha256.clone();
    let title = file_stem(&parts.audio.filename);
    let document_ext = file_ext(&parts.document.filename, ".pdf");
    let audio_ext = file_ext(&parts.audio.filename, ".mp3");
    info!(
        "[{}] Received document ({} bytes) and audio ({} bytes)",
        job_id, parts.document.upload.bytes, parts.audio.upload.bytes
    );

    let (document_name, document_existed) = parts
        .document
        .upload
        .promote(&config.storage_dir, &document_ext)?;
    if document_existed {
        info!("[{}] Document already on disk, skipping write", job_id);
    }
    let (audio_name, audio_existed) = parts
        .audio
        .upload
        .promote(&config.storage_dir, &audio_ext)?;
    if audio_existed {
        info!("[{}] Audio already on disk, skipping write", job_id);
    }

    jobs.create(Job::new(
        job_id.clone(),
        title,
        format!("/uploads/{}", document_name),
        format!("/uploads/{}", audio_name),
    ))?;

    if let Some(transcript) = cache.lookup(&audio_hash) {
        info!("[{}] Cached transcript found.", job_id);
        jobs.complete(&job_id, transcript)?;
    } else {
        info!("[{}] Queuing transcription for {}", job_id, audio_name);
        let queued = QueuedJob {
            id: job_id.clone(),
            audio_path: config.storage_dir.join(&audio_name),
            audio_hash,
        };
        pool.submit(queued)
            .await
            .map_err(|e| HandlerError::QueueError(format!("Failed to queue job: {}", e)))?;
    }

    Ok(HttpResponse::Ok().json(UploadResponse { job_id }))
}

/// Handler for job status requests
#[get("/status/{job_id}")]
pub async fn job_status(
    job_id: web::Path<String>,
    jobs: web::Data<JobStore>,
) -> Result<HttpResponse, HandlerError> {
    let job_id = job_id.into_inner();
    let job = jobs.get(&job_id).ok_or(HandlerError::JobNotFound(job_id))?;

    let response = match job.status {
        JobStatus::Processing => StatusResponse::Processing,
        JobStatus::Completed => StatusResponse::Completed {
            document_url: job.document_url,
            audio_url: job.audio_url,
            title: job.title,
            transcript: job.result.unwrap_or_default(),
        },
        JobStatus::Error => StatusResponse::Error {
            error_msg: job.error.unwrap_or_else(|| "Unknown".to_string()),
        },
    };

    Ok(HttpResponse::Ok().json(response))
}

/// Handler for the completed-jobs history, most recent first
#[get("/history")]
pub async fn history(jobs: web::Data<JobStore>) -> HttpResponse {
    let entries: Vec<HistoryEntry> = jobs
        .list_completed()
        .into_iter()
        .map(|job| HistoryEntry {
            id: job.id,
            title: job.title,
            document_url: job.document_url,
            audio_url: job.audio_url,
        })
        .collect();
    HttpResponse::Ok().json(entries)
}

/// Liveness probe
#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"status": "ok"}))
}
