// Durable job registry
//
// This module owns all job records and their lifecycle state. Every
// mutation is flushed to a single JSON registry file via write-then-rename
// so a process restart recovers full job history, and the only allowed
// transitions are processing -> completed and processing -> error.

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

use crate::models::Transcript;

/// Lifecycle state of a transcription job
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Upload accepted, transcription pending or running
    Processing,
    /// Transcript ready
    Completed,
    /// Transcription failed, message in `error`
    Error,
}

/// One transcription job record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    /// Title derived from the original audio filename
    pub title: String,
    pub document_url: String,
    pub audio_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Transcript>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(id: String, title: String, document_url: String, audio_url: String) -> Self {
        Self {
            id,
            status: JobStatus::Processing,
            title,
            document_url,
            audio_url,
            result: None,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self.status, JobStatus::Completed | JobStatus::Error)
    }
}

/// Job store error types
#[derive(Error, Debug)]
pub enum StoreError {
    /// Job not found in the registry
    #[error("Job not found: {0}")]
    JobNotFound(String),
    /// A job with this id already exists
    #[error("Job already exists: {0}")]
    DuplicateJob(String),
    /// No transitions out of a terminal state
    #[error("Job {0} is already in a terminal state")]
    TerminalState(String),
    /// I/O error while flushing the registry
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Registry serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Process-wide registry of job records
///
/// Clones share the same underlying state. The registry file is rewritten
/// in full on every mutation while the lock is held, which serializes
/// interleaved writers across jobs.
#[derive(Clone)]
pub struct JobStore {
    path: PathBuf,
    jobs: Arc<Mutex<HashMap<String, Job>>>,
}

impl JobStore {
    /// Load the registry from `path`, starting empty if the file is
    /// missing or unreadable
    pub fn load(path: &Path) -> Self {
        let jobs = match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(map) => map,
                Err(e) => {
                    warn!("Failed to parse jobs file {}: {}", path.display(), e);
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                warn!("Failed to read jobs file {}: {}", path.display(), e);
                HashMap::new()
            }
        };

        Self {
            path: path.to_path_buf(),
            jobs: Arc::new(Mutex::new(jobs)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Job>> {
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a freshly accepted job
    pub fn create(&self, job: Job) -> Result<(), StoreError> {
        let mut jobs = self.lock();
        if jobs.contains_key(&job.id) {
            return Err(StoreError::DuplicateJob(job.id));
        }
        jobs.insert(job.id.clone(), job);
        self.flush(&jobs)
    }

    /// Fetch a job record by id
    pub fn get(&self, id: &str) -> Option<Job> {
        self.lock().get(id).cloned()
    }

    /// Transition a job to `completed` with its transcript
    pub fn complete(&self, id: &str, transcript: Transcript) -> Result<(), StoreError> {
        self.finish(id, |job| {
            job.status = JobStatus::Completed;
            job.result = Some(transcript);
        })
    }

    /// Transition a job to `error` with a message
    pub fn fail(&self, id: &str, message: String) -> Result<(), StoreError> {
        self.finish(id, |job| {
            job.status = JobStatus::Error;
            job.error = Some(message);
        })
    }

    fn finish(&self, id: &str, apply: impl FnOnce(&mut Job)) -> Result<(), StoreError> {
        let mut jobs = self.lock();
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| StoreError::JobNotFound(id.to_string()))?;
        if job.is_terminal() {
            return Err(StoreError::TerminalState(id.to_string()));
        }
        apply(job);
        job.completed_at = Some(Utc::now());
        self.flush(&jobs)
    }

    /// All completed jobs, most recently completed first
    pub fn list_completed(&self) -> Vec<Job> {
        let mut completed: Vec<Job> = self
            .lock()
            .values()
            .filter(|job| job.status == JobStatus::Completed)
            .cloned()
            .collect();
        completed.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        completed
    }

    /// Rewrite the registry file atomically; callers hold the lock
    fn flush(&self, jobs: &HashMap<String, Job>) -> Result<(), StoreError> {
        let serialized = serde_json::to_string(jobs)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serialized)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
