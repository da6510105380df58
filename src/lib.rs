// Audiolens
//
// This crate provides an HTTP backend that ingests a document + audio
// upload, produces a time-aligned transcript through an asynchronous
// chunked pipeline, and exposes job status and history for
// playback-synchronized review.

pub mod cache;
pub mod config;
pub mod config_loader;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod job_store;
pub mod media;
pub mod models;
pub mod pipeline;
pub mod storage;
pub mod worker;

// Re-export common types for easier access
pub use cache::TranscriptCache;
pub use config::AppConfig;
pub use error::HandlerError;
pub use job_store::{Job, JobStatus, JobStore};
pub use models::{Segment, Transcript, Word};
pub use pipeline::{QueuedJob, Transcriber};
pub use worker::WorkerPool;
