// HTTP handlers
//
// This module provides the interface between HTTP requests and the
// transcription pipeline.

pub mod form;
pub mod routes;

// Re-export handlers for easier access
pub use self::routes::{health, history, job_status, upload};
