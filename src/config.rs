// Audiolens configuration
//
// This module contains configuration structures and constants for audiolens.
// It centralizes all configuration parameters and provides defaults from environment variables.

use std::env;
use std::path::PathBuf;

/// Default values for configuration
pub mod defaults {
    // Root directory for stored uploads, transcript cache and the job registry
    pub const STORAGE_DIR: &str = "./uploads";

    // Maximum accepted document upload size, in megabytes
    pub const MAX_DOCUMENT_MB: u64 = 200;

    // Maximum accepted audio upload size, in megabytes
    pub const MAX_AUDIO_MB: u64 = 500;

    // Chunk duration in seconds for long audio files (30 minutes)
    pub const CHUNK_DURATION_SECS: u32 = 1800;

    // Number of background transcription workers
    pub const WORKERS: usize = 2;

    // Per-job timeout in seconds for background transcription
    pub const JOB_TIMEOUT_SECS: u64 = 7200;
}

/// Configuration for upload handling and the transcription pipeline
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Root directory for all persisted state
    pub storage_dir: PathBuf,
    /// Maximum document upload size in bytes
    pub max_document_bytes: u64,
    /// Maximum audio upload size in bytes
    pub max_audio_bytes: u64,
    /// Chunk duration threshold in seconds
    pub chunk_duration: u32,
    /// Number of background transcription workers
    pub workers: usize,
    /// Per-job timeout in seconds
    pub job_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let mb = |v: u64| v * 1024 * 1024;
        Self {
            storage_dir: env::var("AUDIOLENS_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(defaults::STORAGE_DIR)),
            max_document_bytes: mb(env::var("AUDIOLENS_MAX_DOCUMENT_MB")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults::MAX_DOCUMENT_MB)),
            max_audio_bytes: mb(env::var("AUDIOLENS_MAX_AUDIO_MB")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults::MAX_AUDIO_MB)),
            chunk_duration: env::var("AUDIOLENS_CHUNK_DURATION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults::CHUNK_DURATION_SECS),
            workers: env::var("AUDIOLENS_WORKERS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults::WORKERS),
            job_timeout_secs: env::var("AUDIOLENS_JOB_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults::JOB_TIMEOUT_SECS),
        }
    }
}

impl AppConfig {
    /// Ensures the storage directory exists
    pub fn ensure_storage_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.storage_dir)
    }

    /// Path to the durable job registry file
    pub fn jobs_file(&self) -> PathBuf {
        self.storage_dir.join("jobs.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits_are_in_bytes() {
        let config = AppConfig::default();
        assert_eq!(config.max_document_bytes % (1024 * 1024), 0);
        assert_eq!(config.max_audio_bytes % (1024 * 1024), 0);
        assert!(config.max_audio_bytes >= config.max_document_bytes);
    }

    #[test]
    fn jobs_file_lives_under_storage_dir() {
        let config = AppConfig::default();
        assert!(config.jobs_file().starts_with(&config.storage_dir));
    }
}
