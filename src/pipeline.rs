// Transcription pipeline
//
// This module drives one job from stored audio to a finished transcript:
// cache lookup, duration probe, direct or chunked transcription, cache
// write and the terminal job-state update. The chunked path stitches
// per-chunk results into one continuous timeline.

use log::{error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::cache::TranscriptCache;
use crate::engine::{EngineError, TranscriptionEngine};
use crate::job_store::{JobStore, StoreError};
use crate::media::{MediaTools, SplitError};
use crate::models::Transcript;

/// A queued unit of background transcription work
#[derive(Debug, Clone)]
pub struct QueuedJob {
    /// Job id in the registry
    pub id: String,
    /// Path to the stored audio asset
    pub audio_path: PathBuf,
    /// Content hash of the audio bytes, the cache key
    pub audio_hash: String,
}

/// Errors inside the background transcription path
///
/// These never cross the worker boundary; they are recorded as the job's
/// terminal error message.
#[derive(Error, Debug)]
pub enum TranscribeError {
    #[error(transparent)]
    Split(#[from] SplitError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Orchestrator for the transcription of one audio file
pub struct Transcriber {
    media: Arc<dyn MediaTools>,
    engine: Arc<dyn TranscriptionEngine>,
    cache: TranscriptCache,
    jobs: JobStore,
    chunk_duration: u32,
    storage_dir: PathBuf,
}

impl Transcriber {
    pub fn new(
        media: Arc<dyn MediaTools>,
        engine: Arc<dyn TranscriptionEngine>,
        cache: TranscriptCache,
        jobs: JobStore,
        chunk_duration: u32,
        storage_dir: PathBuf,
    ) -> Self {
        Self {
            media,
            engine,
            cache,
            jobs,
            chunk_duration,
            storage_dir,
        }
    }

    /// Execute one job to its terminal state
    ///
    /// Runs on a blocking thread. Any pipeline error becomes the job's
    /// terminal error record; this function never panics the worker.
    pub fn run_job(&self, job: QueuedJob) {
        info!(
            "[{}] Starting transcription of {}",
            job.id,
            job.audio_path.display()
        );
        match self.produce_transcript(&job) {
            Ok(transcript) => match self.jobs.complete(&job.id, transcript) {
                Ok(()) => info!("[{}] Job completed.", job.id),
                Err(e) => warn!("[{}] Could not record completion: {}", job.id, e),
            },
            Err(e) => {
                error!("[{}] Transcription error: {}", job.id, e);
                if let Err(store_err) = self.jobs.fail(&job.id, e.to_string()) {
                    warn!("[{}] Could not record failure: {}", job.id, store_err);
                }
            }
        }
    }

    fn produce_transcript(&self, job: &QueuedJob) -> Result<Transcript, TranscribeError> {
        if let Some(cached) = self.cache.lookup(&job.audio_hash) {
            info!(
                "[{}] Cache hit - loaded {} segment(s)",
                job.id,
                cached.segments.len()
            );
            return Ok(cached);
        }

        let duration = self.media.probe_duration(&job.audio_path);
        match duration {
            Some(d) => info!("[{}] Audio duration: {:.0}s", job.id, d),
            None => info!("[{}] Could not determine audio duration", job.id),
        }

        let transcript = match duration {
            Some(d) if d > f64::from(self.chunk_duration) => {
                info!(
                    "[{}] Long file ({:.0}s), using chunked transcription",
                    job.id, d
                );
                self.transcribe_chunked(job)?
            }
            _ => renumber(self.engine.transcribe(&job.audio_path)?),
        };

        info!(
            "[{}] Transcription complete. {} segment(s).",
            job.id,
            transcript.segments.len()
        );
        // Only successes are cached; a re-upload after a failure retries
        self.cache.store(&job.audio_hash, &transcript)?;
        Ok(transcript)
    }

    /// Split the audio, transcribe each chunk in order and merge the
    /// results onto one global timeline
    fn transcribe_chunked(&self, job: &QueuedJob) -> Result<Transcript, TranscribeError> {
        let chunk_dir = self.storage_dir.join(format!(".chunks_{}", job.audio_hash));
        let result = self.run_chunks(job, &chunk_dir);
        // The working directory goes away on success and failure alike
        let _ = fs::remove_dir_all(&chunk_dir);
        result
    }

    fn run_chunks(&self, job: &QueuedJob, chunk_dir: &Path) -> Result<Transcript, TranscribeError> {
        info!(
            "[{}] Splitting audio into {}s chunks",
            job.id, self.chunk_duration
        );
        let chunks = self
            .media
            .split(&job.audio_path, chunk_dir, self.chunk_duration)?;
        info!("[{}] Created {} chunk(s).", job.id, chunks.len());

        let mut segments = Vec::new();
        let mut next_id: u32 = 0;
        let mut time_offset = 0.0_f64;

        for (index, chunk) in chunks.iter().enumerate() {
            info!(
                "[{}] Transcribing chunk {}/{}",
                job.id,
                index + 1,
                chunks.len()
            );
            let part = self.engine.transcribe(chunk)?;
            for mut segment in part.segments {
                segment.id = next_id;
                next_id += 1;
                segment.start += time_offset;
                segment.end += time_offset;
                for word in &mut segment.words {
                    word.start += time_offset;
                    word.end += time_offset;
                }
                segments.push(segment);
            }

            // Real chunk lengths vary by rounding at split boundaries, so
            // advance by the probed duration; the nominal length is only a
            // fallback when the probe comes up empty.
            time_offset += self
                .media
                .probe_duration(chunk)
                .unwrap_or(f64::from(self.chunk_duration));

            info!(
                "[{}] Chunk {} done - {} segment(s) so far.",
                job.id,
                index + 1,
                segments.len()
            );
        }

        Ok(Transcript { segments })
    }
}

/// Reassign segment ids as a dense zero-based sequence in playback order
fn renumber(mut transcript: Transcript) -> Transcript {
    for (index, segment) in transcript.segments.iter_mut().enumerate() {
        segment.id = index as u32;
    }
    transcript
}
