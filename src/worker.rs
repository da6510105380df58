// Background worker pool
//
// A small pool of tasks pulls queued jobs off a bounded channel and runs
// each one on a blocking thread under a timeout, so request handling never
// blocks on transcription and a hung engine call cannot wedge a job
// forever without a terminal record.

use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::SendError};
use tokio::sync::Mutex;

use crate::job_store::JobStore;
use crate::pipeline::{QueuedJob, Transcriber};

const QUEUE_CAPACITY: usize = 100;

/// Handle for submitting jobs to the background workers
#[derive(Clone)]
pub struct WorkerPool {
    job_tx: mpsc::Sender<QueuedJob>,
}

impl WorkerPool {
    /// Spawn `workers` worker tasks sharing one job channel
    pub fn start(
        workers: usize,
        job_timeout: Duration,
        transcriber: Arc<Transcriber>,
        jobs: JobStore,
    ) -> Self {
        let (job_tx, job_rx) = mpsc::channel::<QueuedJob>(QUEUE_CAPACITY);
        let job_rx = Arc::new(Mutex::new(job_rx));

        for worker_id in 0..workers.max(1) {
            let job_rx = Arc::clone(&job_rx);
            let transcriber = Arc::clone(&transcriber);
            let jobs = jobs.clone();

            tokio::spawn(async move {
                info!("Transcription worker {} started", worker_id);
                loop {
                    // Lock only to receive, not while working
                    let job = { job_rx.lock().await.recv().await };
                    let Some(job) = job else { break };
                    let job_id = job.id.clone();

                    let runner = Arc::clone(&transcriber);
                    let handle = tokio::task::spawn_blocking(move || runner.run_job(job));

                    match tokio::time::timeout(job_timeout, handle).await {
                        Ok(Ok(())) => {}
                        Ok(Err(join_err)) => {
                            error!("[{}] Transcription task panicked: {}", job_id, join_err);
                            if let Err(e) =
                                jobs.fail(&job_id, "internal transcription failure".to_string())
                            {
                                warn!("[{}] Could not record failure: {}", job_id, e);
                            }
                        }
                        Err(_) => {
                            // The blocking call keeps running; the terminal-state
                            // rule makes its late status update a rejected no-op.
                            warn!(
                                "[{}] Transcription timed out after {}s",
                                job_id,
                                job_timeout.as_secs()
                            );
                            if let Err(e) = jobs.fail(
                                &job_id,
                                format!(
                                    "transcription timed out after {}s",
                                    job_timeout.as_secs()
                                ),
                            ) {
                                warn!("[{}] Could not record timeout: {}", job_id, e);
                            }
                        }
                    }
                }
                info!("Transcription worker {} stopped", worker_id);
            });
        }

        Self { job_tx }
    }

    /// Queue a job for background transcription
    pub async fn submit(&self, job: QueuedJob) -> Result<(), SendError<QueuedJob>> {
        self.job_tx.send(job).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TranscriptCache;
    use crate::engine::{EngineError, TranscriptionEngine};
    use crate::job_store::{Job, JobStatus};
    use crate::media::{MediaTools, SplitError};
    use crate::models::{Segment, Transcript};
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    struct NoMedia;

    impl MediaTools for NoMedia {
        fn probe_duration(&self, _path: &Path) -> Option<f64> {
            None
        }

        fn split(
            &self,
            _src: &Path,
            _chunk_dir: &Path,
            _chunk_secs: u32,
        ) -> Result<Vec<PathBuf>, SplitError> {
            Ok(Vec::new())
        }
    }

    /// Engine that sleeps before answering, to exercise the timeout path
    struct SlowEngine {
        delay: Duration,
    }

    impl TranscriptionEngine for SlowEngine {
        fn transcribe(&self, _audio: &Path) -> Result<Transcript, EngineError> {
            std::thread::sleep(self.delay);
            Ok(Transcript {
                segments: vec![Segment {
                    id: 0,
                    start: 0.0,
                    end: 1.0,
                    text: "done".into(),
                    words: Vec::new(),
                }],
            })
        }
    }

    fn pool_fixture(delay: Duration, timeout: Duration) -> (WorkerPool, JobStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let storage = dir.path().to_path_buf();
        let jobs = JobStore::load(&storage.join("jobs.json"));
        let transcriber = Arc::new(Transcriber::new(
            Arc::new(NoMedia),
            Arc::new(SlowEngine { delay }),
            TranscriptCache::new(&storage),
            jobs.clone(),
            1800,
            storage,
        ));
        let pool = WorkerPool::start(2, timeout, transcriber, jobs.clone());
        (pool, jobs, dir)
    }

    async fn wait_terminal(jobs: &JobStore, id: &str) -> Job {
        for _ in 0..100 {
            if let Some(job) = jobs.get(id) {
                if job.status != JobStatus::Processing {
                    return job;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("job {} never reached a terminal state", id);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn submitted_job_completes_in_background() {
        let (pool, jobs, _dir) = pool_fixture(Duration::from_millis(10), Duration::from_secs(5));
        jobs.create(Job::new(
            "j1".into(),
            "t".into(),
            "/uploads/d.pdf".into(),
            "/uploads/a.mp3".into(),
        ))
        .unwrap();

        pool.submit(QueuedJob {
            id: "j1".into(),
            audio_path: PathBuf::from("a.mp3"),
            audio_hash: "h1".into(),
        })
        .await
        .unwrap();

        let job = wait_terminal(&jobs, "j1").await;
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.result.is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stuck_job_is_marked_error_on_timeout() {
        let (pool, jobs, _dir) =
            pool_fixture(Duration::from_millis(800), Duration::from_millis(100));
        jobs.create(Job::new(
            "j1".into(),
            "t".into(),
            "/uploads/d.pdf".into(),
            "/uploads/a.mp3".into(),
        ))
        .unwrap();

        pool.submit(QueuedJob {
            id: "j1".into(),
            audio_path: PathBuf::from("a.mp3"),
            audio_hash: "h1".into(),
        })
        .await
        .unwrap();

        let job = wait_terminal(&jobs, "j1").await;
        assert_eq!(job.status, JobStatus::Error);
        assert!(job.error.unwrap().contains("timed out"));
    }
}
