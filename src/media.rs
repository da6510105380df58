// External media tooling
//
// This module wraps the external ffmpeg/ffprobe processes behind a narrow
// capability trait so the pipeline can be tested against a fake
// implementation. Process-spawn details stay entirely inside this module.

use log::debug;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

const DEFAULT_FFMPEG: &str = "ffmpeg";
const DEFAULT_FFPROBE: &str = "ffprobe";

/// Error splitting an audio file into chunks
#[derive(Error, Debug)]
pub enum SplitError {
    /// The splitter process could not be started
    #[error("Failed to run splitter: {0}")]
    Spawn(#[from] std::io::Error),
    /// The splitter process exited unsuccessfully
    #[error("Audio split failed: {0}")]
    Failed(String),
}

/// Capability interface over the external media tools
///
/// `probe_duration` never fails hard: an unknown duration is a valid,
/// commonly occurring result that callers fall back from.
pub trait MediaTools: Send + Sync {
    /// Duration of a media file in seconds, or None if it cannot be determined
    fn probe_duration(&self, path: &Path) -> Option<f64>;

    /// Split `src` into fixed-format chunks of at most `chunk_secs` seconds
    /// inside `chunk_dir`, returning the chunk paths in chronological order
    fn split(&self, src: &Path, chunk_dir: &Path, chunk_secs: u32)
        -> Result<Vec<PathBuf>, SplitError>;
}

/// ffmpeg/ffprobe backed implementation
pub struct Ffmpeg {
    ffmpeg: String,
    ffprobe: String,
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self {
            ffmpeg: env::var("AUDIOLENS_FFMPEG").unwrap_or_else(|_| String::from(DEFAULT_FFMPEG)),
            ffprobe: env::var("AUDIOLENS_FFPROBE")
                .unwrap_or_else(|_| String::from(DEFAULT_FFPROBE)),
        }
    }
}

impl MediaTools for Ffmpeg {
    fn probe_duration(&self, path: &Path) -> Option<f64> {
        let output = Command::new(&self.ffprobe)
            .arg("-v")
            .arg("error")
            .arg("-show_entries")
            .arg("format=duration")
            .arg("-of")
            .arg("csv=p=0")
            .arg(path)
            .output()
            .ok()?;
        if !output.status.success() {
            debug!("ffprobe failed for {}", path.display());
            return None;
        }
        String::from_utf8_lossy(&output.stdout).trim().parse().ok()
    }

    fn split(
        &self,
        src: &Path,
        chunk_dir: &Path,
        chunk_secs: u32,
    ) -> Result<Vec<PathBuf>, SplitError> {
        fs::create_dir_all(chunk_dir)?;

        // Named so lexicographic order equals chronological order
        let pattern = chunk_dir.join("chunk_%04d.wav");
        let output = Command::new(&self.ffmpeg)
            .arg("-y")
            .arg("-i")
            .arg(src)
            .arg("-f")
            .arg("segment")
            .arg("-segment_time")
            .arg(chunk_secs.to_string())
            .arg("-ar")
            .arg("16000")
            .arg("-ac")
            .arg("1")
            .arg("-c:a")
            .arg("pcm_s16le")
            .arg(&pattern)
            .output()?;

        if !output.status.success() {
            return Err(SplitError::Failed(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }

        collect_chunks(chunk_dir)
    }
}

/// Collect and sort the chunk files produced by the splitter
fn collect_chunks(chunk_dir: &Path) -> Result<Vec<PathBuf>, SplitError> {
    let mut chunks: Vec<PathBuf> = fs::read_dir(chunk_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("chunk_") && n.ends_with(".wav"))
                .unwrap_or(false)
        })
        .collect();
    chunks.sort();
    Ok(chunks)
}
