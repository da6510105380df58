// Audiolens data models
//
// This module contains the transcript data model and the request/response
// types used across the API.

use serde::{Deserialize, Serialize};

/// A complete, time-aligned transcript of one audio file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Transcript {
    /// Segments in playback order
    pub segments: Vec<Segment>,
}

/// A contiguous span of transcribed speech
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    /// Dense, zero-based index in playback order
    pub id: u32,
    /// Start time in seconds on the global timeline
    pub start: f64,
    /// End time in seconds on the global timeline
    pub end: f64,
    /// Segment text
    pub text: String,
    /// Word-level timings, if the engine provided them
    #[serde(default)]
    pub words: Vec<Word>,
}

/// A single word with its timing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Word {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// The word itself; the Whisper CLI names this field "word"
    #[serde(alias = "word")]
    pub text: String,
}

/// Response for upload requests
#[derive(Serialize, Deserialize)]
pub struct UploadResponse {
    /// Job ID assigned to the upload
    pub job_id: String,
}

/// Response for job status requests
///
/// The shape varies with the job status, matching the persisted job record:
/// processing carries nothing, completed carries the file URLs and the
/// transcript, error carries the failure message.
#[derive(Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StatusResponse {
    Processing,
    Completed {
        document_url: String,
        audio_url: String,
        title: String,
        transcript: Transcript,
    },
    Error {
        error_msg: String,
    },
}

/// One entry of the completed-jobs history
#[derive(Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Job ID
    pub id: String,
    /// Title derived from the original audio filename
    pub title: String,
    /// URL of the stored document
    pub document_url: String,
    /// URL of the stored audio file
    pub audio_url: String,
}

/// Error response for API
#[derive(Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}
