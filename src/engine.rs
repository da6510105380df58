// Transcription engine adapter
//
// The speech-to-text model is an external black box. This module defines
// the adapter trait the pipeline drives and an implementation that invokes
// the Whisper CLI and parses its JSON output.

use log::debug;
use std::env;
use std::fs;
use std::path::Path;
use std::process::Command;
use thiserror::Error;
use uuid::Uuid;

use crate::models::Transcript;

const DEFAULT_WHISPER_CMD: &str = "whisper";
const DEFAULT_MODEL: &str = "tiny";

/// Error from the external transcription engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine process could not be started or its output not read
    #[error("Failed to run transcription engine: {0}")]
    Spawn(#[from] std::io::Error),
    /// The engine process exited unsuccessfully
    #[error("Transcription failed: {0}")]
    Failed(String),
    /// The engine output could not be parsed
    #[error("Unreadable engine output: {0}")]
    BadOutput(#[from] serde_json::Error),
}

/// Adapter over one speech-to-text invocation
pub trait TranscriptionEngine: Send + Sync {
    /// Transcribe a single audio file, returning timed segments with
    /// word-level timings where the engine provides them
    fn transcribe(&self, audio: &Path) -> Result<Transcript, EngineError>;
}

/// Whisper CLI backed engine
pub struct WhisperCli {
    command: String,
    model: String,
}

impl Default for WhisperCli {
    fn default() -> Self {
        Self {
            command: env::var("AUDIOLENS_WHISPER_CMD")
                .unwrap_or_else(|_| String::from(DEFAULT_WHISPER_CMD)),
            model: env::var("AUDIOLENS_MODEL").unwrap_or_else(|_| String::from(DEFAULT_MODEL)),
        }
    }
}

impl WhisperCli {
    /// Model size in use, for startup logging
    pub fn model(&self) -> &str {
        &self.model
    }

    fn run(&self, audio: &Path, scratch: &Path) -> Result<Transcript, EngineError> {
        fs::create_dir_all(scratch)?;

        let output = Command::new(&self.command)
            .arg(audio)
            .arg("--model")
            .arg(&self.model)
            .arg("--output_format")
            .arg("json")
            .arg("--output_dir")
            .arg(scratch)
            .arg("--word_timestamps")
            .arg("True")
            .arg("--fp16")
            .arg("False")
            .output()?;

        if !output.status.success() {
            return Err(EngineError::Failed(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }

        // The CLI names its output after the input file's stem
        let stem = audio
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("audio");
        let result_path = scratch.join(format!("{}.json", stem));
        let content = fs::read_to_string(&result_path)?;
        let transcript: Transcript = serde_json::from_str(&content)?;
        debug!(
            "Engine produced {} segment(s) for {}",
            transcript.segments.len(),
            audio.display()
        );
        Ok(transcript)
    }
}

impl TranscriptionEngine for WhisperCli {
    fn transcribe(&self, audio: &Path) -> Result<Transcript, EngineError> {
        let parent = audio.parent().unwrap_or_else(|| Path::new("."));
        let scratch = parent.join(format!(".stt_{}", Uuid::new_v4()));
        let result = self.run(audio, &scratch);
        // Scratch dir goes away on success and failure alike
        let _ = fs::remove_dir_all(&scratch);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whisper_json_output_deserializes() {
        let raw = r#"{
            "text": " Hello there.",
            "language": "en",
            "segments": [
                {
                    "id": 0,
                    "seek": 0,
                    "start": 0.0,
                    "end": 2.4,
                    "text": " Hello there.",
                    "words": [
                        {"word": " Hello", "start": 0.0, "end": 1.1, "probability": 0.98},
                        {"word": " there.", "start": 1.1, "end": 2.4, "probability": 0.97}
                    ]
                }
            ]
        }"#;
        let transcript: Transcript = serde_json::from_str(raw).unwrap();
        assert_eq!(transcript.segments.len(), 1);
        assert_eq!(transcript.segments[0].words[1].text, " there.");
    }

    #[test]
    fn missing_engine_command_is_a_spawn_error() {
        let engine = WhisperCli {
            command: "whisper-does-not-exist".into(),
            model: "tiny".into(),
        };
        let dir = tempfile::tempdir().unwrap();
        let err = engine.transcribe(&dir.path().join("a.wav")).unwrap_err();
        assert!(matches!(err, EngineError::Spawn(_)));
    }
}
