// Content-addressed upload storage
//
// This module streams uploaded payloads to disk while computing their
// SHA-256 content hash and enforcing a size ceiling, then relocates them to
// their final content-addressed name. Temporary files are removed on every
// exit path, success or failure.

use log::debug;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::HandlerError;

/// Incremental sink for one uploaded payload
///
/// Bytes are appended with [`write_chunk`](UploadSink::write_chunk) and the
/// upload is sealed with [`finish`](UploadSink::finish). Dropping the sink
/// before a successful `finish` deletes the partial temp file.
pub struct UploadSink {
    file: File,
    path: PathBuf,
    hasher: Sha256,
    written: u64,
    limit: u64,
    name: String,
    sealed: bool,
}

/// A fully streamed payload, still at its temporary path
///
/// The temp file is removed when this value is dropped unless it has been
/// relocated with [`promote`](StreamedUpload::promote) first.
#[derive(Debug)]
pub struct StreamedUpload {
    tmp_path: PathBuf,
    /// Hex-encoded SHA-256 of the payload bytes
    pub sha256: String,
    /// Total payload size in bytes
    pub bytes: u64,
}

impl UploadSink {
    /// Open a new temp file in `dir` for a payload declared as `name`,
    /// enforcing `limit` bytes
    pub fn create(dir: &Path, name: &str, limit: u64) -> io::Result<Self> {
        let path = dir.join(format!(".upload_{}", Uuid::new_v4()));
        let file = File::create(&path)?;
        Ok(Self {
            file,
            path,
            hasher: Sha256::new(),
            written: 0,
            limit,
            name: name.to_string(),
            sealed: false,
        })
    }

    /// Append one chunk of payload data
    pub fn write_chunk(&mut self, data: &[u8]) -> Result<(), HandlerError> {
        self.written += data.len() as u64;
        if self.written > self.limit {
            return Err(HandlerError::PayloadTooLarge {
                name: self.name.clone(),
                limit_mb: self.limit / (1024 * 1024),
            });
        }
        self.file.write_all(data)?;
        self.hasher.update(data);
        Ok(())
    }

    /// Seal the upload, rejecting zero-byte payloads
    pub fn finish(mut self) -> Result<StreamedUpload, HandlerError> {
        if self.written == 0 {
            return Err(HandlerError::EmptyPayload {
                name: self.name.clone(),
            });
        }
        self.file.flush()?;
        self.sealed = true;
        let digest = format!("{:x}", std::mem::take(&mut self.hasher).finalize());
        Ok(StreamedUpload {
            tmp_path: self.path.clone(),
            sha256: digest,
            bytes: self.written,
        })
    }
}

impl Drop for UploadSink {
    fn drop(&mut self) {
        if !self.sealed {
            let _ = fs::remove_file(&self.path);
        }
    }
}

impl StreamedUpload {
    /// Relocate the payload to `{hash}{ext}` under `dir`
    ///
    /// Returns the final filename and whether a file with that name already
    /// existed. On a duplicate the temp copy is simply discarded rather than
    /// overwriting the stored asset.
    pub fn promote(self, dir: &Path, ext: &str) -> io::Result<(String, bool)> {
        let final_name = format!("{}{}", self.sha256, ext);
        let dest = dir.join(&final_name);
        if dest.exists() {
            debug!("Asset {} already on disk, discarding temp copy", final_name);
            Ok((final_name, true))
        } else {
            fs::rename(&self.tmp_path, &dest)?;
            Ok((final_name, false))
        }
    }
}

impl Drop for StreamedUpload {
    fn drop(&mut self) {
        // Gone already if promote renamed it
        let _ = fs::remove_file(&self.tmp_path);
    }
}

/// Extension of an uploaded filename including the dot, or `fallback`
pub fn file_ext(filename: &str, fallback: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_else(|| fallback.to_string())
}

/// Filename without its extension, used as the job title
pub fn file_stem(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Untitled")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn temp_files(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with(".upload_"))
                    .unwrap_or(false)
            })
            .collect()
    }

    #[test]
    fn streams_and_hashes_payload() {
        let dir = tempdir().unwrap();
        let mut sink = UploadSink::create(dir.path(), "a.bin", 1024).unwrap();
        sink.write_chunk(b"hello ").unwrap();
        sink.write_chunk(b"world").unwrap();
        let upload = sink.finish().unwrap();
        assert_eq!(upload.bytes, 11);
        assert_eq!(
            upload.sha256,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn rejects_oversized_payload_and_removes_temp() {
        let dir = tempdir().unwrap();
        let mut sink = UploadSink::create(dir.path(), "big.mp3", 4).unwrap();
        sink.write_chunk(b"12").unwrap();
        let err = sink.write_chunk(b"3456").unwrap_err();
        assert!(matches!(err, HandlerError::PayloadTooLarge { .. }));
        drop(sink);
        assert!(temp_files(dir.path()).is_empty());
    }

    #[test]
    fn rejects_empty_payload_and_removes_temp() {
        let dir = tempdir().unwrap();
        let sink = UploadSink::create(dir.path(), "empty.pdf", 1024).unwrap();
        let err = sink.finish().unwrap_err();
        assert!(matches!(err, HandlerError::EmptyPayload { .. }));
        assert!(temp_files(dir.path()).is_empty());
    }

    #[test]
    fn promote_renames_to_content_addressed_name() {
        let dir = tempdir().unwrap();
        let mut sink = UploadSink::create(dir.path(), "a.mp3", 1024).unwrap();
        sink.write_chunk(b"audio bytes").unwrap();
        let upload = sink.finish().unwrap();
        let hash = upload.sha256.clone();
        let (name, existed) = upload.promote(dir.path(), ".mp3").unwrap();
        assert_eq!(name, format!("{}.mp3", hash));
        assert!(!existed);
        assert!(dir.path().join(&name).exists());
        assert!(temp_files(dir.path()).is_empty());
    }

    #[test]
    fn promote_skips_write_for_duplicate_content() {
        let dir = tempdir().unwrap();

        let mut sink = UploadSink::create(dir.path(), "a.mp3", 1024).unwrap();
        sink.write_chunk(b"same bytes").unwrap();
        let first = sink.finish().unwrap();
        let (name, _) = first.promote(dir.path(), ".mp3").unwrap();

        let mut sink = UploadSink::create(dir.path(), "b.mp3", 1024).unwrap();
        sink.write_chunk(b"same bytes").unwrap();
        let second = sink.finish().unwrap();
        let (name2, existed) = second.promote(dir.path(), ".mp3").unwrap();

        assert_eq!(name, name2);
        assert!(existed);
        assert!(temp_files(dir.path()).is_empty());
    }

    #[test]
    fn unpromoted_upload_is_cleaned_on_drop() {
        let dir = tempdir().unwrap();
        let mut sink = UploadSink::create(dir.path(), "a.mp3", 1024).unwrap();
        sink.write_chunk(b"bytes").unwrap();
        let upload = sink.finish().unwrap();
        drop(upload);
        assert!(temp_files(dir.path()).is_empty());
    }

    #[test]
    fn filename_helpers() {
        assert_eq!(file_ext("lecture.mp3", ".mp3"), ".mp3");
        assert_eq!(file_ext("noext", ".pdf"), ".pdf");
        assert_eq!(file_stem("lecture 3.mp3"), "lecture 3");
        assert_eq!(file_stem(""), "Untitled");
    }
}
