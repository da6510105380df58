// Transcript cache
//
// Persistent store of finished transcripts keyed by the audio content
// hash. One JSON file per distinct hash under the storage root; entries
// are never evicted since content addressing keeps them permanently valid.

use log::{debug, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::models::Transcript;

#[derive(Clone)]
pub struct TranscriptCache {
    dir: PathBuf,
}

impl TranscriptCache {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    fn entry_path(&self, hash: &str) -> PathBuf {
        self.dir.join(format!("{}.json", hash))
    }

    /// Look up a cached transcript by content hash
    ///
    /// An unreadable or corrupt entry is logged and treated as a miss so
    /// the audio is simply transcribed again.
    pub fn lookup(&self, hash: &str) -> Option<Transcript> {
        let path = self.entry_path(hash);
        if !path.exists() {
            return None;
        }
        match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(transcript) => {
                    debug!("Cache hit for {}", hash);
                    Some(transcript)
                }
                Err(e) => {
                    warn!("Corrupt cache entry {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) => {
                warn!("Failed to read cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Store a transcript under its content hash
    ///
    /// Idempotent: an existing entry is left untouched. The write goes
    /// through a temp file and an atomic rename so concurrent writers of
    /// the same hash cannot leave a torn entry behind.
    pub fn store(&self, hash: &str, transcript: &Transcript) -> io::Result<()> {
        let path = self.entry_path(hash);
        if path.exists() {
            debug!("Cache entry for {} already present", hash);
            return Ok(());
        }
        let serialized = serde_json::to_string(transcript)?;
        let tmp = self.dir.join(format!("{}.json.tmp", hash));
        fs::write(&tmp, serialized)?;
        fs::rename(&tmp, &path)?;
        debug!("Cached transcript for {}", hash);
        Ok(())
    }
}
