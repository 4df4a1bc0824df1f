//! Layout and bookkeeping of the on-disk artifact directory.
//!
//! Finished transcodes live at `{dir}/{media_id}.mp3`. In-flight output is
//! written to `{dir}/{media_id}.mp3.temp` and renamed into place, so a
//! reader only ever sees complete files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{info, warn};

const AUDIO_EXT: &str = "mp3";
const TEMP_EXT: &str = "temp";

#[derive(Clone, Debug)]
pub struct ArtifactFile {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub created: SystemTime,
}

#[derive(Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, media_id: &str) -> PathBuf {
        self.dir.join(format!("{media_id}.{AUDIO_EXT}"))
    }

    pub fn temp_path(&self, media_id: &str) -> PathBuf {
        self.dir.join(format!("{media_id}.{AUDIO_EXT}.{TEMP_EXT}"))
    }

    pub async fn exists(&self, media_id: &str) -> bool {
        tokio::fs::metadata(self.path(media_id)).await.is_ok()
    }

    /// Creates the directory and removes `.temp` leftovers from a previous
    /// run. Called once at startup, before anything is served.
    pub fn prepare(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let mut removed = 0usize;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == TEMP_EXT) {
                match fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(e) => warn!("Failed to remove stale temp file {}: {}", path.display(), e),
                }
            }
        }
        if removed > 0 {
            info!("Removed {} stale temp file(s) from {}", removed, self.dir.display());
        }
        Ok(())
    }

    /// All finished artifacts, oldest first by creation time.
    pub fn list(&self) -> Vec<ArtifactFile> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to read {}: {}", self.dir.display(), e);
                return Vec::new();
            }
        };
        let mut files: Vec<ArtifactFile> = entries
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension()? != AUDIO_EXT {
                    return None;
                }
                let meta = entry.metadata().ok()?;
                let created = meta.created().or_else(|_| meta.modified()).ok()?;
                Some(ArtifactFile {
                    name: path.file_name()?.to_string_lossy().into_owned(),
                    size: meta.len(),
                    created,
                    path,
                })
            })
            .collect();
        files.sort_by_key(|file| file.created);
        files
    }
}
