//! Artifacts writers: where checks and the orchestrator leave files for later
//! inspection.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

pub trait ArtifactsWriter: Send + Sync {
    /// Directory all artifacts are written under.
    fn path(&self) -> &Path;

    /// Write `contents` to `name` (relative to [`ArtifactsWriter::path`]) and
    /// return the full path written.
    fn write_file(&self, name: &str, contents: &[u8]) -> io::Result<PathBuf>;
}

/// Writes artifacts to a directory on disk.
#[derive(Debug)]
pub struct FilesystemWriter {
    dir: PathBuf,
}

impl FilesystemWriter {
    /// Create (if needed) and bind to `dir`. Relative paths are resolved
    /// against the current directory so later `cd`s do not move artifacts.
    pub fn new(dir: &Path) -> io::Result<Self> {
        let dir = if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            std::env::current_dir()?.join(dir)
        };
        std::fs::create_dir_all(&dir)?;
        debug!("artifacts directory: {}", dir.display());
        Ok(Self { dir })
    }
}

impl ArtifactsWriter for FilesystemWriter {
    fn path(&self) -> &Path {
        &self.dir
    }

    fn write_file(&self, name: &str, contents: &[u8]) -> io::Result<PathBuf> {
        let full = self.dir.join(name);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&full, contents)?;
        debug!("wrote artifact {}", full.display());
        Ok(full)
    }
}

/// Keeps artifacts in memory. Useful for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    root: PathBuf,
    files: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: Mutex::default(),
        }
    }

    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }
}

impl ArtifactsWriter for MemoryWriter {
    fn path(&self) -> &Path {
        &self.root
    }

    fn write_file(&self, name: &str, contents: &[u8]) -> io::Result<PathBuf> {
        self.files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string(), contents.to_vec());
        Ok(self.root.join(name))
    }
}
