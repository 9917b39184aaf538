//! Where formatted results are persisted.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

pub trait ResultWriter {
    fn open_file(&self, path: &Path) -> io::Result<Box<dyn Write>>;
}

/// Creates (or truncates) files on disk, creating parent directories first.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultWriterFile;

impl ResultWriter for ResultWriterFile {
    fn open_file(&self, path: &Path) -> io::Result<Box<dyn Write>> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Box::new(BufWriter::new(File::create(path)?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn creates_parents_and_writes() {
        let td = TempDir::new().unwrap();
        let path = td.path().join("a/b/results.json");
        {
            let mut w = ResultWriterFile.open_file(&path).unwrap();
            w.write_all(b"{}").unwrap();
            w.flush().unwrap();
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn directory_in_the_way_is_an_error() {
        let td = TempDir::new().unwrap();
        assert!(ResultWriterFile.open_file(td.path()).is_err());
    }
}
