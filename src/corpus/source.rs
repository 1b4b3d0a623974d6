use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Raw bytes of one rule document plus where they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub source: String,
    pub bytes: Vec<u8>,
}

/// The external content store the corpus is loaded from.
pub trait ContentSource {
    fn load(&self) -> Result<Vec<SourceEntry>, SourceError>;
}

/// Documents held in memory, keyed by source name.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.entries.insert(source.into(), content.into());
    }

    pub fn with(mut self, source: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(source, content);
        self
    }
}

impl ContentSource for MemorySource {
    fn load(&self) -> Result<Vec<SourceEntry>, SourceError> {
        Ok(self
            .entries
            .iter()
            .map(|(source, bytes)| SourceEntry {
                source: source.clone(),
                bytes: bytes.clone(),
            })
            .collect())
    }
}

/// `*.md` files directly inside a directory, sorted by file name.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ContentSource for DirectorySource {
    fn load(&self) -> Result<Vec<SourceEntry>, SourceError> {
        if !self.root.is_dir() {
            return Err(SourceError::NotADirectory(self.root.clone()));
        }

        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| SourceError::Io { path, source }
        };

        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(io_err(&self.root))? {
            let path = entry.map_err(io_err(&self.root))?.path();
            let is_markdown = path.extension().map_or(false, |ext| ext == "md");
            if is_markdown && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut entries = Vec::with_capacity(paths.len());
        for path in paths {
            let bytes = fs::read(&path).map_err(io_err(&path))?;
            let source = path
                .strip_prefix(&self.root)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace('\\', "/");
            entries.push(SourceEntry { source, bytes });
        }

        Ok(entries)
    }
}
