//! Storage abstraction: existence checks, content retrieval and content
//! signatures.  The scanner only ever compares signatures; it never derives
//! them itself.

use rustc_hash::FxHashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::SystemTime;

/// Opaque fingerprint of a file's content, e.g. a hash or a modification
/// fingerprint.  Only meaningful when compared with another signature of the
/// same file.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Signature(pub u64);

/// Stat info gathered for a path.  This also models "file is absent".
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Stat {
    Missing,
    Directory,
    File(Signature),
}

impl Stat {
    pub fn signature(&self) -> Option<Signature> {
        match *self {
            Stat::File(sig) => Some(sig),
            _ => None,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Stat::File(_))
    }
}

pub trait FileSystem: Sync {
    /// stat() an on-disk path, producing its Stat.
    fn stat(&self, path: &str) -> std::io::Result<Stat>;
    fn read(&self, path: &str) -> std::io::Result<Vec<u8>>;
}

pub struct RealFileSystem {}
impl RealFileSystem {
    pub fn new() -> Self {
        RealFileSystem {}
    }
}

impl Default for RealFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

fn open_path(path: &str) -> &str {
    // The canonical form of the working directory is "".
    if path.is_empty() {
        "."
    } else {
        path
    }
}

impl FileSystem for RealFileSystem {
    fn stat(&self, path: &str) -> std::io::Result<Stat> {
        let meta = match std::fs::metadata(open_path(path)) {
            Ok(meta) => meta,
            Err(err) => {
                if err.kind() == std::io::ErrorKind::NotFound {
                    return Ok(Stat::Missing);
                }
                return Err(err);
            }
        };
        if meta.is_dir() {
            return Ok(Stat::Directory);
        }
        let mtime = meta
            .modified()?
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default();
        let mut hasher = DefaultHasher::new();
        mtime.hash(&mut hasher);
        meta.len().hash(&mut hasher);
        Ok(Stat::File(Signature(hasher.finish())))
    }

    fn read(&self, path: &str) -> std::io::Result<Vec<u8>> {
        std::fs::read(open_path(path))
    }
}

struct MemoryFile {
    content: Vec<u8>,
    readable: bool,
}

/// Memory-backed FileSystem, for tests and for callers that already hold
/// file contents.  Directories exist implicitly as prefixes of file paths.
#[derive(Default)]
pub struct MemoryFileSystem {
    files: FxHashMap<String, MemoryFile>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file.
    pub fn add(&mut self, path: &str, content: impl Into<Vec<u8>>) {
        self.files.insert(
            path.to_owned(),
            MemoryFile {
                content: content.into(),
                readable: true,
            },
        );
    }

    pub fn remove(&mut self, path: &str) {
        self.files.remove(path);
    }

    /// Make reads of an existing file fail while stat() still succeeds.
    pub fn make_unreadable(&mut self, path: &str) {
        if let Some(file) = self.files.get_mut(path) {
            file.readable = false;
        }
    }

    fn is_dir(&self, path: &str) -> bool {
        if path.is_empty() {
            return true;
        }
        let prefix = if path.ends_with('/') {
            path.to_owned()
        } else {
            format!("{}/", path)
        };
        self.files.keys().any(|name| name.starts_with(&prefix))
    }
}

impl FileSystem for MemoryFileSystem {
    fn stat(&self, path: &str) -> std::io::Result<Stat> {
        if let Some(file) = self.files.get(path) {
            let mut hasher = DefaultHasher::new();
            file.content.hash(&mut hasher);
            return Ok(Stat::File(Signature(hasher.finish())));
        }
        if self.is_dir(path) {
            return Ok(Stat::Directory);
        }
        Ok(Stat::Missing)
    }

    fn read(&self, path: &str) -> std::io::Result<Vec<u8>> {
        match self.files.get(path) {
            Some(file) if file.readable => Ok(file.content.clone()),
            Some(_) => Err(std::io::Error::from(
                std::io::ErrorKind::PermissionDenied,
            )),
            None => Err(std::io::Error::from(std::io::ErrorKind::NotFound)),
        }
    }
}
