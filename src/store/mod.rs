use bytes::Bytes;
use fs_err as fs;
use parking_lot::RwLock;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use tempfile::NamedTempFile;
use uuid::Uuid;

use crate::errors::CodeGenError;

const ID_PREFIX: &str = "code-";
const ID_RANDOM_CHARS: usize = 10;

/// Name of one packaged archive: `code-` plus the first ten characters of a
/// fresh UUID v4.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchiveId(String);

impl ArchiveId {
    pub fn generate() -> Self {
        let uuid = Uuid::new_v4().to_string();
        Self(format!("{ID_PREFIX}{}", &uuid[..ID_RANDOM_CHARS]))
    }

    /// Accepts a download name with or without the `.zip` suffix. Only
    /// `[A-Za-z0-9_-]` is allowed so a name can never leave the store.
    pub fn parse(name: &str) -> Result<Self, CodeGenError> {
        let stem = name.strip_suffix(".zip").unwrap_or(name);
        let valid = !stem.is_empty()
            && stem.len() <= 64
            && stem.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if !valid {
            return Err(CodeGenError::Validation(format!("invalid archive name {name:?}")));
        }
        Ok(Self(stem.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn file_name(&self) -> String {
        format!("{}.zip", self.0)
    }
}

impl fmt::Display for ArchiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ArchiveId {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.0)
    }
}

/// Process-wide, append-only home of packaged archives.
pub trait ArtifactStore: Send + Sync {
    /// Stores `bytes` under `id`. Returns `Ok(false)` without writing when
    /// the id is already taken.
    fn put(&self, id: &ArchiveId, bytes: &[u8]) -> Result<bool, CodeGenError>;

    fn get(&self, id: &ArchiveId) -> Result<Option<Bytes>, CodeGenError>;

    /// Human-readable location of `id`, for logs and results.
    fn locate(&self, id: &ArchiveId) -> String;
}

/// Archives as `<root>/<id>.zip`.
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_of(&self, id: &ArchiveId) -> PathBuf {
        self.root.join(id.file_name())
    }
}

impl ArtifactStore for FsArtifactStore {
    fn put(&self, id: &ArchiveId, bytes: &[u8]) -> Result<bool, CodeGenError> {
        fs::create_dir_all(&self.root)
            .map_err(|e| CodeGenError::storage("create artifact dir", e))?;

        // Written beside the target, then linked in without clobbering so a
        // reader never sees a half-written archive.
        let mut tmp = NamedTempFile::new_in(&self.root)
            .map_err(|e| CodeGenError::storage("create temp archive", e))?;
        tmp.write_all(bytes)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| CodeGenError::storage("write archive", e))?;

        match tmp.persist_noclobber(self.path_of(id)) {
            Ok(_) => Ok(true),
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(CodeGenError::storage("persist archive", e.error)),
        }
    }

    fn get(&self, id: &ArchiveId) -> Result<Option<Bytes>, CodeGenError> {
        match fs::read(self.path_of(id)) {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CodeGenError::storage("read archive", e)),
        }
    }

    fn locate(&self, id: &ArchiveId) -> String {
        self.path_of(id).display().to_string()
    }
}

#[derive(Default)]
pub struct MemoryArtifactStore {
    archives: RwLock<HashMap<ArchiveId, Bytes>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.archives.read().is_empty()
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn put(&self, id: &ArchiveId, bytes: &[u8]) -> Result<bool, CodeGenError> {
        let mut archives = self.archives.write();
        if archives.contains_key(id) {
            return Ok(false);
        }
        archives.insert(id.clone(), Bytes::copy_from_slice(bytes));
        Ok(true)
    }

    fn get(&self, id: &ArchiveId) -> Result<Option<Bytes>, CodeGenError> {
        Ok(self.archives.read().get(id).cloned())
    }

    fn locate(&self, id: &ArchiveId) -> String {
        format!("memory://{}", id.file_name())
    }
}
