use fs_err as fs;
use serde::Serialize;
use std::io::{self, Cursor};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::errors::CodeGenError;
use crate::prompt::STYLESHEET_NAME;
use crate::scaffold::backend_files;
use crate::store::{ArchiveId, ArtifactStore};
use crate::wire::{BackendArtifact, FrontendArtifact};

pub const PAGE_NAME: &str = "index.html";
pub const BACKEND_DIR: &str = "backend";
const MAX_ID_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct PackagedResult {
    pub archive_id: ArchiveId,
    pub archive_path: String,
    pub bytes: u64,
}

/// Lays generated files out in a scratch tree, zips it and hands the archive
/// to the store. The scratch tree never outlives a call.
#[derive(Clone)]
pub struct Packager {
    store: Arc<dyn ArtifactStore>,
    scratch_root: Option<PathBuf>,
}

impl Packager {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { store, scratch_root: None }
    }

    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    pub fn package(
        &self,
        frontend: &FrontendArtifact,
        backend: &BackendArtifact,
    ) -> Result<PackagedResult, CodeGenError> {
        let mut files = vec![
            (PAGE_NAME.to_string(), frontend.html_code.clone()),
            (STYLESHEET_NAME.to_string(), frontend.css_code.clone()),
        ];
        files.extend(
            backend_files(backend)
                .into_iter()
                .map(|(key, content)| (format!("{BACKEND_DIR}/{key}"), content)),
        );
        self.package_files(&files)
    }

    /// Packages arbitrary `(relative path, content)` pairs. Keys may contain
    /// `/`; absolute keys and `..` are refused.
    pub fn package_files(&self, files: &[(String, String)]) -> Result<PackagedResult, CodeGenError> {
        let scratch = self.scratch_dir()?;
        debug!(dir = %scratch.path().display(), files = files.len(), "scratch directory ready");

        for (key, content) in files {
            write_file(scratch.path(), key, content)?;
        }
        let archive = zip_tree(scratch.path())?;
        let result = self.store_archive(&archive)?;

        if let Err(e) = scratch.close() {
            warn!(error = %e, "could not remove scratch directory");
        }
        info!(
            archive = %result.archive_id,
            path = %result.archive_path,
            size = %humansize::format_size(result.bytes, humansize::DECIMAL),
            "archive packaged"
        );
        Ok(result)
    }

    fn scratch_dir(&self) -> Result<TempDir, CodeGenError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("vibe-scratch-");
        let dir = match &self.scratch_root {
            Some(root) => {
                fs::create_dir_all(root)
                    .map_err(|e| CodeGenError::storage("create scratch root", e))?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        };
        dir.map_err(|e| CodeGenError::storage("create scratch directory", e))
    }

    fn store_archive(&self, archive: &[u8]) -> Result<PackagedResult, CodeGenError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = ArchiveId::generate();
            if self.store.put(&id, archive)? {
                return Ok(PackagedResult {
                    archive_path: self.store.locate(&id),
                    archive_id: id,
                    bytes: archive.len() as u64,
                });
            }
            warn!(archive = %id, "archive id already taken; drawing a new one");
        }
        Err(CodeGenError::Storage(format!(
            "no free archive id after {MAX_ID_ATTEMPTS} attempts"
        )))
    }
}

fn safe_join(root: &Path, key: &str) -> Result<PathBuf, CodeGenError> {
    let rel = Path::new(key);
    let normal = rel.components().all(|c| matches!(c, Component::Normal(_)));
    if key.is_empty() || !normal {
        return Err(CodeGenError::Storage(format!("refusing artifact path {key:?}")));
    }
    Ok(root.join(rel))
}

fn write_file(root: &Path, key: &str, content: &str) -> Result<(), CodeGenError> {
    let abs = safe_join(root, key)?;
    if let Some(parent) = abs.parent() {
        fs::create_dir_all(parent).map_err(|e| CodeGenError::storage("create artifact folder", e))?;
    }
    fs::write(&abs, content).map_err(|e| CodeGenError::storage("write artifact", e))
}

/// Zips everything under `root` with forward-slash names relative to it.
fn zip_tree(root: &Path) -> Result<Vec<u8>, CodeGenError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);
    let dir_options = options.unix_permissions(0o755);

    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| CodeGenError::storage("walk scratch directory", e))?;
        let rel = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| CodeGenError::storage("relativize entry", e))?;
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if entry.file_type().is_dir() {
            zip.add_directory(format!("{name}/"), dir_options)
                .map_err(|e| CodeGenError::storage("add archive folder", e))?;
        } else {
            zip.start_file(name, options)
                .map_err(|e| CodeGenError::storage("add archive entry", e))?;
            let mut file = fs::File::open(entry.path())
                .map_err(|e| CodeGenError::storage("open artifact", e))?;
            io::copy(&mut file, &mut zip).map_err(|e| CodeGenError::storage("compress artifact", e))?;
        }
    }

    let cursor = zip.finish().map_err(|e| CodeGenError::storage("finish archive", e))?;
    Ok(cursor.into_inner())
}
