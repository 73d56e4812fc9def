//! Task actions: the filesystem operations behind each task category.
//!
//! Removals are best effort: a failure is logged and the run continues.
//! Everything else fails the task.

use std::io::ErrorKind;
use std::path::Path;

use encoding_rs::Encoding;
use filetime::FileTime;

use filetreesubs_core::Config;

use crate::error::{io_err, SyncError};
use crate::paths::{ensure_parent_dir, read_text, write_text};
use crate::replacements::ReplacementRegistry;
use crate::substitute::substitute;
use crate::tasks::TaskAction;

/// Everything an action needs besides its paths.
#[derive(Debug, Clone, Copy)]
pub struct ActionContext<'a> {
    registry: &'a ReplacementRegistry,
    encoding: &'static Encoding,
    index_content: &'a str,
}

impl<'a> ActionContext<'a> {
    pub fn new(config: &'a Config, registry: &'a ReplacementRegistry) -> Self {
        Self {
            registry,
            encoding: registry.encoding(),
            index_content: &config.create_index_content,
        }
    }

    /// Perform `action`.
    pub fn run(&self, action: &TaskAction) -> Result<(), SyncError> {
        match action {
            TaskAction::Copy { src, dst } => copy(src, dst),
            TaskAction::Substitute { src, dst, keys } => {
                substitute_file(src, dst, keys, self.registry, self.encoding)
            }
            TaskAction::CreateIndex { dst } => create_index(dst, self.index_content, self.encoding),
            TaskAction::RemoveFile { path } => {
                remove(path);
                Ok(())
            }
            TaskAction::RemoveDir { path } => {
                remove_dir(path);
                Ok(())
            }
        }
    }
}

/// Copy `src` over `dst`, keeping permissions and timestamps.
pub fn copy(src: &Path, dst: &Path) -> Result<(), SyncError> {
    ensure_parent_dir(dst)?;
    match std::fs::remove_file(dst) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(io_err(dst, e)),
    }
    std::fs::copy(src, dst).map_err(|e| io_err(src, e))?;

    let meta = std::fs::metadata(src).map_err(|e| io_err(src, e))?;
    filetime::set_file_times(
        dst,
        FileTime::from_last_access_time(&meta),
        FileTime::from_last_modification_time(&meta),
    )
    .map_err(|e| io_err(dst, e))?;

    tracing::info!("copied: {}", dst.display());
    Ok(())
}

/// Decode `src`, substitute `keys` with their registry content, write `dst`.
pub fn substitute_file(
    src: &Path,
    dst: &Path,
    keys: &[String],
    registry: &ReplacementRegistry,
    encoding: &'static Encoding,
) -> Result<(), SyncError> {
    let mut replacements = Vec::with_capacity(keys.len());
    for key in keys {
        let content = registry
            .content(key)
            .ok_or_else(|| SyncError::UnknownKey { key: key.clone() })?;
        replacements.push((key.as_str(), content));
    }

    ensure_parent_dir(dst)?;
    let text = read_text(src, encoding)?;
    let text = substitute(&text, replacements);
    write_text(dst, &text, encoding)?;

    tracing::info!("substituted: {}", dst.display());
    Ok(())
}

/// Write the configured index content to `dst`.
pub fn create_index(dst: &Path, content: &str, encoding: &'static Encoding) -> Result<(), SyncError> {
    ensure_parent_dir(dst)?;
    write_text(dst, content, encoding)?;
    tracing::info!("created index: {}", dst.display());
    Ok(())
}

/// Remove a stale destination file.
pub fn remove(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::info!("removed: {}", path.display()),
        Err(e) => tracing::warn!("could not remove {}: {e}", path.display()),
    }
}

/// Remove a stale destination directory and everything below it.
pub fn remove_dir(path: &Path) {
    match std::fs::remove_dir_all(path) {
        Ok(()) => tracing::info!("removed directory: {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("could not remove directory {}: {e}", path.display()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
