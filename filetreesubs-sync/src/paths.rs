//! Relative-path normalization, directory guarantees, and encoded text I/O.
//!
//! Relative paths are `String`s joined with `/`; the root itself is `""`.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use encoding_rs::Encoding;

use crate::error::{io_err, SyncError};

/// Path of `path` relative to `root`, with `""` for the root itself.
pub fn relname(path: &Path, root: &Path) -> Result<String, SyncError> {
    let rel = path.strip_prefix(root).map_err(|_| {
        io_err(
            path,
            std::io::Error::new(
                ErrorKind::InvalidInput,
                format!("path is not inside {}", root.display()),
            ),
        )
    })?;

    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_str().ok_or_else(|| {
                    io_err(
                        path,
                        std::io::Error::new(ErrorKind::InvalidData, "file name is not valid UTF-8"),
                    )
                })?;
                parts.push(part);
            }
            Component::CurDir => {}
            _ => {
                return Err(io_err(
                    path,
                    std::io::Error::new(ErrorKind::InvalidInput, "unexpected path component"),
                ))
            }
        }
    }
    Ok(parts.join("/"))
}

/// Join a relative directory and a file name.
pub fn join_rel(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

/// Resolve a `/`-separated relative path under `root`.
pub fn under(root: &Path, rel: &str) -> PathBuf {
    if rel.is_empty() {
        return root.to_path_buf();
    }
    rel.split('/').fold(root.to_path_buf(), |acc, part| acc.join(part))
}

/// Create `path` (and parents) unless it is already a directory.
///
/// Fails when something other than a directory already occupies `path`.
pub fn ensure_dir(path: &Path) -> Result<(), SyncError> {
    if path.as_os_str().is_empty() {
        return Ok(());
    }
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => return Ok(()),
        Ok(_) => {
            return Err(io_err(
                path,
                std::io::Error::new(
                    ErrorKind::AlreadyExists,
                    "path already exists and is not a folder",
                ),
            ))
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => return Err(io_err(path, err)),
    }
    match std::fs::create_dir_all(path) {
        Ok(()) => Ok(()),
        // Lost a race with another creator; fine as long as it is a directory now.
        Err(_) if path.is_dir() => Ok(()),
        Err(err) => Err(io_err(path, err)),
    }
}

/// Ensure the directory that will contain `file` exists.
pub fn ensure_parent_dir(file: &Path) -> Result<(), SyncError> {
    match file.parent() {
        Some(parent) => ensure_dir(parent),
        None => Ok(()),
    }
}

/// Read `path` and decode it with `encoding`.
///
/// A byte-order mark is kept as part of the text, never interpreted.
pub fn read_text(path: &Path, encoding: &'static Encoding) -> Result<String, SyncError> {
    let bytes = std::fs::read(path).map_err(|e| io_err(path, e))?;
    encoding
        .decode_without_bom_handling_and_without_replacement(&bytes)
        .map(|text| text.into_owned())
        .ok_or_else(|| SyncError::Decode {
            path: path.to_path_buf(),
            encoding: encoding.name(),
        })
}

/// Encode `content` with `encoding` and write it to `path` atomically.
///
/// Writes `<path>.filetreesubs.tmp` first and renames it over `path`, so a
/// failed write never leaves a truncated destination file behind.
pub fn write_text(path: &Path, content: &str, encoding: &'static Encoding) -> Result<(), SyncError> {
    let (bytes, _, had_unmappable) = encoding.encode(content);
    if had_unmappable {
        return Err(SyncError::Encode {
            path: path.to_path_buf(),
            encoding: encoding.name(),
        });
    }

    let tmp = PathBuf::from(format!("{}.filetreesubs.tmp", path.display()));
    std::fs::write(&tmp, &bytes).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}
