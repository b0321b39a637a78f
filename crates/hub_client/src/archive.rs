//! Bundle extraction.
//!
//! Bundles are tar streams, gzip-compressed or not. Compression is decided
//! by the first two bytes of the file, never by its name. Every entry must
//! land under the destination directory; the first one that would not
//! aborts the extraction (files already written stay). A gzip bundle may
//! hold several concatenated members; all of them are read.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::MultiGzDecoder;
use tar::{Archive, EntryType};

use crate::error::{HubError, Result};

/// First two bytes of every gzip member.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// True if `bytes` starts with the gzip magic number.
pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.starts_with(&GZIP_MAGIC)
}

/// Extract the archive at `archive_path` into `dest`. Returns the number
/// of files and directories written.
pub fn extract_archive(archive_path: &Path, dest: &Path) -> Result<usize> {
    let file = File::open(archive_path)
        .map_err(|e| HubError::Io(format!("{}: {}", archive_path.display(), e)))?;
    let mut reader = BufReader::new(file);

    let compressed = is_gzip(reader.fill_buf()?);
    log::debug!(
        "extracting {} ({}) into {}",
        archive_path.display(),
        if compressed { "gzip" } else { "tar" },
        dest.display()
    );

    if compressed {
        extract_from_reader(MultiGzDecoder::new(reader), dest)
    } else {
        extract_from_reader(reader, dest)
    }
}

/// Extract an uncompressed tar stream into `dest`.
pub fn extract_from_reader<R: Read>(reader: R, dest: &Path) -> Result<usize> {
    fs::create_dir_all(dest)?;
    let root = clean_path(&fs::canonicalize(dest)?);

    let mut archive = Archive::new(reader);
    let entries = archive.entries().map_err(malformed)?;
    let mut written = 0;

    for entry in entries {
        let mut entry = entry.map_err(malformed)?;
        let name = entry.path().map_err(malformed)?.into_owned();
        let target = clean_path(&root.join(&name));

        // Lexical check first, then again through whatever is already on disk.
        if !target.starts_with(&root) || !resolves_inside(&root, &target) {
            return Err(HubError::PathEscape { entry: name.display().to_string() });
        }

        let mode = entry.header().mode().map_err(malformed)?;
        match entry.header().entry_type() {
            EntryType::Directory => {
                fs::create_dir_all(&target)?;
                if target != root {
                    set_mode(&target, mode)?;
                }
            }
            EntryType::Regular | EntryType::Continuous => {
                if target == root {
                    return Err(HubError::Extraction(format!(
                        "file entry '{}' has no name",
                        name.display()
                    )));
                }
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                let mut out = File::create(&target)?;
                io::copy(&mut entry, &mut out).map_err(malformed)?;
                drop(out);
                set_mode(&target, mode)?;
            }
            other => {
                log::warn!("skipping archive entry '{}' of type {:?}", name.display(), other);
                continue;
            }
        }

        log::debug!("  {}", name.display());
        written += 1;
    }

    Ok(written)
}

/// Lexically normalise a path: drop `.`, fold `..` into its parent.
/// `..` never climbs above the root of an absolute path.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                out.push(component.as_os_str());
            }
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
        }
    }
    out
}

/// True if the deepest part of `target` that already exists resolves,
/// symlinks followed, to somewhere under `root`.
fn resolves_inside(root: &Path, target: &Path) -> bool {
    let mut existing = target;
    loop {
        if fs::symlink_metadata(existing).is_ok() {
            // A dangling link fails to canonicalize and counts as outside.
            return fs::canonicalize(existing)
                .map(|real| real.starts_with(root))
                .unwrap_or(false);
        }
        match existing.parent() {
            Some(parent) => existing = parent,
            None => return false,
        }
    }
}

fn malformed(e: io::Error) -> HubError {
    HubError::Extraction(e.to_string())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
