//! Directory tree helpers: traversal, copying and zip archives.

use std::fs;
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};

use zip::write::FileOptions;

use crate::error::{Error, IoResultExt, Result};
use crate::interrupt::CancelFlag;

/// An entry found while walking a tree.
#[derive(Debug)]
pub struct TreeEntry {
    /// Full path of the entry.
    pub path: PathBuf,
    /// Path relative to the root of the walk.
    pub relative: PathBuf,
    /// Whether the entry is a directory.
    pub is_dir: bool,
}

/// Tells [`visit_dirs`] whether to descend into a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    Continue,
    SkipDir,
}

/// Calls `process` on all entries in a directory and its subdirectories.
///
/// Entries are visited in name order, a directory before its content.
pub fn visit_dirs(
    dir: impl AsRef<Path>,
    process: &mut impl FnMut(&TreeEntry) -> Result<Walk>,
) -> Result<()> {
    // Inner function to avoid generating multiple implementations for the different path types.
    fn visit_dirs_impl(
        root: &Path,
        dir: &Path,
        process: &mut impl FnMut(&TreeEntry) -> Result<Walk>,
    ) -> Result<()> {
        for path in sorted_entries(dir)? {
            let is_dir = path.is_dir();
            let entry = TreeEntry {
                relative: path.strip_prefix(root).unwrap_or(&path).to_path_buf(),
                path,
                is_dir,
            };

            if process(&entry)? == Walk::Continue && is_dir {
                visit_dirs_impl(root, &entry.path, process)?;
            }
        }

        Ok(())
    }

    let dir = dir.as_ref();
    visit_dirs_impl(dir, dir, process)
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)
        .at(dir)?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .at(dir)?;
    entries.sort();
    Ok(entries)
}

/// The files directly inside `dir`, in name order.
pub fn files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    Ok(sorted_entries(dir)?
        .into_iter()
        .filter(|path| path.is_file())
        .collect())
}

/// The directories directly inside `dir`, in name order.
pub fn dirs_in(dir: &Path) -> Result<Vec<PathBuf>> {
    Ok(sorted_entries(dir)?
        .into_iter()
        .filter(|path| path.is_dir())
        .collect())
}

/// The file name of a path as UTF-8, empty if there is none.
pub fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|name| name.to_str()).unwrap_or("")
}

/// Copies the content of `src` into `dst`, creating `dst` and subdirectories as needed.
///
/// Existing files are overwritten. Returns the number of copied files.
pub fn copy_dir_content(src: &Path, dst: &Path) -> Result<usize> {
    fs::create_dir_all(dst).at(dst)?;

    let mut copied = 0;
    visit_dirs(src, &mut |entry| {
        let target = dst.join(&entry.relative);
        if entry.is_dir {
            fs::create_dir_all(&target).at(&target)?;
        } else {
            fs::copy(&entry.path, &target).at(&target)?;
            copied += 1;
        }
        Ok(Walk::Continue)
    })?;

    Ok(copied)
}

/// Moves a file, replacing the destination if it exists.
pub fn move_file(src: &Path, dst: &Path) -> Result<()> {
    fs::rename(src, dst).at(dst)
}

/// Replaces every occurrence of `search` in a text file.
///
/// Returns whether the file changed. Files that are not UTF-8 are left alone.
pub fn replace_in_file(path: &Path, search: &str, replace: &str) -> Result<bool> {
    let bytes = fs::read(path).at(path)?;
    let Ok(content) = String::from_utf8(bytes) else {
        return Ok(false);
    };

    if !content.contains(search) {
        return Ok(false);
    }

    fs::write(path, content.replace(search, replace)).at(path)?;
    Ok(true)
}

fn archive_name(relative: &Path) -> String {
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Zips the content of `dir` into `writer`.
///
/// The archive root is the content of `dir`, it does not contain `dir` itself.
pub fn zip_dir_content<W>(dir: &Path, writer: W, cancel: &CancelFlag) -> Result<W>
where
    W: Write + Seek,
{
    let mut archive = zip::ZipWriter::new(writer);
    let options =
        FileOptions::<()>::default().compression_method(zip::CompressionMethod::Deflated);

    visit_dirs(dir, &mut |entry| {
        cancel.check()?;

        let name = archive_name(&entry.relative);
        if entry.is_dir {
            archive.add_directory(name, options)?;
        } else {
            archive.start_file(name, options)?;
            let mut file = fs::File::open(&entry.path).at(&entry.path)?;
            std::io::copy(&mut file, &mut archive).at(&entry.path)?;
        }
        Ok(Walk::Continue)
    })?;

    Ok(archive.finish()?)
}

/// Extracts a zip archive into `dst`.
///
/// Entries whose names would escape `dst` are rejected.
pub fn extract_zip<R>(reader: R, dst: &Path, cancel: &CancelFlag) -> Result<()>
where
    R: Read + Seek,
{
    let mut archive = zip::ZipArchive::new(reader)?;
    fs::create_dir_all(dst).at(dst)?;

    for index in 0..archive.len() {
        cancel.check()?;

        let mut file = archive.by_index(index)?;
        let Some(relative) = file.enclosed_name() else {
            return Err(Error::InvalidPackage {
                reason: format!("the archive entry '{}' has a malformed path", file.name()),
            });
        };
        let target = dst.join(relative);

        if file.is_dir() {
            fs::create_dir_all(&target).at(&target)?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).at(parent)?;
        }
        let mut out = fs::File::create(&target).at(&target)?;
        std::io::copy(&mut file, &mut out).at(&target)?;
    }

    Ok(())
}
