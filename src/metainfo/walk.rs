//! Collecting files from disk and streaming them through a [`Writer`].

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::error::MetainfoError;
use super::torrent::Metainfo;
use super::writer::Writer;

/// A file on disk and its path inside the torrent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub components: Vec<String>,
}

/// Lists the regular files under `root`, sorted by path.
///
/// A plain file yields itself, named by its file name. A directory is only
/// walked when `recursive` is set; its files are named relative to it.
/// Symbolic links are followed.
pub fn collect_files(root: &Path, recursive: bool) -> Result<Vec<SourceFile>, MetainfoError> {
    let meta = fs::metadata(root)?;
    if !meta.is_dir() {
        return Ok(vec![SourceFile {
            path: root.to_path_buf(),
            components: vec![base_name(root)],
        }]);
    }
    if !recursive {
        return Err(MetainfoError::IsDirectory(root.display().to_string()));
    }
    let mut files = Vec::new();
    walk_dir(root, &mut Vec::new(), &mut files)?;
    Ok(files)
}

fn walk_dir(
    dir: &Path,
    prefix: &mut Vec<String>,
    files: &mut Vec<SourceFile>,
) -> Result<(), MetainfoError> {
    let mut entries = fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        let meta = fs::metadata(&path)?;
        prefix.push(entry.file_name().to_string_lossy().into_owned());
        if meta.is_dir() {
            walk_dir(&path, prefix, files)?;
        } else if meta.is_file() {
            files.push(SourceFile {
                path,
                components: prefix.clone(),
            });
        } else {
            debug!(path = %path.display(), "skipping special file");
        }
        prefix.pop();
    }
    Ok(())
}

/// Streams every file through `writer`, opening a new entry for each.
/// Returns the number of bytes written.
pub fn write_files(writer: &Writer, files: &[SourceFile]) -> Result<u64, MetainfoError> {
    let mut total = 0;
    for file in files {
        writer.open(file.components.iter().cloned())?;
        total += copy_file(writer, &file.path)?;
    }
    Ok(total)
}

fn copy_file(writer: &Writer, path: &Path) -> Result<u64, MetainfoError> {
    let mut source = File::open(path)?;
    let mut sink = writer;
    let copied = io::copy(&mut source, &mut sink)?;
    debug!(path = %path.display(), bytes = copied, "hashed file");
    Ok(copied)
}

/// Builds a metainfo from paths on disk.
///
/// A single regular file produces a single-file torrent. Anything else
/// produces a multi-file torrent named after the first path.
pub fn build_from_paths(
    paths: &[PathBuf],
    recursive: bool,
    piece_length: i64,
    announce: &str,
) -> Result<Metainfo, MetainfoError> {
    let first = paths.first().ok_or(MetainfoError::NoFiles)?;
    let name = base_name(first);

    // Validate every path before hashing anything.
    let mut files = Vec::new();
    for path in paths {
        files.extend(collect_files(path, recursive)?);
    }

    let single = paths.len() == 1 && fs::metadata(first)?.is_file();
    let writer = if single {
        let writer = Writer::new_single(piece_length, name.clone())?;
        copy_file(&writer, first)?;
        writer
    } else {
        let writer = Writer::new(piece_length)?;
        write_files(&writer, &files)?;
        writer
    };

    info!(name = %name, files = files.len(), single, "hashed content");
    writer.metainfo(&name, announce)
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
