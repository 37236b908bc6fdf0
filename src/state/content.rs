//! Content descriptors: what a single relative path should look like on disk

use crate::error::BisectError;
use crate::fileio::FileIo;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::warn;

const COMPARE_CHUNK: usize = 64 * 1024;

/// The state of one path
#[derive(Debug, Clone)]
pub enum Content {
    /// Same bytes as the file at the reference path (read at apply time)
    FileBacked(PathBuf),
    /// The path does not exist
    Missing,
    /// The path is an existing, empty directory
    EmptyDirectory,
}

impl Content {
    /// Realize this content at `target`
    pub fn apply(&self, io: &FileIo, target: &Path) -> Result<(), BisectError> {
        match self {
            Content::FileBacked(reference) => io.copy_file(reference, target),
            Content::Missing => io.remove_path(target),
            Content::EmptyDirectory => io.ensure_dir_exists(target),
        }
    }

    /// Structural equality; file-backed content compares bytes when paths differ
    pub fn equals(&self, other: &Content) -> bool {
        match (self, other) {
            (Content::FileBacked(a), Content::FileBacked(b)) => {
                if a == b {
                    return true;
                }
                match files_have_same_bytes(a, b) {
                    Ok(same) => same,
                    Err(e) => {
                        warn!(
                            left = %a.display(),
                            right = %b.display(),
                            error = %e,
                            "Could not compare files; treating them as different"
                        );
                        false
                    }
                }
            }
            (Content::Missing, Content::Missing) => true,
            (Content::EmptyDirectory, Content::EmptyDirectory) => true,
            _ => false,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Content::Missing)
    }
}

impl PartialEq for Content {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl fmt::Display for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Content::FileBacked(path) => write!(f, "{}", path.display()),
            Content::Missing => write!(f, "Empty"),
            Content::EmptyDirectory => write!(f, "[empty dir]"),
        }
    }
}

fn files_have_same_bytes(a: &Path, b: &Path) -> std::io::Result<bool> {
    let meta_a = std::fs::metadata(a)?;
    let meta_b = std::fs::metadata(b)?;
    if meta_a.len() != meta_b.len() {
        return Ok(false);
    }

    let mut reader_a = BufReader::new(File::open(a)?);
    let mut reader_b = BufReader::new(File::open(b)?);
    let mut buf_a = vec![0u8; COMPARE_CHUNK];
    let mut buf_b = vec![0u8; COMPARE_CHUNK];
    loop {
        let read = read_full(&mut reader_a, &mut buf_a)?;
        if read == 0 {
            return Ok(read_full(&mut reader_b, &mut buf_b)? == 0);
        }
        let read_b = read_full(&mut reader_b, &mut buf_b[..read])?;
        if read_b != read || buf_a[..read] != buf_b[..read] {
            return Ok(false);
        }
    }
}

fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
