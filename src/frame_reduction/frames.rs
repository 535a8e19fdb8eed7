use regex::Regex;
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use super::Frame;
use crate::error::{ReduceError, Result};
use crate::file_utils::sha256_file;

static NAME_CHUNKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+|\D+").expect("static regex")
});

/// Lowercase an extension and drop any leading dot
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|e| extensions.iter().any(|allowed| *allowed == e))
}

#[derive(Debug)]
enum Chunk<'a> {
    Number(&'a str),
    Text(&'a str),
}

impl PartialEq for Chunk<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Chunk<'_> {}

impl Ord for Chunk<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Chunk::Number(a), Chunk::Number(b)) => {
                let a = a.trim_start_matches('0');
                let b = b.trim_start_matches('0');
                a.len().cmp(&b.len()).then_with(|| a.cmp(b))
            }
            (Chunk::Number(_), Chunk::Text(_)) => Ordering::Less,
            (Chunk::Text(_), Chunk::Number(_)) => Ordering::Greater,
            (Chunk::Text(a), Chunk::Text(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Chunk<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn chunks(name: &str) -> Vec<Chunk<'_>> {
    NAME_CHUNKS
        .find_iter(name)
        .map(|m| {
            let s = m.as_str();
            if s.as_bytes()[0].is_ascii_digit() {
                Chunk::Number(s)
            } else {
                Chunk::Text(s)
            }
        })
        .collect()
}

/// Order file names with digit runs compared numerically, so that
/// `10_frame_0001` follows `9_frame_0120`. Ties fall back to plain byte order.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    chunks(a).cmp(&chunks(b)).then_with(|| a.cmp(b))
}

/// List the frames of a directory in sequence order.
///
/// Only regular files whose extension is in `extensions` are returned. An
/// empty result is an error since the first frame seeds every comparison.
pub fn list_frames<P: AsRef<Path>>(dir: P, extensions: &[String]) -> Result<Vec<Frame>> {
    let dir = dir.as_ref();
    let read_dir_err = |source| ReduceError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths: Vec<(String, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_dir_err)? {
        let entry = entry.map_err(read_dir_err)?;
        let path = entry.path();
        if !path.is_file() || !has_extension(&path, extensions) {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        paths.push((name, path));
    }

    if paths.is_empty() {
        return Err(ReduceError::NoFrames {
            dir: dir.to_path_buf(),
        });
    }

    paths.sort_by(|(a, _), (b, _)| natural_cmp(a, b));

    Ok(paths
        .into_iter()
        .enumerate()
        .map(|(index, (_, path))| Frame { index, path })
        .collect())
}

/// Non-empty, ordered frames of one input directory
#[derive(Debug, Clone)]
pub struct FrameSequence {
    dir: PathBuf,
    frames: Vec<Frame>,
}

impl FrameSequence {
    /// Wrap already ordered frames, re-indexing them by position
    pub fn new<P: AsRef<Path>>(dir: P, paths: Vec<PathBuf>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if paths.is_empty() {
            return Err(ReduceError::NoFrames { dir });
        }
        let frames = paths
            .into_iter()
            .enumerate()
            .map(|(index, path)| Frame { index, path })
            .collect();
        Ok(Self { dir, frames })
    }

    /// Scan a directory with the given extensions
    pub fn scan<P: AsRef<Path>>(dir: P, extensions: &[String]) -> Result<Self> {
        let frames = list_frames(&dir, extensions)?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
            frames,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn first(&self) -> &Frame {
        &self.frames[0]
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    Copied,
    /// Destination already held identical bytes
    Unchanged,
}

/// Output directory receiving kept frames under their original names
#[derive(Debug, Clone)]
pub struct FrameSink {
    dir: PathBuf,
}

impl FrameSink {
    /// Create the directory and its parents if needed
    pub fn create<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| ReduceError::io(dir, e))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Output path of a frame, reusing its file name byte for byte
    pub fn destination(&self, frame: &Frame) -> Result<PathBuf> {
        let name = frame.path.file_name().ok_or_else(|| {
            ReduceError::io(
                &frame.path,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
            )
        })?;
        Ok(self.dir.join(name))
    }

    /// Copy a frame, skipping the write when the destination already holds the
    /// same content. A differing destination is overwritten.
    pub fn write(&self, frame: &Frame) -> Result<CopyOutcome> {
        let dest = self.destination(frame)?;

        if self.is_identical(&frame.path, &dest)? {
            return Ok(CopyOutcome::Unchanged);
        }

        fs::copy(&frame.path, &dest).map_err(|e| ReduceError::io(&dest, e))?;
        Ok(CopyOutcome::Copied)
    }

    fn is_identical(&self, src: &Path, dest: &Path) -> Result<bool> {
        let dest_meta = match fs::metadata(dest) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(ReduceError::io(dest, e)),
        };
        let src_meta = fs::metadata(src).map_err(|e| ReduceError::io(src, e))?;
        if !dest_meta.is_file() || dest_meta.len() != src_meta.len() {
            return Ok(false);
        }

        let src_hash = sha256_file(src).map_err(|e| ReduceError::io(src, e))?;
        let dest_hash = sha256_file(dest).map_err(|e| ReduceError::io(dest, e))?;
        Ok(src_hash == dest_hash)
    }
}
