pub mod duplicates;
pub mod rename;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::frame_reduction::frames::{has_extension, normalize_extension};

pub use duplicates::{DuplicateGroup, find_duplicates};
pub use rename::{RenameReport, strip_label_prefix};

const HASH_CHUNK: usize = 8192;

/// Hex SHA-256 of a file, read in fixed-size chunks
pub fn sha256_file<P: AsRef<Path>>(path: P) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; HASH_CHUNK];

    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Count the files directly inside `dir` whose extension is one of
/// `extensions` (case-insensitive, with or without the dot)
pub fn count_files<P: AsRef<Path>>(dir: P, extensions: &[String]) -> Result<usize> {
    let dir = dir.as_ref();
    let extensions: Vec<String> = extensions.iter().map(|e| normalize_extension(e)).collect();

    let mut count = 0;
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?
    {
        let path = entry.context("Failed to read directory entry")?.path();
        if path.is_file() && has_extension(&path, &extensions) {
            count += 1;
        }
    }

    Ok(count)
}
