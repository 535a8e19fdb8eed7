use anyhow::{Context, Result};
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::sha256_file;
use crate::frame_reduction::frames::{has_extension, natural_cmp, normalize_extension};

/// Files sharing one SHA-256 digest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub digest: String,
    pub paths: Vec<PathBuf>,
}

fn collect_files(dir: &Path, extensions: &[String], out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?
    {
        let entry = entry.context("Failed to read directory entry")?;
        let path = entry.path();
        // directory symlinks are not descended, so link cycles cannot recurse
        let file_type = entry
            .file_type()
            .with_context(|| format!("Failed to stat {}", path.display()))?;
        if file_type.is_dir() {
            collect_files(&path, extensions, out)?;
        } else if (file_type.is_file() || (file_type.is_symlink() && path.is_file()))
            && has_extension(&path, extensions)
        {
            out.push(path);
        }
    }
    Ok(())
}

/// Walk `dir` recursively and group byte-identical files.
///
/// Only groups with more than one member are returned, ordered by digest;
/// paths inside a group are naturally sorted.
pub fn find_duplicates<P: AsRef<Path>>(
    dir: P,
    extensions: &[String],
) -> Result<Vec<DuplicateGroup>> {
    let dir = dir.as_ref();
    let extensions: Vec<String> = extensions.iter().map(|e| normalize_extension(e)).collect();

    let mut files = Vec::new();
    collect_files(dir, &extensions, &mut files)?;
    debug!("Hashing {} files under {}", files.len(), dir.display());

    let mut by_digest: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for path in files {
        let digest = sha256_file(&path)
            .with_context(|| format!("Failed to hash {}", path.display()))?;
        by_digest.entry(digest).or_default().push(path);
    }

    Ok(by_digest
        .into_iter()
        .filter(|(_, paths)| paths.len() > 1)
        .map(|(digest, mut paths)| {
            paths.sort_by(|a, b| natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()));
            DuplicateGroup { digest, paths }
        })
        .collect())
}
