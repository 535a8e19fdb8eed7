use anyhow::{Context, Result, bail};
use log::{info, warn};
use serde::Serialize;
use std::path::Path;

/// What happened to each file of a prefix-stripping pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenameReport {
    /// (old name, new name)
    pub renamed: Vec<(String, String)>,
    /// Target name was already taken
    pub skipped_existing: Vec<String>,
    /// Name has no `-` to split on
    pub skipped_no_match: Vec<String>,
}

/// Rename every `prefix-rest` file in `dir` to `rest`.
///
/// The name is split at the first `-` only. Existing targets are never
/// overwritten.
pub fn strip_label_prefix<P: AsRef<Path>>(dir: P) -> Result<RenameReport> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        bail!("{} does not exist or is not a directory", dir.display());
    }

    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()
        .context("Failed to read directory entry")?;
    entries.sort_by_key(|e| e.file_name());

    let mut report = RenameReport::default();
    for entry in entries {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();

        let rest = name
            .split_once('-')
            .map(|(_, rest)| rest.to_string())
            .filter(|rest| !rest.is_empty());
        let Some(rest) = rest else {
            report.skipped_no_match.push(name);
            continue;
        };

        let target = path.with_file_name(&rest);
        if target.exists() {
            warn!("{} already exists, skipping {}", rest, name);
            report.skipped_existing.push(name);
            continue;
        }

        std::fs::rename(&path, &target)
            .with_context(|| format!("Failed to rename {} to {}", name, rest))?;
        info!("Renamed {} -> {}", name, rest);
        report.renamed.push((name, rest));
    }

    Ok(report)
}
