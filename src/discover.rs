use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::audio::is_supported_extension;
use crate::cli::{Input, InputKind};

/// Supported audio files directly inside `dir`, sorted by name.
pub fn list_audio_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("{}: Failed to read directory", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("{}: Failed to read directory", dir.display()))?;
        let path = entry.path();
        if !entry.file_type()?.is_file() {
            continue;
        }
        if is_supported_extension(&path) {
            files.push(path);
        } else {
            log::debug!("Skipping {}", path.display());
        }
    }
    files.sort();
    Ok(files)
}

/// A file argument as-is, or every supported file of a directory argument.
pub fn expand(input: &Input) -> Result<Vec<PathBuf>> {
    let path = input.path.as_path();
    let is_dir = path.is_dir();
    match input.kind {
        InputKind::File if is_dir => anyhow::bail!("{}: Expected a file, found a directory", path.display()),
        InputKind::Dir if !is_dir => anyhow::bail!("{}: Invalid directory path", path.display()),
        _ => {}
    }

    if !is_dir {
        return Ok(vec![path.to_path_buf()]);
    }
    let files = list_audio_files(path)?;
    if files.is_empty() {
        anyhow::bail!("{}: No .wav or .mp3 files found", path.display());
    }
    log::info!("Found {} audio files in {}", files.len(), path.display());
    Ok(files)
}
