//! Input expansion: turns each old/new input specification into the list of
//! class archives to ingest.

use anyhow::Result;
use ignore::WalkBuilder;
use rayon::prelude::*;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use crate::error::CheckError;

const ARCHIVE_EXTENSIONS: [&str; 4] = ["jar", "war", "ear", "zip"];

pub fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| ARCHIVE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// Expands one input specification: a single archive, a directory containing
/// archives, or a comma-separated list of either.
pub fn expand_input(spec: &str) -> Result<Vec<PathBuf>> {
    let mut archives = Vec::new();
    for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let path = PathBuf::from(part);
        if path.is_dir() {
            archives.extend(scan_archives(&path)?);
        } else if path.is_file() && is_archive(&path) {
            archives.push(path);
        } else {
            return Err(CheckError::Access(format!(
                "not an archive or directory: {part}"
            ))
            .into());
        }
    }
    archives.sort();
    archives.dedup();
    if archives.is_empty() {
        return Err(CheckError::Access(format!("no archives found in: {spec}")).into());
    }
    Ok(archives)
}

/// Recursively collects archive files under `base_path`.
pub fn scan_archives(base_path: &Path) -> Result<Vec<PathBuf>> {
    let (tx, rx) = mpsc::channel();

    let walker = WalkBuilder::new(base_path)
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .build_parallel();

    walker.run(|| {
        let tx = tx.clone();
        Box::new(move |entry| {
            if let Ok(entry) = entry {
                let path = entry.path();
                if is_archive(path) {
                    let _ = tx.send(path.to_path_buf());
                }
            }
            ignore::WalkState::Continue
        })
    });

    drop(tx);
    let mut archives: Vec<PathBuf> = rx.iter().collect();
    archives.sort();
    Ok(archives)
}

/// Counts `.class` entries per archive, in parallel. Used to warn about
/// archives that contribute nothing before ingestion starts.
pub fn class_entry_counts(archives: &[PathBuf]) -> Vec<(PathBuf, usize)> {
    archives
        .par_iter()
        .map(|path| {
            let count = count_class_entries(path).unwrap_or(0);
            (path.clone(), count)
        })
        .collect()
}

fn count_class_entries(path: &Path) -> Result<usize> {
    let file = std::fs::File::open(path)?;
    // SAFETY: The file is opened read-only and the mmap is dropped before
    // the file handle.
    let mmap = unsafe { memmap2::Mmap::map(&file)? };
    let mut archive = zip::ZipArchive::new(Cursor::new(&mmap[..]))?;
    let mut count = 0usize;
    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i)?;
        if entry.name().ends_with(".class") {
            count += 1;
        }
    }
    Ok(count)
}
