//! Archive ingestor: walks class archives, applies the package filter rules,
//! extracts kept class files into scratch directories, and hands them to the
//! disassembler in command-line-sized batches.

use anyhow::{Context, Result};
use memmap2::Mmap;
use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

use crate::disasm::{self, ParseOptions};
use crate::error::CheckError;
use crate::javap::Disassembler;
use crate::model::Api;
use crate::scan;

/// Packages treated as implementation detail unless explicitly kept.
const INTERNAL_PREFIXES: [&str; 5] = ["com.oracle", "com.sun", "COM.rsa", "sun", "sunw"];
const INTERNAL_SEGMENTS: [&str; 3] = ["internal", "impl", "examples"];

/// Command-line length budget for one disassembler invocation.
#[cfg(windows)]
const MAX_COMMAND_LEN: usize = 30_000;
#[cfg(not(windows))]
const MAX_COMMAND_LEN: usize = 120_000;

#[derive(Debug, Clone, Default)]
pub struct PackageFilter {
    pub keep_internal: bool,
    /// Blacklist of package prefixes.
    pub skip_packages: Vec<String>,
    /// Whitelist of package prefixes; empty means everything.
    pub keep_packages: Vec<String>,
}

impl PackageFilter {
    /// Full filter pipeline over an archive entry such as
    /// `org/example/Foo.class`.
    pub fn keeps_entry(&self, entry_name: &str) -> bool {
        let Some(stripped) = entry_name.strip_suffix(".class") else {
            return false;
        };
        let components: Vec<&str> = stripped.split('/').collect();
        let Some((simple, package_parts)) = components.split_last() else {
            return false;
        };

        // Anonymous and local classes are never API.
        if has_dollar_digit(simple) {
            return false;
        }
        // Embedded version directories (a path component with a dot).
        if package_parts.iter().any(|c| c.contains('.')) {
            return false;
        }
        self.keeps_package(&package_parts.join("."))
    }

    /// Implicit-internal and user skip/keep rules; also applied by the
    /// differ to referenced packages.
    pub fn keeps_package(&self, package: &str) -> bool {
        if !self.keep_internal {
            if INTERNAL_PREFIXES.iter().any(|p| prefix_match(package, p)) {
                return false;
            }
            if package
                .split('.')
                .any(|seg| INTERNAL_SEGMENTS.contains(&seg))
            {
                return false;
            }
        }
        if self.skip_packages.iter().any(|p| prefix_match(package, p)) {
            return false;
        }
        if !self.keep_packages.is_empty()
            && !self.keep_packages.iter().any(|p| prefix_match(package, p))
        {
            return false;
        }
        true
    }
}

fn prefix_match(package: &str, prefix: &str) -> bool {
    package == prefix || package.starts_with(&format!("{prefix}."))
}

fn has_dollar_digit(simple_name: &str) -> bool {
    let bytes = simple_name.as_bytes();
    bytes
        .windows(2)
        .any(|w| w[0] == b'$' && w[1].is_ascii_digit())
}

#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    pub filter: PackageFilter,
    pub parse: ParseOptions,
}

/// Ingests every archive of one version into `api`, then completes the
/// usage tables.
pub fn ingest_version(
    api: &mut Api,
    archives: &[PathBuf],
    disassembler: &dyn Disassembler,
    opts: &IngestOptions,
) -> Result<()> {
    for (path, count) in scan::class_entry_counts(archives) {
        if count == 0 {
            eprintln!("[jcompat] archive has no class files: {}", path.display());
        }
    }
    for archive in archives {
        ingest_archive(api, archive, disassembler, opts)
            .with_context(|| format!("failed to ingest {}", archive.display()))?;
    }
    disasm::index_foreign_invocations(api);
    Ok(())
}

fn ingest_archive(
    api: &mut Api,
    archive_path: &Path,
    disassembler: &dyn Disassembler,
    opts: &IngestOptions,
) -> Result<()> {
    let archive_name = archive_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| archive_path.display().to_string());

    let file = File::open(archive_path)
        .map_err(|e| CheckError::Access(format!("{}: {e}", archive_path.display())))?;
    // SAFETY: Opened read-only; the mmap is dropped before the file handle.
    let mmap = unsafe { Mmap::map(&file) }
        .map_err(|e| CheckError::Access(format!("mmap {}: {e}", archive_path.display())))?;
    let mut zip = ZipArchive::new(Cursor::new(&mmap[..]))
        .map_err(|e| CheckError::Access(format!("{}: {e}", archive_path.display())))?;

    let mut kept = Vec::new();
    let mut nested = Vec::new();
    for i in 0..zip.len() {
        let entry = zip.by_index_raw(i)?;
        let name = entry.name().to_string();
        if name.ends_with('/') {
            continue;
        }
        if name.ends_with(".class") {
            if opts.filter.keeps_entry(&name) {
                kept.push(name);
            }
        } else if scan::is_archive(Path::new(&name)) {
            nested.push(name);
        }
    }

    // Nested archives are extracted whole and ingested recursively.
    for entry_name in &nested {
        let scratch = ScratchDir::new("nested")?;
        let target = scratch.path().join(sanitized(entry_name)?);
        extract_entry(&mut zip, entry_name, &target)?;
        ingest_archive(api, &target, disassembler, opts)?;
    }

    if kept.is_empty() {
        return Ok(());
    }

    for chunk in chunk_by_command_len(&kept, MAX_COMMAND_LEN) {
        let scratch = ScratchDir::new("batch")?;
        let mut paths = Vec::with_capacity(chunk.len());
        for entry_name in chunk {
            let target = scratch.path().join(sanitized(entry_name)?);
            extract_entry(&mut zip, entry_name, &target)?;
            paths.push(target);
        }
        let text = disassembler.disassemble(&paths)?;
        disasm::parse_disassembly(api, &archive_name, &text, opts.parse)?;
    }
    Ok(())
}

fn sanitized(entry_name: &str) -> Result<PathBuf> {
    let path = Path::new(entry_name);
    if path
        .components()
        .any(|c| !matches!(c, std::path::Component::Normal(_)))
    {
        return Err(CheckError::Access(format!("unsafe archive entry: {entry_name}")).into());
    }
    Ok(path.to_path_buf())
}

fn extract_entry(
    zip: &mut ZipArchive<Cursor<&[u8]>>,
    entry_name: &str,
    target: &Path,
) -> Result<()> {
    let mut entry = zip
        .by_name(entry_name)
        .with_context(|| format!("missing archive entry {entry_name}"))?;
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut out = File::create(target)
        .with_context(|| format!("failed to extract to {}", target.display()))?;
    std::io::copy(&mut entry, &mut out)
        .with_context(|| format!("failed to extract {entry_name}"))?;
    Ok(())
}

/// Splits entry names into batches whose joined path length stays under the
/// platform budget.
fn chunk_by_command_len(entries: &[String], budget: usize) -> Vec<&[String]> {
    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut used = 0usize;
    for (i, entry) in entries.iter().enumerate() {
        let cost = entry.len() + 64;
        if used + cost > budget && i > start {
            chunks.push(&entries[start..i]);
            start = i;
            used = 0;
        }
        used += cost;
    }
    if start < entries.len() {
        chunks.push(&entries[start..]);
    }
    chunks
}

/// Scratch directory scoped to one disassembly batch; removed on every exit
/// path.
struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    fn new(tag: &str) -> Result<Self> {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "jcompat_{}_{}_{}",
            std::process::id(),
            nanos,
            tag
        ));
        std::fs::create_dir_all(&path)
            .with_context(|| format!("failed to create scratch dir {}", path.display()))?;
        Ok(ScratchDir { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}
