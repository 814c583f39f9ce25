//! External class-file disassembler seam.
//!
//! The engine never parses class files itself; it drives the JDK `javap`
//! tool and parses its text. The `Disassembler` trait is the only boundary,
//! so tests feed canned disassembly without requiring a JDK.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::CheckError;

pub trait Disassembler {
    /// Disassembles the given class files into one concatenated text.
    fn disassemble(&self, class_files: &[PathBuf]) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct Javap {
    javap_bin: PathBuf,
}

impl Javap {
    pub fn new(javap_bin: PathBuf) -> Self {
        Self { javap_bin }
    }

    /// Resolution order: explicit path, `JCOMPAT_JAVAP`, `$JAVA_HOME/bin`,
    /// then `javap` on PATH. The candidate is probed with `-version`; a
    /// non-runnable tool is a fatal `ToolNotFound`.
    pub fn locate(explicit: Option<PathBuf>) -> Result<Self> {
        let candidates: Vec<PathBuf> = explicit
            .into_iter()
            .chain(std::env::var("JCOMPAT_JAVAP").ok().map(PathBuf::from))
            .chain(std::env::var("JAVA_HOME").ok().map(|home| {
                Path::new(&home)
                    .join("bin")
                    .join(javap_file_name())
            }))
            .chain(std::iter::once(PathBuf::from(javap_file_name())))
            .collect();

        for candidate in &candidates {
            if runs(candidate) {
                return Ok(Javap::new(candidate.clone()));
            }
        }
        Err(CheckError::ToolNotFound(format!(
            "javap (tried: {})",
            candidates
                .iter()
                .map(|c| c.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
        .into())
    }
}

fn javap_file_name() -> &'static str {
    if cfg!(windows) { "javap.exe" } else { "javap" }
}

fn runs(bin: &Path) -> bool {
    Command::new(bin)
        .arg("-version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

impl Disassembler for Javap {
    fn disassemble(&self, class_files: &[PathBuf]) -> Result<String> {
        if class_files.is_empty() {
            return Ok(String::new());
        }

        // -v carries the constant pool, descriptors, code, and the
        // LocalVariableTable; -p includes private members so access
        // narrowing is visible.
        let output = Command::new(&self.javap_bin)
            .args(["-v", "-p"])
            .args(class_files)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    anyhow::Error::from(CheckError::ToolNotFound(
                        self.javap_bin.display().to_string(),
                    ))
                } else {
                    anyhow::Error::from(e)
                }
            })
            .with_context(|| format!("failed to execute {}", self.javap_bin.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CheckError::Internal(format!(
                "disassembly failed: {}",
                stderr.trim()
            ))
            .into());
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}
