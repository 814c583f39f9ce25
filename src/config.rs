//! Option resolution: package lists, class restrictions, version labels,
//! and output paths.

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::cli::{Cli, ReportFormat};
use crate::disasm::ParseOptions;
use crate::ingest::{IngestOptions, PackageFilter};
use crate::problems::Level;

pub fn ingest_options(cli: &Cli) -> Result<IngestOptions> {
    let mut parse = if cli.quick {
        ParseOptions::quick()
    } else {
        ParseOptions::default()
    };
    parse.implementation = cli.check_implementation;

    Ok(IngestOptions {
        filter: PackageFilter {
            keep_internal: cli.keep_internal,
            skip_packages: read_package_list(cli.skip_packages.as_deref())?,
            keep_packages: read_package_list(cli.keep_packages.as_deref())?,
        },
        parse,
    })
}

fn read_package_list(path: Option<&Path>) -> Result<Vec<String>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read package list {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

pub fn read_class_list(path: &Path) -> Result<BTreeSet<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read class list {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Derives a version label from an archive name such as `widget-2.1.3.jar`.
pub fn version_from_archive_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let (_, tail) = stem.rsplit_once('-')?;
    let looks_like_version = tail
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit())
        && tail.chars().all(|c| c.is_ascii_digit() || c == '.');
    if looks_like_version {
        Some(tail.to_string())
    } else {
        None
    }
}

pub fn default_dump_path(library: &str, version: &str) -> PathBuf {
    PathBuf::from(format!("{library}-{version}{}", crate::dump::DUMP_SUFFIX))
}

pub fn report_path(cli: &Cli, library: &str, v1: &str, v2: &str, level: Level) -> PathBuf {
    let explicit = match level {
        Level::Binary => cli.bin_report_path.clone(),
        Level::Source => cli.src_report_path.clone(),
    };
    if let Some(path) = explicit {
        return path;
    }
    // --report-path only applies when a single report is selected.
    if cli.binary != cli.source
        && let Some(path) = cli.report_path.clone()
    {
        return path;
    }
    let extension = match cli.format {
        ReportFormat::Json => "json",
        ReportFormat::Text => "txt",
    };
    PathBuf::from("jcompat_reports")
        .join(library)
        .join(format!("{v1}_to_{v2}"))
        .join(format!("{}.{extension}", level.as_str()))
}

/// Levels to emit: explicit flags, or both when neither is given.
pub fn selected_levels(cli: &Cli) -> Vec<Level> {
    match (cli.binary, cli.source) {
        (true, false) => vec![Level::Binary],
        (false, true) => vec![Level::Source],
        _ => vec![Level::Binary, Level::Source],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn version_is_derived_from_archive_names() {
        assert_eq!(
            version_from_archive_name(Path::new("/libs/widget-2.1.3.jar")).as_deref(),
            Some("2.1.3")
        );
        assert_eq!(
            version_from_archive_name(Path::new("widget-core-10.jar")).as_deref(),
            Some("10")
        );
        assert!(version_from_archive_name(Path::new("widget.jar")).is_none());
        assert!(version_from_archive_name(Path::new("widget-beta.jar")).is_none());
    }

    #[test]
    fn both_levels_selected_by_default() {
        let cli = Cli::parse_from(["jcompat", "a.jar", "b.jar"]);
        assert_eq!(selected_levels(&cli), vec![Level::Binary, Level::Source]);

        let cli = Cli::parse_from(["jcompat", "a.jar", "b.jar", "--source"]);
        assert_eq!(selected_levels(&cli), vec![Level::Source]);
    }

    #[test]
    fn report_path_precedence() {
        let cli = Cli::parse_from([
            "jcompat",
            "a.jar",
            "b.jar",
            "--binary",
            "--report-path",
            "out/custom.json",
        ]);
        assert_eq!(
            report_path(&cli, "widgets", "1.0", "2.0", Level::Binary),
            PathBuf::from("out/custom.json")
        );

        // With both reports selected the shared path is ignored.
        let cli = Cli::parse_from(["jcompat", "a.jar", "b.jar", "--report-path", "out/custom.json"]);
        let path = report_path(&cli, "widgets", "1.0", "2.0", Level::Source);
        assert!(path.to_string_lossy().contains("jcompat_reports"));
        assert!(path.to_string_lossy().ends_with("source.json"));

        let cli = Cli::parse_from([
            "jcompat",
            "a.jar",
            "b.jar",
            "--bin-report-path",
            "bin.json",
        ]);
        assert_eq!(
            report_path(&cli, "widgets", "1.0", "2.0", Level::Binary),
            PathBuf::from("bin.json")
        );
    }

    #[test]
    fn quick_mode_configures_the_parser() -> Result<()> {
        let cli = Cli::parse_from(["jcompat", "a.jar", "b.jar", "--quick"]);
        let opts = ingest_options(&cli)?;
        assert!(!opts.parse.parameter_names);
        assert!(!opts.parse.constant_values);
        assert!(!opts.parse.usage);

        let cli = Cli::parse_from(["jcompat", "a.jar", "b.jar", "--check-implementation"]);
        let opts = ingest_options(&cli)?;
        assert!(opts.parse.implementation);
        Ok(())
    }
}
