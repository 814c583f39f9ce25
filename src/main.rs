use anyhow::Result;
use clap::Parser;
use std::collections::BTreeSet;
use std::path::Path;

use jcompat::cli::{Cli, ReportFormat};
use jcompat::config;
use jcompat::diff::{DiffOptions, compare};
use jcompat::dump;
use jcompat::error::{CheckError, EXIT_COMPATIBLE, EXIT_INCOMPATIBLE, exit_code_for};
use jcompat::ingest::{self, IngestOptions};
use jcompat::javap::Javap;
use jcompat::model::Api;
use jcompat::report::{ReportOptions, build_level_report, write_report};
use jcompat::scan;
use jcompat::xml;

fn main() {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("[jcompat] error: {err:#}");
            std::process::exit(exit_code_for(&err));
        }
    }
}

fn run(cli: &Cli) -> Result<i32> {
    let ingest_opts = config::ingest_options(cli)?;

    if cli.dump {
        return dump_mode(cli, &ingest_opts);
    }

    let old_spec = cli
        .old_input()
        .ok_or_else(|| CheckError::Access("no old version input given".to_string()))?;
    let new_spec = cli
        .new_input()
        .ok_or_else(|| CheckError::Access("no new version input given".to_string()))?;

    let old_api = load_version(cli, old_spec, cli.version1.clone(), &ingest_opts)?;
    let new_api = load_version(cli, new_spec, cli.version2.clone(), &ingest_opts)?;

    let diff_opts = DiffOptions {
        filter: ingest_opts.filter.clone(),
        quick: cli.quick,
        check_implementation: cli.check_implementation,
        class_restriction: class_restriction(cli, &ingest_opts)?,
    };
    let result = compare(&old_api, &new_api, &diff_opts);

    let report_opts = ReportOptions {
        short: cli.short,
        strict: cli.strict,
        quick: cli.quick,
        ..ReportOptions::default()
    };

    let mut all_compatible = true;
    for level in config::selected_levels(cli) {
        let report = build_level_report(&old_api, &new_api, &result, level, &report_opts);
        let path = config::report_path(
            cli,
            &old_api.library,
            &old_api.version,
            &new_api.version,
            level,
        );
        write_report(&report, &path, cli.format == ReportFormat::Json)?;
        println!(
            "{} report: {} (high: {}, medium: {}, low: {}) -> {}",
            report.level,
            report.verdict,
            report.counts.high,
            report.counts.medium,
            report.counts.low,
            path.display()
        );
        all_compatible &= report.compatible();
    }

    Ok(if all_compatible {
        EXIT_COMPATIBLE
    } else {
        EXIT_INCOMPATIBLE
    })
}

fn dump_mode(cli: &Cli, ingest_opts: &IngestOptions) -> Result<i32> {
    let input = cli
        .old_input()
        .or_else(|| cli.new_input())
        .ok_or_else(|| CheckError::Access("no input to dump".to_string()))?;
    let api = load_version(cli, input, cli.version1.clone(), ingest_opts)?;
    let path = cli
        .dump_path
        .clone()
        .unwrap_or_else(|| config::default_dump_path(&api.library, &api.version));
    dump::write_dump(&api, &path)?;
    println!(
        "dumped {} {} ({} types, {} methods) -> {}",
        api.library,
        api.version,
        api.types.iter().filter(|t| t.declared).count(),
        api.methods.len(),
        path.display()
    );
    Ok(EXIT_COMPATIBLE)
}

/// Loads one version from a dump, an XML descriptor, or archive paths.
fn load_version(
    cli: &Cli,
    spec: &str,
    label_override: Option<String>,
    ingest_opts: &IngestOptions,
) -> Result<Api> {
    let spec_path = Path::new(spec);
    if dump::is_dump_path(spec_path) {
        let mut api = dump::read_dump(spec_path)?;
        if let Some(label) = label_override {
            api.version = label;
        }
        if let Some(library) = &cli.library {
            api.library = library.clone();
        }
        return Ok(api);
    }

    let mut opts = ingest_opts.clone();
    let (archives, descriptor_version) =
        if spec_path.extension().is_some_and(|e| e == "xml") {
            let text = std::fs::read_to_string(spec_path)
                .map_err(|e| CheckError::Access(format!("{spec}: {e}")))?;
            let descriptor = xml::parse_descriptor(&text)?;
            opts.filter.skip_packages.extend(descriptor.skip_packages);
            opts.filter.keep_packages.extend(descriptor.keep_packages);
            let archives = scan::expand_input(&descriptor.archives.join(","))?;
            (archives, Some(descriptor.version).filter(|v| !v.is_empty()))
        } else {
            (scan::expand_input(spec)?, None)
        };

    let library = cli
        .library
        .clone()
        .or_else(|| library_from_archive(&archives))
        .unwrap_or_else(|| "library".to_string());
    let version = label_override
        .or(descriptor_version)
        .or_else(|| {
            archives
                .first()
                .and_then(|a| config::version_from_archive_name(a))
        })
        .unwrap_or_else(|| "unknown".to_string());

    let javap = Javap::locate(cli.javap.clone())?;
    let mut api = Api::new(&library, &version);
    ingest::ingest_version(&mut api, &archives, &javap, &opts)?;
    Ok(api)
}

fn library_from_archive(archives: &[std::path::PathBuf]) -> Option<String> {
    let stem = archives.first()?.file_stem()?.to_str()?;
    let name = match stem.rsplit_once('-') {
        Some((head, tail))
            if tail.chars().next().is_some_and(|c| c.is_ascii_digit()) =>
        {
            head
        }
        _ => stem,
    };
    Some(name.to_string())
}

/// Class-name restriction from --class-list and/or --client; both given
/// means the intersection.
fn class_restriction(cli: &Cli, ingest_opts: &IngestOptions) -> Result<Option<BTreeSet<String>>> {
    let from_list = match &cli.class_list {
        Some(path) => Some(config::read_class_list(path)?),
        None => None,
    };
    let from_client = match &cli.client {
        Some(path) => {
            let javap = Javap::locate(cli.javap.clone())?;
            let mut client_api = Api::new("client", "0");
            ingest::ingest_version(
                &mut client_api,
                std::slice::from_ref(path),
                &javap,
                ingest_opts,
            )?;
            Some(client_api.referenced_classes())
        }
        None => None,
    };

    Ok(match (from_list, from_client) {
        (Some(list), Some(client)) => Some(list.intersection(&client).cloned().collect()),
        (Some(list), None) => Some(list),
        (None, Some(client)) => Some(client),
        (None, None) => None,
    })
}
