//! Serialized API dumps: a self-describing JSON payload packed into a
//! single-entry zip container.
//!
//! Compatibility is gated on major-version equality of the dump format, not
//! of the tool.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::CheckError;
use crate::intern::NameTable;
use crate::model::{Api, MethodRecord, TypeRecord};
use crate::usage::UsageTables;

pub const API_DUMP_VERSION: &str = "1.0";
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

const DUMP_ENTRY: &str = "api.dump";
pub const DUMP_SUFFIX: &str = ".api.dump.zip";

pub fn is_dump_path(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(DUMP_SUFFIX))
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiDump {
    #[serde(rename = "API_DUMP_VERSION")]
    dump_version: String,
    #[serde(rename = "TOOL_VERSION")]
    tool_version: String,
    #[serde(rename = "Library")]
    library: String,
    #[serde(rename = "Version")]
    version: String,
    #[serde(rename = "TypeNames")]
    names: NameTable,
    #[serde(rename = "TypeInfo")]
    types: Vec<TypeRecord>,
    #[serde(rename = "MethodInfo")]
    methods: BTreeMap<String, MethodRecord>,
    #[serde(rename = "UsageInfo")]
    usage: UsageTables,
}

pub fn write_dump(api: &Api, path: &Path) -> Result<()> {
    let payload = ApiDump {
        dump_version: API_DUMP_VERSION.to_string(),
        tool_version: TOOL_VERSION.to_string(),
        library: api.library.clone(),
        version: api.version.clone(),
        names: api.names.clone(),
        types: api.types.clone(),
        methods: api.methods.clone(),
        usage: api.usage.clone(),
    };
    let json = serde_json::to_vec(&payload).context("failed to serialize API dump")?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create dump directory {}", parent.display()))?;
    }
    let file = File::create(path)
        .with_context(|| format!("failed to create dump file {}", path.display()))?;
    let mut zip = zip::ZipWriter::new(file);
    zip.start_file(DUMP_ENTRY, zip::write::FileOptions::default())?;
    zip.write_all(&json)?;
    zip.finish()?;
    Ok(())
}

pub fn read_dump(path: &Path) -> Result<Api> {
    let file = File::open(path)
        .map_err(|e| CheckError::Access(format!("{}: {e}", path.display())))?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|e| CheckError::InvalidDump(format!("{}: {e}", path.display())))?;
    let mut entry = zip
        .by_name(DUMP_ENTRY)
        .map_err(|_| CheckError::InvalidDump(format!("{}: no {DUMP_ENTRY} entry", path.display())))?;
    let mut json = String::new();
    entry
        .read_to_string(&mut json)
        .map_err(|e| CheckError::InvalidDump(format!("{}: {e}", path.display())))?;

    let payload: ApiDump = serde_json::from_str(&json)
        .map_err(|e| CheckError::InvalidDump(format!("{}: {e}", path.display())))?;

    if major_of(&payload.dump_version) != major_of(API_DUMP_VERSION) {
        return Err(CheckError::DumpVersion(format!(
            "dump format {} is not compatible with expected {}",
            payload.dump_version, API_DUMP_VERSION
        ))
        .into());
    }

    Ok(Api::from_parts(
        payload.library,
        payload.version,
        payload.names,
        payload.types,
        payload.methods,
        payload.usage,
    ))
}

fn major_of(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}
