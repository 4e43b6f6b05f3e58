#![deny(missing_docs)]

//! # Convert Command
//!
//! Implements the local pipeline: bundle (ZIP or exploded directory) ->
//! entry list -> resolver -> rendered OpenAPI document.

use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use apigee2oas_core::{generate_spec, ArchiveEntry, ProxyArchive};
use walkdir::WalkDir;

use crate::error::{CliError, CliResult};
use crate::output::{emit, render_document, report_diagnostics, OutputFormat};

/// Arguments for the convert command.
#[derive(clap::Args, Debug, Clone)]
pub struct ConvertArgs {
    /// Path to the proxy bundle: a ZIP file, the directory containing
    /// `apiproxy/`, or the `apiproxy/` directory itself.
    pub bundle: PathBuf,

    /// Proxy name; inferred from the bundle descriptor when omitted.
    #[clap(long)]
    pub name: Option<String>,

    /// Hostname for the `servers` section; repeatable.
    #[clap(long = "hostname")]
    pub hostnames: Vec<String>,

    /// Output file; stdout when omitted.
    #[clap(short, long)]
    pub output: Option<PathBuf>,

    /// Output format.
    #[clap(long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,
}

/// Executes a local conversion.
pub fn execute(args: &ConvertArgs) -> CliResult<()> {
    let archive = read_bundle(&args.bundle)?;
    let proxy_name = match &args.name {
        Some(name) => name.clone(),
        None => archive
            .infer_proxy_name()
            .map(str::to_string)
            .ok_or_else(|| {
                CliError::General(format!(
                    "cannot infer the proxy name from {:?}, pass --name",
                    args.bundle
                ))
            })?,
    };

    let conversion = generate_spec(&proxy_name, &archive, &args.hostnames);
    report_diagnostics(&conversion.diagnostics);

    let rendered = render_document(&conversion.document, args.format)?;
    emit(&rendered, args.output.as_deref())?;
    if let Some(path) = &args.output {
        println!("Wrote OpenAPI document for '{}' to {:?}", proxy_name, path);
    }
    Ok(())
}

/// Reads a bundle from a ZIP file or an exploded directory.
pub fn read_bundle(path: &Path) -> CliResult<ProxyArchive> {
    if path.is_dir() {
        read_bundle_dir(path)
    } else {
        let bytes = fs::read(path)?;
        read_bundle_zip(&bytes)
    }
}

/// Opens ZIP bytes and collects the text entries.
pub fn read_bundle_zip(bytes: &[u8]) -> CliResult<ProxyArchive> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut entries = Vec::new();
    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        if file.is_dir() {
            continue;
        }
        let name = file.name().to_string();
        let mut text = String::new();
        // Binary resources (JARs, images) are legal bundle members; the
        // resolver only reads XML, so non-text entries drop here.
        if file.read_to_string(&mut text).is_err() {
            continue;
        }
        entries.push(ArchiveEntry::new(name, text));
    }
    Ok(ProxyArchive::new(entries))
}

/// Walks an exploded bundle and collects entries relative to the directory
/// that contains `apiproxy/`, `/`-separated like ZIP entry names.
fn read_bundle_dir(dir: &Path) -> CliResult<ProxyArchive> {
    let root = if dir.join("apiproxy").is_dir() {
        dir.to_path_buf()
    } else if dir.file_name().is_some_and(|name| name == "apiproxy") {
        dir.parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    } else {
        return Err(CliError::General(format!(
            "{:?} does not contain an apiproxy/ directory",
            dir
        )));
    };

    let mut entries = Vec::new();
    let walker = WalkDir::new(root.join("apiproxy")).sort_by_file_name();
    for entry in walker.into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(&root) else {
            continue;
        };
        let name = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let Ok(text) = fs::read_to_string(entry.path()) else {
            continue;
        };
        entries.push(ArchiveEntry::new(name, text));
    }
    Ok(ProxyArchive::new(entries))
}
