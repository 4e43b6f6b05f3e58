#![deny(missing_docs)]

//! # Output Rendering
//!
//! Serializes assembled documents and reports conversion diagnostics.
//! Documents go to a file or stdout; diagnostics always go to stderr so
//! piped output stays a clean document.

use std::fmt;
use std::fs;
use std::path::Path;

use apigee2oas_core::openapiv3::OpenAPI;
use apigee2oas_core::Diagnostics;
use clap::ValueEnum;

use crate::error::CliResult;

/// Serialization format for rendered documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// YAML document.
    Yaml,
    /// Pretty-printed JSON document.
    Json,
}

impl OutputFormat {
    /// File extension for this format.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Yaml => "yaml",
            OutputFormat::Json => "json",
        }
    }
}

/// Needed so clap can render the default value.
impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Renders a document in the requested format.
pub fn render_document(document: &OpenAPI, format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Yaml => Ok(serde_yaml::to_string(document)?),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(document)?),
    }
}

/// Prints every conversion finding as a warning on stderr.
pub fn report_diagnostics(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics.iter() {
        eprintln!("Warning: {}", diagnostic);
    }
}

/// Writes rendered output to a file, or to stdout when no path was given.
pub fn emit(rendered: &str, output: Option<&Path>) -> CliResult<()> {
    match output {
        Some(path) => fs::write(path, rendered)?,
        None => println!("{}", rendered),
    }
    Ok(())
}
