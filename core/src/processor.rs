#![deny(missing_docs)]

//! # Bundle Processing
//!
//! Drives one bundle through the resolver: descriptor first, then every
//! policy into the parameter table, then every proxy endpoint against that
//! table. The conversion as a whole never fails; units that cannot be
//! interpreted are skipped and recorded as diagnostics.

use openapiv3::OpenAPI;

use crate::bundle::ProxyArchive;
use crate::diag::Diagnostics;
use crate::document::SpecBuilder;
use crate::endpoint::resolve_endpoint;
use crate::markup::parse_document;
use crate::metadata::ProxyMetadata;
use crate::policy::{extract_parameters, ParameterTable};

/// Outcome of one bundle conversion: the assembled document plus every
/// finding recorded along the way.
#[derive(Debug)]
pub struct Conversion {
    /// The assembled OpenAPI 3.0 document.
    pub document: OpenAPI,
    /// Everything that was skipped or overridden.
    pub diagnostics: Diagnostics,
}

/// Converts one proxy bundle into an OpenAPI 3.0 document.
///
/// `hostnames` become the document's servers. Re-running over the same
/// archive yields an identical document.
pub fn generate_spec(proxy_name: &str, archive: &ProxyArchive, hostnames: &[String]) -> Conversion {
    let mut diagnostics = Diagnostics::new();
    let mut builder = SpecBuilder::new(proxy_name, hostnames);

    let descriptor_entry = format!("apiproxy/{proxy_name}.xml");
    match archive.descriptor(proxy_name) {
        Some(text) => {
            let metadata =
                parse_document(text).and_then(|root| ProxyMetadata::from_markup(&root));
            match metadata {
                Ok(metadata) => builder.apply_metadata(&metadata),
                Err(error) => diagnostics.warn(
                    Some(descriptor_entry.as_str()),
                    format!("descriptor skipped: {error}"),
                ),
            }
        }
        None => diagnostics.warn(Some(descriptor_entry.as_str()), "descriptor entry not found"),
    }

    let mut table = ParameterTable::new();
    for (entry, text) in archive.policies() {
        match parse_document(text) {
            Ok(root) => table.extend(extract_parameters(&root)),
            Err(error) => diagnostics.warn(Some(entry), format!("policy skipped: {error}")),
        }
    }

    for (entry, text) in archive.proxy_endpoints() {
        let resolved = parse_document(text).and_then(|root| {
            resolve_endpoint(&mut builder, &root, &table, Some(entry), &mut diagnostics)
        });
        if let Err(error) = resolved {
            diagnostics.warn(Some(entry), format!("endpoint skipped: {error}"));
        }
    }

    Conversion {
        document: builder.finish(),
        diagnostics,
    }
}
