#![deny(missing_docs)]

//! # Document Assembly
//!
//! Accumulates paths, operations, tags and parameters into one OpenAPI 3.0
//! document. The builder owns all cross-endpoint bookkeeping: path items
//! are created once and enriched after that, path-level parameters merge
//! by `(name, location)`, operation ids are tracked for duplicates and
//! tags deduplicate when the document is finished.

use std::collections::HashSet;

use openapiv3::{
    Contact, Info, OpenAPI, Operation, Parameter, PathItem, ReferenceOr, Server, Tag,
};

use crate::diag::Diagnostics;
use crate::metadata::ProxyMetadata;

const OPENAPI_VERSION: &str = "3.0.0";
const CONTACT_EMAIL: &str = "apigee@google.com";
const DEFAULT_VERSION: &str = "1.0.0";

/// Description used when the descriptor carries none.
pub(crate) fn default_description(proxy_name: &str) -> String {
    format!("Auto-generated OpenApi specification for API Proxy: {proxy_name}")
}

/// Accumulates one OpenAPI document across every endpoint of a bundle.
#[derive(Debug)]
pub struct SpecBuilder {
    document: OpenAPI,
    operation_ids: HashSet<String>,
}

impl SpecBuilder {
    /// Starts a document with fallback metadata and one server per hostname.
    pub fn new(proxy_name: &str, hostnames: &[String]) -> Self {
        let document = OpenAPI {
            openapi: OPENAPI_VERSION.to_string(),
            info: Info {
                title: proxy_name.to_string(),
                description: Some(default_description(proxy_name)),
                version: DEFAULT_VERSION.to_string(),
                contact: Some(Contact {
                    email: Some(CONTACT_EMAIL.to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            },
            servers: hostnames
                .iter()
                .map(|hostname| Server {
                    url: format!("https://{hostname}"),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };
        Self {
            document,
            operation_ids: HashSet::new(),
        }
    }

    /// Overlays descriptor metadata on the fallbacks set by [`SpecBuilder::new`].
    pub fn apply_metadata(&mut self, metadata: &ProxyMetadata) {
        if let Some(display_name) = &metadata.display_name {
            self.document.info.title = display_name.clone();
        }
        if let Some(description) = &metadata.description {
            self.document.info.description = Some(description.clone());
        }
        if let Some(revision) = &metadata.revision {
            self.document.info.version = format!("1.0.{revision}");
        }
    }

    fn path_item_mut(&mut self, path: &str) -> &mut PathItem {
        let slot = self
            .document
            .paths
            .paths
            .entry(path.to_string())
            .or_insert_with(|| ReferenceOr::Item(PathItem::default()));
        match slot {
            ReferenceOr::Item(item) => item,
            // The builder only ever inserts inline items.
            ReferenceOr::Reference { .. } => unreachable!("path items are always inline"),
        }
    }

    /// Registers a path, creating its item when absent, and sets its
    /// description. A later registration of the same path wins.
    pub fn register_path(&mut self, path: &str, description: String) {
        self.path_item_mut(path).description = Some(description);
    }

    /// Appends a tag. Duplicates are fine until [`SpecBuilder::finish`].
    pub fn push_tag(&mut self, name: &str) {
        self.document.tags.push(Tag {
            name: name.to_string(),
            ..Default::default()
        });
    }

    /// Merges parameters into a path item. A parameter whose
    /// `(name, location)` pair is already present is dropped, so the first
    /// contributor of a pair wins across flows and endpoints.
    pub fn merge_path_parameters(&mut self, path: &str, parameters: Vec<Parameter>) {
        if parameters.is_empty() {
            return;
        }
        let item = self.path_item_mut(path);
        for parameter in parameters {
            let already_present = item.parameters.iter().any(|existing| match existing {
                ReferenceOr::Item(present) => same_parameter(present, &parameter),
                ReferenceOr::Reference { .. } => false,
            });
            if !already_present {
                item.parameters.push(ReferenceOr::Item(parameter));
            }
        }
    }

    /// Claims the operation slot for `method` on `path`, resetting it.
    ///
    /// Methods outside the OpenAPI 3.0 verb set resolve to `None` and a
    /// diagnostic. A second claim of the same operation id records a
    /// diagnostic and replaces the earlier operation wholesale.
    pub fn operation_mut(
        &mut self,
        path: &str,
        method: &str,
        operation_id: &str,
        entry: Option<&str>,
        diagnostics: &mut Diagnostics,
    ) -> Option<&mut Operation> {
        if !is_supported_method(method) {
            diagnostics.warn(
                entry,
                format!("unsupported HTTP method '{method}' for path '{path}', operation skipped"),
            );
            return None;
        }
        if !self.operation_ids.insert(operation_id.to_string()) {
            diagnostics.warn(
                entry,
                format!("Duplicate operationId '{operation_id}' detected, operation overridden"),
            );
        }
        let slot = operation_slot(self.path_item_mut(path), method)?;
        *slot = Some(Operation::default());
        slot.as_mut()
    }

    /// Finalizes the document. Tags deduplicate by name, first occurrence
    /// kept in order.
    pub fn finish(mut self) -> OpenAPI {
        let mut seen = HashSet::new();
        self.document.tags.retain(|tag| seen.insert(tag.name.clone()));
        self.document
    }
}

fn is_supported_method(method: &str) -> bool {
    matches!(
        method,
        "get" | "put" | "post" | "delete" | "options" | "head" | "patch" | "trace"
    )
}

fn operation_slot<'a>(item: &'a mut PathItem, method: &str) -> Option<&'a mut Option<Operation>> {
    let slot = match method {
        "get" => &mut item.get,
        "put" => &mut item.put,
        "post" => &mut item.post,
        "delete" => &mut item.delete,
        "options" => &mut item.options,
        "head" => &mut item.head,
        "patch" => &mut item.patch,
        "trace" => &mut item.trace,
        _ => return None,
    };
    Some(slot)
}

/// Location string of a parameter, as serialized in its `in` field.
pub(crate) fn parameter_location(parameter: &Parameter) -> &'static str {
    match parameter {
        Parameter::Query { .. } => "query",
        Parameter::Header { .. } => "header",
        Parameter::Path { .. } => "path",
        Parameter::Cookie { .. } => "cookie",
    }
}

fn same_parameter(a: &Parameter, b: &Parameter) -> bool {
    parameter_location(a) == parameter_location(b)
        && a.parameter_data_ref().name == b.parameter_data_ref().name
}
