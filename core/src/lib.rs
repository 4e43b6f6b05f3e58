#![deny(missing_docs)]

//! # apigee2oas Core
//!
//! Resolver turning an Apigee API-proxy bundle into an OpenAPI 3.0 document.

/// Shared error types.
pub mod error;

/// Bundle entry model.
pub mod bundle;

/// XML normalization layer.
pub mod markup;

/// Descriptor metadata reading.
pub mod metadata;

/// Parameter-extraction policy reading.
pub mod policy;

/// Flow-condition grammar.
pub mod condition;

/// Flow-to-path resolution.
pub mod endpoint;

/// OpenAPI document assembly.
pub mod document;

/// Conversion diagnostics.
pub mod diag;

/// Bundle-to-document orchestration.
pub mod processor;

pub use openapiv3;

pub use bundle::{ArchiveEntry, ProxyArchive};
pub use condition::{path_placeholders, FlowCondition};
pub use diag::{Diagnostic, Diagnostics};
pub use error::{AppError, AppResult};
pub use markup::{parse_document, XmlElement};
pub use metadata::ProxyMetadata;
pub use policy::{extract_parameters, ExtractedParameter, ParameterKind, ParameterTable};
pub use processor::{generate_spec, Conversion};
