//! # Policy Extraction
//!
//! Reads `ExtractVariables` policy documents into a flat parameter table.
//! Each `Header` or `QueryParam` rule that names a parameter and carries a
//! match pattern becomes one table row; flows later join against the table
//! by policy name to decorate their operations.

use serde::Serialize;

use crate::markup::XmlElement;

const EXTRACT_VARIABLES: &str = "ExtractVariables";
const REQUEST_SOURCE: &str = "request";

/// Where an extracted parameter is read from on the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    /// An HTTP request header.
    Header,
    /// A query string parameter.
    Query,
}

impl ParameterKind {
    /// OpenAPI `in` value for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            ParameterKind::Header => "header",
            ParameterKind::Query => "query",
        }
    }
}

/// One request parameter declared by a parameter-extraction policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedParameter {
    /// Name of the policy that declared the rule; flow steps reference it.
    pub policy_name: String,
    /// Header or query source.
    pub kind: ParameterKind,
    /// Header or query parameter name.
    pub name: String,
    /// Match pattern; surfaces as the parameter example.
    pub pattern: String,
}

/// Flat ordered table of every extracted parameter of one bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterTable {
    rows: Vec<ExtractedParameter>,
}

impl ParameterTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends rows, keeping their order.
    pub fn extend(&mut self, rows: Vec<ExtractedParameter>) {
        self.rows.extend(rows);
    }

    /// First row declared by the given policy.
    ///
    /// A policy with several rules contributes several rows but resolves to
    /// its first one here, so a step referencing that policy yields exactly
    /// one parameter.
    pub fn lookup(&self, policy_name: &str) -> Option<&ExtractedParameter> {
        self.rows.iter().find(|row| row.policy_name == policy_name)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when no policy contributed a row.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &ExtractedParameter> {
        self.rows.iter()
    }
}

/// Reads the parameter rows declared by one policy document.
///
/// Documents that are not `ExtractVariables` policies, read a source other
/// than the request, or lack a `name` attribute contribute nothing. A
/// missing `Source` element means the policy reads the request.
pub fn extract_parameters(policy: &XmlElement) -> Vec<ExtractedParameter> {
    let mut rows = Vec::new();
    if policy.name() != EXTRACT_VARIABLES {
        return rows;
    }
    if let Some(source) = policy.child_text("Source") {
        if source != REQUEST_SOURCE {
            return rows;
        }
    }
    let Some(policy_name) = policy.attr("name") else {
        return rows;
    };
    for rule in policy.children("Header") {
        push_rule(&mut rows, policy_name, ParameterKind::Header, rule);
    }
    for rule in policy.children("QueryParam") {
        push_rule(&mut rows, policy_name, ParameterKind::Query, rule);
    }
    rows
}

fn push_rule(
    rows: &mut Vec<ExtractedParameter>,
    policy_name: &str,
    kind: ParameterKind,
    rule: &XmlElement,
) {
    // Rules without a name or a non-blank pattern declare nothing usable.
    let (Some(name), Some(pattern)) = (rule.attr("name"), rule.child_text("Pattern")) else {
        return;
    };
    rows.push(ExtractedParameter {
        policy_name: policy_name.to_string(),
        kind,
        name: name.to_string(),
        pattern: pattern.to_string(),
    });
}
