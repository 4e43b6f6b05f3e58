#![deny(missing_docs)]

//! # Flow Resolution
//!
//! Turns one proxy-endpoint document into paths and operations. Each
//! conditional flow whose condition pins a path suffix becomes a path item
//! under the endpoint base path; a pinned verb additionally becomes an
//! operation on that path. Flows without a condition describe the base
//! path itself.

use openapiv3::{
    Operation, Parameter, ParameterData, ParameterSchemaOrContent, ReferenceOr, Response,
    Responses, Schema, SchemaData, SchemaKind, StatusCode, StringType, Type,
};

use crate::condition::{path_placeholders, FlowCondition};
use crate::diag::Diagnostics;
use crate::document::SpecBuilder;
use crate::error::{AppError, AppResult};
use crate::markup::XmlElement;
use crate::policy::{ExtractedParameter, ParameterKind, ParameterTable};

/// Resolves one proxy-endpoint document against the policy table,
/// accumulating into `builder`.
///
/// An endpoint without flows still registers its base path. A missing
/// `HTTPProxyConnection/BasePath` is an error; the caller skips the
/// endpoint and records it.
pub fn resolve_endpoint(
    builder: &mut SpecBuilder,
    root: &XmlElement,
    table: &ParameterTable,
    entry: Option<&str>,
    diagnostics: &mut Diagnostics,
) -> AppResult<()> {
    if root.name() != "ProxyEndpoint" {
        return Err(AppError::Malformed(format!(
            "expected ProxyEndpoint root, found '{}'",
            root.name()
        )));
    }
    let endpoint_name = root.attr("name").unwrap_or_default();
    let base_path = root
        .child("HTTPProxyConnection")
        .and_then(|connection| connection.child_text("BasePath"))
        .ok_or_else(|| {
            AppError::Malformed("endpoint carries no HTTPProxyConnection base path".to_string())
        })?;
    let preflow_steps = request_steps(root.child("PreFlow"));

    let flows: Vec<&XmlElement> = root
        .child("Flows")
        .map(|flows| flows.children("Flow").collect())
        .unwrap_or_default();
    if flows.is_empty() {
        // No conditional routing: the endpoint surfaces as its base path alone.
        builder.register_path(base_path, endpoint_description(endpoint_name, base_path));
        builder.push_tag(base_path);
        return Ok(());
    }
    for flow in flows {
        resolve_flow(
            builder,
            endpoint_name,
            base_path,
            flow,
            &preflow_steps,
            table,
            entry,
            diagnostics,
        );
    }
    Ok(())
}

fn resolve_flow(
    builder: &mut SpecBuilder,
    endpoint_name: &str,
    base_path: &str,
    flow: &XmlElement,
    preflow_steps: &[&XmlElement],
    table: &ParameterTable,
    entry: Option<&str>,
    diagnostics: &mut Diagnostics,
) {
    let Some(condition_text) = flow.child_text("Condition") else {
        // Default flow: enriches the base path, never an operation.
        builder.register_path(base_path, endpoint_description(endpoint_name, base_path));
        builder.push_tag(base_path);
        builder.merge_path_parameters(base_path, resolve_steps(preflow_steps, table));
        return;
    };

    let condition = FlowCondition::parse(condition_text);
    let Some(suffix) = condition.path_suffix.as_deref() else {
        // Conditions that pin no path suffix route nothing documentable.
        return;
    };

    // The registered path drops one trailing slash; descriptions keep the
    // suffix as written.
    let trimmed = suffix.strip_suffix('/').unwrap_or(suffix);
    let path = format!("{base_path}{trimmed}");
    builder.register_path(
        &path,
        endpoint_description(endpoint_name, &format!("{base_path}{suffix}")),
    );
    builder.push_tag(&path);

    let mut path_parameters: Vec<Parameter> =
        path_placeholders(suffix).into_iter().map(path_parameter).collect();
    path_parameters.extend(resolve_steps(preflow_steps, table));

    let flow_steps = request_steps(Some(flow));
    match condition.method.as_deref() {
        None => {
            // Without a pinned verb the flow's own extractions attach to the
            // path instead of an operation.
            path_parameters.extend(resolve_steps(&flow_steps, table));
        }
        Some(method) => {
            let operation_id = derive_operation_id(base_path, suffix, method);
            if let Some(operation) =
                builder.operation_mut(&path, method, &operation_id, entry, diagnostics)
            {
                populate_operation(operation, flow, &path, method, operation_id);
                let own_parameters = resolve_steps(&flow_steps, table);
                if !own_parameters.is_empty() {
                    operation.parameters =
                        own_parameters.into_iter().map(ReferenceOr::Item).collect();
                }
            }
        }
    }
    builder.merge_path_parameters(&path, path_parameters);
}

fn populate_operation(
    operation: &mut Operation,
    flow: &XmlElement,
    path: &str,
    method: &str,
    operation_id: String,
) {
    operation.summary = Some(format!(
        "Conditional Flow: {}",
        flow.attr("name").unwrap_or_default()
    ));
    operation.description = Some(
        flow.child_text("Description")
            .map(str::to_string)
            .unwrap_or_else(|| {
                format!(
                    "A definition of a {} operation on this path",
                    method.to_uppercase()
                )
            }),
    );
    operation.operation_id = Some(operation_id);
    operation.tags = vec![path.to_string()];
    operation.responses = response_stubs();
}

/// Operation id derived from base path, suffix and verb: leading slashes
/// drop, braces drop, every remaining slash becomes a dash.
fn derive_operation_id(base_path: &str, suffix: &str, method: &str) -> String {
    let base = base_path.get(1..).unwrap_or_default();
    let cleaned = suffix.get(1..).unwrap_or_default().replace(['{', '}'], "");
    format!("{base}-{cleaned}-{method}").replace('/', "-")
}

fn endpoint_description(endpoint_name: &str, path: &str) -> String {
    format!("Operations for proxy endpoint '{endpoint_name}' for path '{path}'")
}

/// `Request/Step` elements of a pre-flow or flow, coerced to a sequence.
fn request_steps(scope: Option<&XmlElement>) -> Vec<&XmlElement> {
    scope
        .and_then(|scope| scope.child("Request"))
        .map(|request| request.children("Step").collect())
        .unwrap_or_default()
}

/// Parameters contributed by the given steps: each step that names a policy
/// with a table row yields that policy's first row. Steps naming other
/// policies contribute nothing.
fn resolve_steps(steps: &[&XmlElement], table: &ParameterTable) -> Vec<Parameter> {
    let mut parameters = Vec::new();
    for step in steps {
        let Some(policy_name) = step.child_text("Name") else {
            continue;
        };
        let Some(row) = table.lookup(policy_name) else {
            continue;
        };
        parameters.push(extracted_parameter(row));
    }
    parameters
}

fn string_schema() -> Schema {
    Schema {
        schema_data: SchemaData::default(),
        schema_kind: SchemaKind::Type(Type::String(StringType::default())),
    }
}

fn path_parameter(name: &str) -> Parameter {
    Parameter::Path {
        parameter_data: ParameterData {
            name: name.to_string(),
            description: None,
            required: true,
            deprecated: None,
            format: ParameterSchemaOrContent::Schema(ReferenceOr::Item(string_schema())),
            example: None,
            examples: Default::default(),
            explode: None,
            extensions: Default::default(),
        },
        style: Default::default(),
    }
}

fn extracted_parameter(row: &ExtractedParameter) -> Parameter {
    let parameter_data = ParameterData {
        name: row.name.clone(),
        description: None,
        required: true,
        deprecated: None,
        format: ParameterSchemaOrContent::Schema(ReferenceOr::Item(string_schema())),
        example: Some(serde_json::Value::String(row.pattern.clone())),
        examples: Default::default(),
        explode: None,
        extensions: Default::default(),
    };
    match row.kind {
        ParameterKind::Header => Parameter::Header {
            parameter_data,
            style: Default::default(),
        },
        ParameterKind::Query => Parameter::Query {
            parameter_data,
            allow_reserved: false,
            style: Default::default(),
            allow_empty_value: None,
        },
    }
}

fn response_stubs() -> Responses {
    let mut responses = Responses::default();
    responses.responses.insert(
        StatusCode::Code(200),
        ReferenceOr::Item(Response {
            description: "Successful response".to_string(),
            ..Default::default()
        }),
    );
    responses.responses.insert(
        StatusCode::Range(4),
        ReferenceOr::Item(Response {
            description: "Client error responses".to_string(),
            ..Default::default()
        }),
    );
    responses.responses.insert(
        StatusCode::Range(5),
        ReferenceOr::Item(Response {
            description: "Server error responses".to_string(),
            ..Default::default()
        }),
    );
    responses
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::parse_document;
    use crate::policy::extract_parameters;
    use openapiv3::OpenAPI;
    use pretty_assertions::assert_eq;

    fn table_from(policies: &[&str]) -> ParameterTable {
        let mut table = ParameterTable::new();
        for xml in policies {
            table.extend(extract_parameters(
                &parse_document(xml).expect("policy parse failed"),
            ));
        }
        table
    }

    fn resolve(xml: &str, table: &ParameterTable) -> (OpenAPI, Diagnostics) {
        let mut builder = SpecBuilder::new("orders", &[]);
        let mut diagnostics = Diagnostics::new();
        let root = parse_document(xml).expect("endpoint parse failed");
        resolve_endpoint(&mut builder, &root, table, Some("apiproxy/proxies/default.xml"), &mut diagnostics)
            .expect("endpoint rejected");
        (builder.finish(), diagnostics)
    }

    fn item<'a>(document: &'a OpenAPI, path: &str) -> &'a openapiv3::PathItem {
        match document.paths.paths.get(path) {
            Some(ReferenceOr::Item(item)) => item,
            _ => panic!("path '{path}' missing"),
        }
    }

    const CONDITIONAL_GET: &str = r#"
        <ProxyEndpoint name="default">
          <HTTPProxyConnection><BasePath>/v1/orders</BasePath></HTTPProxyConnection>
          <Flows>
            <Flow name="getOrder">
              <Condition>(proxy.pathsuffix MatchesPath "/{id}") and (request.verb = "GET")</Condition>
            </Flow>
          </Flows>
        </ProxyEndpoint>"#;

    #[test]
    fn test_conditional_flow_becomes_operation() {
        let (document, diagnostics) = resolve(CONDITIONAL_GET, &ParameterTable::new());
        assert!(diagnostics.is_empty());
        let item = item(&document, "/v1/orders/{id}");
        assert_eq!(
            item.description.as_deref(),
            Some("Operations for proxy endpoint 'default' for path '/v1/orders/{id}'")
        );
        let operation = item.get.as_ref().expect("get operation missing");
        assert_eq!(operation.operation_id.as_deref(), Some("v1-orders-id-get"));
        assert_eq!(operation.summary.as_deref(), Some("Conditional Flow: getOrder"));
        assert_eq!(
            operation.description.as_deref(),
            Some("A definition of a GET operation on this path")
        );
        assert_eq!(operation.tags, vec!["/v1/orders/{id}".to_string()]);
        assert_eq!(operation.responses.responses.len(), 3);
        assert_eq!(document.tags.len(), 1);
        assert_eq!(document.tags[0].name, "/v1/orders/{id}");
    }

    #[test]
    fn test_placeholder_becomes_path_parameter() {
        let (document, _) = resolve(CONDITIONAL_GET, &ParameterTable::new());
        let item = item(&document, "/v1/orders/{id}");
        assert_eq!(item.parameters.len(), 1);
        let parameter = match &item.parameters[0] {
            ReferenceOr::Item(Parameter::Path { parameter_data, .. }) => parameter_data,
            other => panic!("path parameter expected, got {other:?}"),
        };
        assert_eq!(parameter.name, "id");
        assert!(parameter.required);
    }

    #[test]
    fn test_trailing_slash_trimmed_in_path_not_description() {
        let xml = r#"
            <ProxyEndpoint name="default">
              <HTTPProxyConnection><BasePath>/v1</BasePath></HTTPProxyConnection>
              <Flows>
                <Flow name="list">
                  <Condition>proxy.pathsuffix MatchesPath "/orders/" and request.verb = "GET"</Condition>
                </Flow>
              </Flows>
            </ProxyEndpoint>"#;
        let (document, _) = resolve(xml, &ParameterTable::new());
        let item = item(&document, "/v1/orders");
        assert_eq!(
            item.description.as_deref(),
            Some("Operations for proxy endpoint 'default' for path '/v1/orders/'")
        );
    }

    #[test]
    fn test_flow_without_suffix_is_skipped() {
        let xml = r#"
            <ProxyEndpoint name="default">
              <HTTPProxyConnection><BasePath>/v1</BasePath></HTTPProxyConnection>
              <Flows>
                <Flow name="audit"><Condition>request.header.x-audit = "on"</Condition></Flow>
              </Flows>
            </ProxyEndpoint>"#;
        let (document, diagnostics) = resolve(xml, &ParameterTable::new());
        assert!(document.paths.paths.is_empty());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_default_flow_enriches_base_path() {
        let xml = r#"
            <ProxyEndpoint name="default">
              <HTTPProxyConnection><BasePath>/v1/orders</BasePath></HTTPProxyConnection>
              <PreFlow>
                <Request><Step><Name>ExtractTenant</Name></Step></Request>
              </PreFlow>
              <Flows>
                <Flow name="always"><Condition>   </Condition></Flow>
              </Flows>
            </ProxyEndpoint>"#;
        let table = table_from(&[
            r#"<ExtractVariables name="ExtractTenant"><Header name="X-Tenant"><Pattern>{tenant}</Pattern></Header></ExtractVariables>"#,
        ]);
        let (document, _) = resolve(xml, &table);
        let item = item(&document, "/v1/orders");
        assert!(item.get.is_none());
        assert_eq!(item.parameters.len(), 1);
        let parameter = match &item.parameters[0] {
            ReferenceOr::Item(Parameter::Header { parameter_data, .. }) => parameter_data,
            other => panic!("header parameter expected, got {other:?}"),
        };
        assert_eq!(parameter.name, "X-Tenant");
        assert_eq!(
            parameter.example,
            Some(serde_json::Value::String("{tenant}".to_string()))
        );
    }

    #[test]
    fn test_endpoint_without_flows_registers_base_path_only() {
        let xml = r#"
            <ProxyEndpoint name="passthrough">
              <HTTPProxyConnection><BasePath>/v1/health</BasePath></HTTPProxyConnection>
            </ProxyEndpoint>"#;
        let (document, diagnostics) = resolve(xml, &ParameterTable::new());
        assert!(diagnostics.is_empty());
        let item = item(&document, "/v1/health");
        assert!(item.parameters.is_empty());
        assert!(item.get.is_none());
        assert_eq!(document.tags[0].name, "/v1/health");
    }

    #[test]
    fn test_missing_base_path_is_an_error() {
        let root = parse_document("<ProxyEndpoint name=\"broken\"/>").expect("parse failed");
        let mut builder = SpecBuilder::new("orders", &[]);
        let mut diagnostics = Diagnostics::new();
        let result = resolve_endpoint(&mut builder, &root, &ParameterTable::new(), None, &mut diagnostics);
        assert!(result.is_err());
    }

    #[test]
    fn test_flow_parameters_attach_to_operation_and_preflow_to_path() {
        let xml = r#"
            <ProxyEndpoint name="default">
              <HTTPProxyConnection><BasePath>/v1/orders</BasePath></HTTPProxyConnection>
              <PreFlow>
                <Request><Step><Name>ExtractTenant</Name></Step></Request>
              </PreFlow>
              <Flows>
                <Flow name="search">
                  <Condition>proxy.pathsuffix MatchesPath "/search" and request.verb = "GET"</Condition>
                  <Request><Step><Name>ExtractQuery</Name></Step></Request>
                </Flow>
              </Flows>
            </ProxyEndpoint>"#;
        let table = table_from(&[
            r#"<ExtractVariables name="ExtractTenant"><Header name="X-Tenant"><Pattern>{tenant}</Pattern></Header></ExtractVariables>"#,
            r#"<ExtractVariables name="ExtractQuery"><QueryParam name="q"><Pattern>{q}</Pattern></QueryParam></ExtractVariables>"#,
        ]);
        let (document, _) = resolve(xml, &table);
        let item = item(&document, "/v1/orders/search");
        let path_parameter_names: Vec<_> = item
            .parameters
            .iter()
            .filter_map(|parameter| match parameter {
                ReferenceOr::Item(parameter) => {
                    Some(parameter.parameter_data_ref().name.clone())
                }
                ReferenceOr::Reference { .. } => None,
            })
            .collect();
        assert_eq!(path_parameter_names, vec!["X-Tenant".to_string()]);
        let operation = item.get.as_ref().expect("get operation missing");
        assert_eq!(operation.parameters.len(), 1);
        match &operation.parameters[0] {
            ReferenceOr::Item(Parameter::Query { parameter_data, .. }) => {
                assert_eq!(parameter_data.name, "q");
            }
            other => panic!("query parameter expected, got {other:?}"),
        }
    }

    #[test]
    fn test_step_naming_unknown_policy_contributes_nothing() {
        let xml = r#"
            <ProxyEndpoint name="default">
              <HTTPProxyConnection><BasePath>/v1</BasePath></HTTPProxyConnection>
              <Flows>
                <Flow name="get">
                  <Condition>proxy.pathsuffix MatchesPath "/a" and request.verb = "GET"</Condition>
                  <Request><Step><Name>VerifyApiKey</Name></Step></Request>
                </Flow>
              </Flows>
            </ProxyEndpoint>"#;
        let (document, diagnostics) = resolve(xml, &ParameterTable::new());
        assert!(diagnostics.is_empty());
        let item = item(&document, "/v1/a");
        assert!(item.parameters.is_empty());
        assert!(item.get.as_ref().expect("operation missing").parameters.is_empty());
    }

    #[test]
    fn test_operation_id_slash_and_brace_rewriting() {
        assert_eq!(derive_operation_id("/v1/orders", "/{id}", "get"), "v1-orders-id-get");
        assert_eq!(derive_operation_id("/v1", "/a/b", "post"), "v1-a-b-post");
        assert_eq!(derive_operation_id("/", "/x", "get"), "-x-get");
    }

    #[test]
    fn test_unsupported_verb_keeps_path_skips_operation() {
        let xml = r#"
            <ProxyEndpoint name="default">
              <HTTPProxyConnection><BasePath>/v1</BasePath></HTTPProxyConnection>
              <Flows>
                <Flow name="purge">
                  <Condition>proxy.pathsuffix MatchesPath "/cache" and request.verb = "PURGE"</Condition>
                </Flow>
              </Flows>
            </ProxyEndpoint>"#;
        let (document, diagnostics) = resolve(xml, &ParameterTable::new());
        assert_eq!(diagnostics.len(), 1);
        let item = item(&document, "/v1/cache");
        assert!(item.get.is_none() && item.post.is_none() && item.delete.is_none());
    }

    #[test]
    fn test_two_flows_same_path_report_duplicate_id() {
        let xml = r#"
            <ProxyEndpoint name="default">
              <HTTPProxyConnection><BasePath>/v1</BasePath></HTTPProxyConnection>
              <Flows>
                <Flow name="first">
                  <Condition>proxy.pathsuffix MatchesPath "/a" and request.verb = "GET"</Condition>
                </Flow>
                <Flow name="second">
                  <Condition>proxy.pathsuffix MatchesPath "/a" and request.verb = "GET"</Condition>
                </Flow>
              </Flows>
            </ProxyEndpoint>"#;
        let (document, diagnostics) = resolve(xml, &ParameterTable::new());
        assert_eq!(diagnostics.len(), 1);
        let operation = item(&document, "/v1/a").get.as_ref().expect("operation missing");
        // The later flow overrides the slot.
        assert_eq!(operation.summary.as_deref(), Some("Conditional Flow: second"));
    }
}
