#![deny(missing_docs)]

//! # Fetch Command
//!
//! Implements the remote pipeline: management API -> revision bundle ->
//! resolver -> rendered OpenAPI document. Converts one proxy, or every
//! proxy of an organization when none is named.

use std::fs;
use std::path::PathBuf;

use apigee2oas_core::{generate_spec, Conversion};
use serde::Deserialize;

use crate::convert::read_bundle_zip;
use crate::error::{CliError, CliResult};
use crate::output::{emit, render_document, report_diagnostics, OutputFormat};

const DEFAULT_API_URL: &str = "https://apigee.googleapis.com/v1";

// Bundles are mostly XML, but resource JARs can inflate them well past the
// default body limit.
const BUNDLE_SIZE_LIMIT: u64 = 256 * 1024 * 1024;

/// Arguments for the fetch command.
#[derive(clap::Args, Debug, Clone)]
pub struct FetchArgs {
    /// Apigee organization name.
    pub org: String,

    /// Proxy to convert; every proxy of the organization when omitted.
    #[clap(long)]
    pub proxy: Option<String>,

    /// Bundle revision; the highest-numbered revision when omitted.
    #[clap(long)]
    pub revision: Option<String>,

    /// OAuth bearer token for the management API.
    #[clap(long, env = "APIGEE_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Management API base URL.
    #[clap(long, default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Output file (one proxy) or directory (whole organization); stdout
    /// when omitted.
    #[clap(short, long)]
    pub output: Option<PathBuf>,

    /// Output format.
    #[clap(long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,
}

/// One proxy listed by the management API.
#[derive(Debug, Clone, Deserialize)]
pub struct ProxySummary {
    /// Proxy name.
    pub name: String,
    /// Known revisions, as returned by the listing.
    #[serde(default)]
    pub revision: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ProxyList {
    #[serde(default)]
    proxies: Vec<ProxySummary>,
}

#[derive(Debug, Deserialize)]
struct EnvironmentGroupList {
    #[serde(rename = "environmentGroups", default)]
    environment_groups: Vec<EnvironmentGroup>,
}

#[derive(Debug, Deserialize)]
struct EnvironmentGroup {
    #[serde(default)]
    hostnames: Vec<String>,
}

/// Minimal management API client over the endpoints the converter needs.
pub struct ApigeeClient {
    base_url: String,
    token: String,
}

impl ApigeeClient {
    /// Creates a client for the given base URL and bearer token.
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> CliResult<T> {
        let mut response = ureq::get(format!("{}{}", self.base_url, path))
            .header("Authorization", format!("Bearer {}", self.token))
            .call()?;
        Ok(response.body_mut().read_json::<T>()?)
    }

    /// Lists the organization's proxies with their revisions.
    pub fn list_proxies(&self, org: &str) -> CliResult<Vec<ProxySummary>> {
        let list: ProxyList =
            self.get_json(&format!("/organizations/{org}/apis?includeRevisions=true"))?;
        Ok(list.proxies)
    }

    /// Resolves the highest-numbered revision of a proxy.
    pub fn latest_revision(&self, org: &str, proxy: &str) -> CliResult<String> {
        let revisions: Vec<String> =
            self.get_json(&format!("/organizations/{org}/apis/{proxy}/revisions"))?;
        pick_latest_revision(&revisions)
            .ok_or_else(|| CliError::General(format!("proxy '{proxy}' has no revisions")))
    }

    /// Downloads one revision bundle as ZIP bytes.
    pub fn download_bundle(&self, org: &str, proxy: &str, revision: &str) -> CliResult<Vec<u8>> {
        let mut response = ureq::get(format!(
            "{}/organizations/{org}/apis/{proxy}/revisions/{revision}",
            self.base_url
        ))
        .query("format", "bundle")
        .header("Authorization", format!("Bearer {}", self.token))
        .call()?;
        Ok(response
            .body_mut()
            .with_config()
            .limit(BUNDLE_SIZE_LIMIT)
            .read_to_vec()?)
    }

    /// Collects every hostname across the organization's environment groups.
    pub fn hostnames(&self, org: &str) -> CliResult<Vec<String>> {
        let groups: EnvironmentGroupList =
            self.get_json(&format!("/organizations/{org}/envgroups"))?;
        Ok(groups
            .environment_groups
            .into_iter()
            .flat_map(|group| group.hostnames)
            .collect())
    }
}

fn pick_latest_revision(revisions: &[String]) -> Option<String> {
    revisions
        .iter()
        .filter_map(|revision| revision.parse::<u64>().ok().map(|number| (number, revision)))
        .max_by_key(|(number, _)| *number)
        .map(|(_, revision)| revision.clone())
}

fn fetch_and_convert(
    client: &ApigeeClient,
    org: &str,
    proxy: &str,
    revision: &str,
    hostnames: &[String],
) -> CliResult<Conversion> {
    let bytes = client.download_bundle(org, proxy, revision)?;
    let archive = read_bundle_zip(&bytes)?;
    Ok(generate_spec(proxy, &archive, hostnames))
}

/// Executes the fetch command.
pub fn execute(args: &FetchArgs) -> CliResult<()> {
    let client = ApigeeClient::new(&args.api_url, &args.token);
    let hostnames = client.hostnames(&args.org)?;

    match &args.proxy {
        Some(proxy) => {
            let revision = match &args.revision {
                Some(revision) => revision.clone(),
                None => client.latest_revision(&args.org, proxy)?,
            };
            let conversion = fetch_and_convert(&client, &args.org, proxy, &revision, &hostnames)?;
            report_diagnostics(&conversion.diagnostics);
            let rendered = render_document(&conversion.document, args.format)?;
            emit(&rendered, args.output.as_deref())?;
            if let Some(path) = &args.output {
                println!("Wrote OpenAPI document for '{}' rev {} to {:?}", proxy, revision, path);
            }
            Ok(())
        }
        None => {
            let proxies = client.list_proxies(&args.org)?;
            for summary in &proxies {
                // The listing carries revisions in API order; its first entry
                // is the one converted, matching single-revision exports.
                let Some(revision) = summary.revision.first() else {
                    eprintln!("Warning: proxy '{}' has no revisions, skipped", summary.name);
                    continue;
                };
                let conversion =
                    fetch_and_convert(&client, &args.org, &summary.name, revision, &hostnames)?;
                report_diagnostics(&conversion.diagnostics);
                let rendered = render_document(&conversion.document, args.format)?;
                match &args.output {
                    Some(dir) => {
                        fs::create_dir_all(dir)?;
                        let path =
                            dir.join(format!("{}.{}", summary.name, args.format.extension()));
                        fs::write(&path, &rendered)?;
                        println!("Wrote OpenAPI document for '{}' rev {} to {:?}", summary.name, revision, path);
                    }
                    None => println!("---\n{}", rendered),
                }
            }
            Ok(())
        }
    }
}
