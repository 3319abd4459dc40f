use crate::validation::FieldSpec;
use anyhow::{Context, Result};
use axum::http::Method;
use clap::Parser;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_CONFIG_FILE: &str = "config.json";
pub const DEFAULT_STATISTICS_PATH: &str = "/statistics";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "fieldgate",
    about = "Serve configured JSON endpoints with field validation and hit statistics",
    version
)]
pub struct CliArgs {
    #[arg(
        long,
        env = "FIELDGATE_ADDR",
        value_name = "ADDR",
        default_value = DEFAULT_LISTEN_ADDR,
        value_parser = parse_listen_addr,
        help = "Listen address, e.g. 127.0.0.1:8080 or :8080"
    )]
    pub addr: SocketAddr,

    #[arg(
        long,
        env = "FIELDGATE_CONF",
        value_name = "FILE",
        default_value = DEFAULT_CONFIG_FILE,
        help = "Path to the protocol configuration file (JSON or YAML)"
    )]
    pub conf: PathBuf,

    #[arg(
        long,
        env = "FIELDGATE_STATISTICS_PATH",
        value_name = "PATH",
        default_value = DEFAULT_STATISTICS_PATH,
        help = "Route serving the statistics snapshot"
    )]
    pub statistics_path: String,
}

/// Accepts a full socket address or a bare `:port`, which binds all interfaces.
fn parse_listen_addr(raw: &str) -> Result<SocketAddr, String> {
    let candidate = if raw.starts_with(':') {
        format!("0.0.0.0{raw}")
    } else {
        raw.to_string()
    };
    candidate
        .parse()
        .map_err(|e| format!("invalid listen address '{raw}': {e}"))
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub statistics_path: String,
    pub protocols: Vec<ProtocolConfig>,
}

impl ServerConfig {
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let CliArgs {
            addr,
            conf,
            statistics_path,
        } = args;

        Ok(Self {
            listen_addr: addr,
            statistics_path,
            protocols: load_protocols(&conf)?,
        })
    }

    /// Checks that every configured route can be registered.
    pub fn validate(&self) -> Result<()> {
        validate_route_path(&self.statistics_path)
            .context("invalid statistics path")?;

        let mut seen = HashSet::new();
        seen.insert(self.statistics_path.as_str());

        for protocol in &self.protocols {
            validate_route_path(&protocol.path)?;
            anyhow::ensure!(
                seen.insert(protocol.path.as_str()),
                "path '{}' is configured more than once",
                protocol.path
            );
            anyhow::ensure!(
                Method::from_bytes(protocol.method.as_bytes()).is_ok(),
                "protocol '{}' has invalid method '{}'",
                protocol.path,
                protocol.method
            );

            let mut names = HashSet::new();
            for field in &protocol.fields {
                anyhow::ensure!(
                    names.insert(field.name.as_str()),
                    "protocol '{}' declares field '{}' more than once",
                    protocol.path,
                    field.name
                );
            }
        }

        // "/a" and "/a.request" would both claim the statistics key "/a.request"
        let paths: Vec<&str> = seen.into_iter().collect();
        for path in &paths {
            let prefix = format!("{path}.");
            if let Some(nested) = paths.iter().find(|other| other.starts_with(&prefix)) {
                anyhow::bail!("path '{nested}' collides with statistics of path '{path}'");
            }
        }

        if self.protocols.is_empty() {
            tracing::warn!("no protocols configured, only statistics will be served");
        }
        Ok(())
    }
}

/// One endpoint: route, accepted method and declared fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolConfig {
    pub path: String,
    /// Upper-cased HTTP method.
    pub method: String,
    pub fields: Vec<FieldSpec>,
}

#[derive(Debug, Default, Deserialize)]
struct ProtocolDocument {
    #[serde(default, alias = "Protocols")]
    protocols: Vec<RawProtocol>,
}

impl ProtocolDocument {
    fn into_protocols(self) -> Vec<ProtocolConfig> {
        self.protocols
            .into_iter()
            .map(|raw| ProtocolConfig {
                path: raw.path,
                method: raw.method.trim().to_ascii_uppercase(),
                fields: raw.args.into_iter().map(RawArg::into_field_spec).collect(),
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct RawProtocol {
    #[serde(alias = "Path")]
    path: String,
    #[serde(alias = "Method")]
    method: String,
    #[serde(default, alias = "Args")]
    args: Vec<RawArg>,
}

#[derive(Debug, Deserialize)]
struct RawArg {
    #[serde(alias = "Name")]
    name: String,
    #[serde(rename = "type", alias = "Type")]
    type_tag: i64,
    #[serde(default, alias = "Restrictions")]
    restrictions: Option<Map<String, Value>>,
}

impl RawArg {
    fn into_field_spec(self) -> FieldSpec {
        FieldSpec {
            name: self.name,
            type_tag: self.type_tag,
            restrictions: self.restrictions.unwrap_or_default(),
        }
    }
}

fn validate_route_path(path: &str) -> Result<()> {
    anyhow::ensure!(path.starts_with('/'), "path '{path}' must start with '/'");
    anyhow::ensure!(
        !path.contains(['{', '}', '*']) && !path.split('/').any(|s| s.starts_with(':')),
        "path '{path}' must be a literal route without captures or wildcards"
    );
    // the path prefixes dot-separated statistics keys
    anyhow::ensure!(
        !path.split('.').any(str::is_empty),
        "path '{path}' must not start or end with '.' or contain '..'"
    );
    Ok(())
}

/// Reads the protocol list from a JSON or YAML file, chosen by extension.
pub fn load_protocols(path: &Path) -> Result<Vec<ProtocolConfig>> {
    Ok(load_config_file(path)?.into_protocols())
}

fn load_config_file(path: &Path) -> Result<ProtocolDocument> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}
