use crate::ids::{generate_route_id, RouteDescriptor};
use crate::method::cast_http_method;
use crate::request::{OpenApiRequest, RequestValidator};
use crate::runtime_config::RuntimeConfig;
use crate::spec::OpenApiSpec;
use crate::validator::ValidationErrors;
use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use clap::{Parser, Subcommand};
use http::header::{CONTENT_TYPE, HOST};
use http::Request;
use http_body_util::Full;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Command-line interface for apiprimed
#[derive(Parser, Debug)]
#[command(name = "apiprimed")]
#[command(about = "Inspect OpenAPI operations and validate requests against them", long_about = None)]
pub struct Cli {
    /// Log level for stderr output
    #[arg(long, global = true, env = "APIPRIMED_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every operation with its route id
    Operations {
        /// Path to the OpenAPI specification file (YAML or JSON)
        #[arg(short, long)]
        spec: PathBuf,
    },
    /// Print `METHOD path` for an operation id
    Lookup {
        /// Path to the OpenAPI specification file (YAML or JSON)
        #[arg(short, long)]
        spec: PathBuf,

        #[arg(long)]
        operation_id: String,
    },
    /// Derive the route id for an operation id or a path and method
    RouteId {
        #[arg(long)]
        operation_id: Option<String>,

        /// OpenAPI path template, e.g. /greet/{lang}
        #[arg(long)]
        path: Option<String>,

        #[arg(short, long)]
        method: Option<String>,
    },
    /// Validate one request and print the casted values or the issues
    CheckRequest {
        /// Path to the OpenAPI specification file (YAML or JSON)
        #[arg(short, long)]
        spec: PathBuf,

        #[arg(short, long)]
        method: String,

        /// Absolute URL or path with query string
        #[arg(long)]
        url: String,

        #[arg(long)]
        content_type: Option<String>,

        /// File holding the request body
        #[arg(long)]
        body: Option<PathBuf>,

        /// Extra header as `name:value`, repeatable
        #[arg(long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,
    },
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected name:value, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in '{raw}'"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Execute a parsed command, writing its output to `out`.
///
/// # Errors
///
/// Returns an error if:
/// - The OpenAPI spec cannot be loaded or parsed
/// - The route cannot be identified
/// - The request cannot be built from the arguments
pub async fn run_cli(cli: Cli, out: &mut dyn Write) -> Result<ExitCode> {
    let config = RuntimeConfig::from_env();
    match cli.command {
        Commands::Operations { spec } => {
            let spec = load(&spec, &config)?;
            for op in spec.compiled().operations() {
                let descriptor = match &op.operation_id {
                    Some(id) => RouteDescriptor::operation_id(id.clone()),
                    None => RouteDescriptor::path_method(op.path.clone(), op.method),
                };
                writeln!(
                    out,
                    "{}\t{}\t{}\t{}",
                    descriptor.route_id(),
                    op.method.as_str().to_ascii_uppercase(),
                    op.path,
                    op.operation_id.as_deref().unwrap_or("-")
                )?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Lookup { spec, operation_id } => {
            let spec = load(&spec, &config)?;
            match spec.lookup_by_operation_id(&operation_id) {
                Some(info) => {
                    writeln!(out, "{info}")?;
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    eprintln!("No endpoint found with operation ID '{operation_id}'.");
                    Ok(ExitCode::from(1))
                }
            }
        }
        Commands::RouteId {
            operation_id,
            path,
            method,
        } => {
            let route_id =
                generate_route_id(operation_id.as_deref(), path.as_deref(), method.as_deref())?;
            writeln!(out, "{route_id}")?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::CheckRequest {
            spec,
            method,
            url,
            content_type,
            body,
            headers,
        } => {
            let spec = load(&spec, &config)?;
            let body = match body {
                Some(path) => Bytes::from(
                    std::fs::read(&path)
                        .with_context(|| format!("Failed to read body from {}", path.display()))?,
                ),
                None => Bytes::new(),
            };
            let req = build_request(&method, &url, content_type.as_deref(), &headers, body)?;
            let request = OpenApiRequest::from_http(req, HashMap::new(), config.max_body_bytes).await?;
            let result = RequestValidator::new(&spec).validate(&request);

            if result.is_valid() {
                let report = json!({
                    "route": result.route,
                    "parameters": {
                        "query": result.parameters.query,
                        "path": result.parameters.path,
                        "header": result.parameters.header,
                        "cookie": result.parameters.cookie,
                    },
                    "body": result.body.unwrap_or(Value::Null),
                });
                writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
                Ok(ExitCode::SUCCESS)
            } else {
                let errors = ValidationErrors::new("request", result.errors);
                writeln!(out, "{}", serde_json::to_string_pretty(&errors.to_json())?)?;
                Ok(ExitCode::from(1))
            }
        }
    }
}

fn load(path: &Path, config: &RuntimeConfig) -> Result<OpenApiSpec> {
    OpenApiSpec::from_path_with_options(path, &config.compile_options())
        .with_context(|| format!("Failed to load OpenAPI spec from {}", path.display()))
}

fn build_request(
    method: &str,
    url: &str,
    content_type: Option<&str>,
    headers: &[(String, String)],
    body: Bytes,
) -> Result<Request<Full<Bytes>>> {
    let method = cast_http_method(method)?;
    let mut builder = Request::builder().method(method.to_http()).uri(url);
    if !url.contains("://") {
        builder = builder.header(HOST, "localhost");
    }
    if let Some(content_type) = content_type {
        builder = builder.header(CONTENT_TYPE, content_type);
    }
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
        .body(Full::new(body))
        .map_err(|e| anyhow!("Invalid request arguments: {e}"))
}
