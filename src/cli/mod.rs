//! # CLI Module
//!
//! Command-line access to a spec: list its operations, resolve operation ids and route
//! ids, and validate a single request without running a server.
//!
//! ## Commands
//!
//! ```bash
//! apiprimed operations --spec openapi.yaml
//! apiprimed lookup --spec openapi.yaml --operation-id greetPost
//! apiprimed route-id --path '/greet/{lang}' --method post
//! apiprimed check-request --spec openapi.yaml --method post \
//!     --url 'http://127.0.0.1:8080/api/v1/greet/en?informal=true' \
//!     --content-type application/json --body greeting.json
//! ```
//!
//! `lookup` exits with status 1 when the operation id is not declared; `check-request`
//! exits with status 1 when the request is invalid and prints the issues as JSON.
//! Logs go to stderr (`--log-level` or `APIPRIMED_LOG_LEVEL`).

mod commands;


pub use commands::{run_cli, Cli, Commands};
