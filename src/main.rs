use apiprimed::cli::{run_cli, Cli};
use apiprimed::logging::{init_logging_with_config, LogConfig};
use clap::Parser;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_config = LogConfig {
        log_level: cli.log_level.clone(),
        ..LogConfig::from_env()
    };
    if let Err(err) = init_logging_with_config(&log_config) {
        eprintln!("warning: {err:#}");
    }

    match run_cli(cli, &mut std::io::stdout()).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
