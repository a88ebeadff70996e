//! fragdeploy - Entry Point
//!
//! Serves the deployment engine over HTTP, or runs a single deployment
//! request from a JSON file.

use std::collections::HashMap;
use std::env;
use std::process::ExitCode;

use colored::Colorize;
use fragdeploy::app::options::AppOptions;
use fragdeploy::app::run::run;
use fragdeploy::deploy::{artifacts, validator, DeploymentEngine};
use fragdeploy::errors::EngineError;
use fragdeploy::filesys::dir::Dir;
use fragdeploy::filesys::file::File;
use fragdeploy::logs::{init_logging, LogLevel};
use fragdeploy::models::{DeployRequest, DeploymentResult};
use fragdeploy::providers::Credentials;
use fragdeploy::storage::settings::{Settings, DEFAULT_SETTINGS_FILE};
use fragdeploy::utils::version_info;

use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to encode version info: {e}"),
        }
        return ExitCode::SUCCESS;
    }

    // Retrieve the settings file
    let settings_path = cli_args
        .get("settings")
        .cloned()
        .unwrap_or_else(|| DEFAULT_SETTINGS_FILE.to_string());
    let settings = match Settings::load(&File::new(&settings_path)).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{} {}", "Unable to read settings file:".red(), e);
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    let mut log_options = settings.log_options();
    if let Some(level) = cli_args.get("log-level") {
        match level.parse::<LogLevel>() {
            Ok(level) => log_options.log_level = level,
            Err(e) => eprintln!("{}", e.yellow()),
        }
    }
    if let Err(e) = init_logging(log_options) {
        println!("Failed to initialize logging: {e}");
    }

    let options = AppOptions {
        engine: settings.engine_options(),
        server: settings.server_options(),
    };
    let credentials = Credentials::from_env();

    // Write the generated build files without deploying
    if let Some(request_path) = cli_args.get("emit") {
        let out = cli_args.get("out").cloned().unwrap_or_else(|| "build".to_string());
        return match emit(request_path, &out, &options, &credentials).await {
            Ok(count) => {
                println!("{} {} files written to {}", "✔".green(), count, out);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{} {}", "✘".red(), e);
                ExitCode::FAILURE
            }
        };
    }

    // Run a single deployment
    if let Some(request_path) = cli_args.get("deploy") {
        return match deploy_once(request_path, &options, &credentials).await {
            Ok(result) => report(&result),
            Err(e) => {
                eprintln!("{} {}", "✘".red(), e);
                ExitCode::FAILURE
            }
        };
    }

    // Serve the engine
    info!("Running fragdeploy with options: {:?}", options);
    let result = run(version.version, options, credentials, await_shutdown_signal()).await;
    if let Err(e) = result {
        error!("Failed to run fragdeploy: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn read_request(path: &str) -> Result<DeployRequest, EngineError> {
    File::new(path).read_json().await
}

async fn deploy_once(
    request_path: &str,
    options: &AppOptions,
    credentials: &Credentials,
) -> Result<DeploymentResult, EngineError> {
    let request = read_request(request_path).await?;
    let engine = DeploymentEngine::from_options(&options.engine, credentials)?;
    Ok(engine.deploy_fragment(&request.fragment, &request.config).await)
}

async fn emit(
    request_path: &str,
    out: &str,
    options: &AppOptions,
    credentials: &Credentials,
) -> Result<usize, EngineError> {
    let request = read_request(request_path).await?;
    let engine = DeploymentEngine::from_options(&options.engine, credentials)?;
    let provider = validator::validate(&request.fragment, &request.config, engine.catalog())?;

    let set = artifacts::generate(&request.fragment, &request.config, provider);
    set.write_to(&Dir::new(out)).await?;
    Ok(set.len())
}

fn report(result: &DeploymentResult) -> ExitCode {
    match serde_json::to_string_pretty(result) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode deployment result: {e}"),
    }

    if result.success {
        println!(
            "{} Deployed {} to {}",
            "✔".green(),
            result.deployment_id,
            result.url.as_deref().unwrap_or("-").bold()
        );
        ExitCode::SUCCESS
    } else {
        eprintln!(
            "{} Deployment {} failed: {}",
            "✘".red(),
            result.deployment_id,
            result.error.as_deref().unwrap_or("unknown error")
        );
        ExitCode::FAILURE
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
                _ => {
                    error!("Unable to install signal handlers, waiting for Ctrl+C only");
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
        }
        info!("Ctrl+C received, shutting down...");
    }
}
