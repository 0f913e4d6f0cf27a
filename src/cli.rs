use crate::config::loader::ServiceConfig;
use crate::config::types::{ExecutionResponse, ExecutionStatus};
use crate::config::validator::validate_config;
use crate::exec::process::{run_with_deadline, ProcessSpec};
use crate::exec::Orchestrator;
use crate::server::Server;
use crate::utils::output::OutputLimits;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true, env = "EXECBOX_CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP execution API
    Serve {
        /// Address to bind, overriding the configured bind_addr
        #[arg(long, env = "EXECBOX_BIND")]
        bind: Option<SocketAddr>,
    },
    /// Compile and run one submission, printing the JSON result
    ExecuteCode {
        /// Programming language (cpp)
        #[arg(long, default_value = "cpp")]
        language: String,
        /// Source code as string
        #[arg(long, conflicts_with = "code_file", required_unless_present = "code_file")]
        code: Option<String>,
        /// Read source code from a file
        #[arg(long)]
        code_file: Option<PathBuf>,
        /// Input data to pass to stdin
        #[arg(long, conflicts_with = "stdin_file")]
        stdin: Option<String>,
        /// Read stdin data from a file
        #[arg(long)]
        stdin_file: Option<PathBuf>,
    },
    /// Check that the configured compiler is installed
    CheckDeps {
        /// Verbose output showing detailed version information
        #[arg(long)]
        verbose: bool,
    },
}

pub fn run() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { bind } => serve(config, bind),
        Commands::ExecuteCode {
            language,
            code,
            code_file,
            stdin,
            stdin_file,
        } => {
            let code = match (code, code_file) {
                (Some(code), _) => code,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                (None, None) => anyhow::bail!("either --code or --code-file is required"),
            };
            let input = match (stdin, stdin_file) {
                (Some(input), _) => input,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                (None, None) => String::new(),
            };
            execute_code(&config, &language, &code, &input)
        }
        Commands::CheckDeps { verbose } => check_dependencies(&config, verbose),
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<ServiceConfig> {
    let config = ServiceConfig::load(path)?;
    let validation = validate_config(&config)?;
    for warning in &validation.warnings {
        log::warn!("Config: {}", warning);
    }
    Ok(config)
}

fn build_orchestrator(config: &ServiceConfig) -> Result<Orchestrator> {
    let orchestrator = Orchestrator::new(config)?;
    match orchestrator.sweep_stale_work_areas(config.stale_workspace_max_age()) {
        Ok(0) => {}
        Ok(n) => log::info!("Removed {} stale work areas", n),
        Err(e) => log::warn!("Stale work area sweep failed: {}", e),
    }
    Ok(orchestrator)
}

fn serve(config: ServiceConfig, bind: Option<SocketAddr>) -> Result<()> {
    let addr = match bind {
        Some(addr) => addr,
        None => config
            .bind_addr
            .parse()
            .with_context(|| format!("Invalid bind address '{}'", config.bind_addr))?,
    };

    let orchestrator = build_orchestrator(&config)?;
    log::info!(
        "Work areas under {}",
        orchestrator.workspace_root().display()
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(Server::new(orchestrator).serve(addr))
}

fn execute_code(config: &ServiceConfig, language: &str, code: &str, input: &str) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;

    let (response, exit_code) = match orchestrator.submit(code, language, input) {
        Ok(result) => {
            let code = if result.status() == ExecutionStatus::Ok { 0 } else { 1 };
            (ExecutionResponse::from(&result), code)
        }
        Err(e) if e.is_rejection() => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
        Err(e) => (ExecutionResponse::failure(&e), 1),
    };

    println!("{}", serde_json::to_string_pretty(&response)?);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

fn check_dependencies(config: &ServiceConfig, verbose: bool) -> Result<()> {
    println!("🔍 Checking toolchain...");
    println!();

    let argv = vec![config.compiler.path.clone(), "--version".to_string()];
    let spec = ProcessSpec {
        argv: &argv,
        stdin: None,
        capture_stdout: true,
        workdir: None,
        deadline: Duration::from_secs(10),
    };

    let probe = run_with_deadline(&spec, &OutputLimits::default())?;
    let detail = match &probe {
        Ok(outcome) if outcome.succeeded() => {
            let text = if outcome.stdout.data.is_empty() {
                &outcome.stderr.data
            } else {
                &outcome.stdout.data
            };
            let first_line = String::from_utf8_lossy(text)
                .lines()
                .next()
                .unwrap_or("")
                .trim()
                .to_string();
            Ok(first_line)
        }
        Ok(_) => Err("FAILED".to_string()),
        Err(_) => Err("NOT FOUND".to_string()),
    };

    match detail {
        Ok(version) => {
            println!("✅ C++ - OK");
            if verbose {
                println!("  {} -> {}", config.compiler.path, version);
            }
            Ok(())
        }
        Err(reason) => {
            println!("❌ C++ - MISSING");
            if verbose {
                println!("  {} -> {}", config.compiler.path, reason);
            }
            println!();
            println!("Install a C++ toolchain (e.g. `apt-get install g++`) or set compiler.path.");
            std::process::exit(1);
        }
    }
}
