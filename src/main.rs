//! route-engine: inspect and exercise route tables from the command line.
//!
//! ```text
//! route-engine validate routes.toml
//! route-engine match routes.toml --method GET --host docs.example.com --path /docs
//! route-engine watch routes.toml
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use route_engine::config::watcher::{apply_updates, ConfigWatcher};
use route_engine::config::{build_router, load_config};
use route_engine::observability::logging::init_logging;
use route_engine::routing::{Request, Router, SharedRouter};

#[derive(Parser)]
#[command(name = "route-engine")]
#[command(about = "Compile, inspect and match request route tables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate a route table, then print the compiled routes
    Validate {
        config: PathBuf,
    },
    /// Resolve one request against a route table and print the result as JSON
    Match {
        config: PathBuf,

        #[arg(short, long, default_value = "GET")]
        method: String,

        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        path: String,
    },
    /// Keep a route table loaded and hot-reload it on change
    Watch {
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Validate { config } => {
            let config = load_config(&config)?;
            let _ = init_logging(&config.observability);
            let router = build_router(&config)?;
            print_routes(&router);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Match {
            config,
            method,
            host,
            path,
        } => {
            let config = load_config(&config)?;
            let _ = init_logging(&config.observability);
            let router = build_router(&config)?;

            let mut request = Request::new(&method, &path);
            if let Some(host) = host.as_deref() {
                request = request.with_hostname(host);
            }
            match router.handle(&request)? {
                Some(resolution) => {
                    println!("{}", serde_json::to_string_pretty(&resolution)?);
                    Ok(if resolution.matched {
                        ExitCode::SUCCESS
                    } else {
                        ExitCode::from(1)
                    })
                }
                None => {
                    println!("null");
                    Ok(ExitCode::from(1))
                }
            }
        }
        Commands::Watch { config: path } => {
            let config = load_config(&path)?;
            let _ = init_logging(&config.observability);
            let shared = Arc::new(SharedRouter::new(build_router(&config)?));

            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(async move {
                let (watcher, updates) = ConfigWatcher::new(&path);
                let _guard = watcher.run()?;
                let reloader = tokio::spawn(apply_updates(shared.clone(), updates));

                tokio::signal::ctrl_c().await?;
                tracing::info!("Shutdown signal received");
                reloader.abort();
                Ok::<_, Box<dyn std::error::Error>>(())
            })?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_routes(router: &Router) {
    for route in router.routes() {
        let methods = route
            .methods()
            .map(|m| m.to_string())
            .unwrap_or_else(|| "*".to_string());
        let host = route.hostname().map(|h| h.raw()).unwrap_or("*");
        println!(
            "{:>4}  {:<12} {:<24} {:<40} {}",
            route.id().0,
            methods,
            host,
            route.pattern().raw(),
            route.name().unwrap_or("-"),
        );
    }
}
