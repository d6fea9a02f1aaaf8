//! Ichijiku - fig-like docker orchestration
//!
//! This is the main CLI entry point for Ichijiku.

use clap::{Parser, Subcommand};
use ichijiku::compose::parser::DEFAULT_FIG_FILES;
use ichijiku::compose::{parse_scale_arg, FigParser, Orchestrator};
use ichijiku::container::{sanitize_namespace, Container, DockerDriver, RuntimeDriver};
use ichijiku::error::{IchijikuError, Result};
use ichijiku::logs::{drain, log_channel, ColorPicker, LogMultiplexer};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// Ichijiku - fig-like docker orchestration
#[derive(Parser)]
#[command(name = "ichijiku")]
#[command(author = "Evoker Industries")]
#[command(version)]
#[command(about = "Fig-like docker orchestration", long_about = None)]
struct Cli {
    /// Specify an alternate fig file
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,

    /// Project name used to namespace containers (defaults to the directory name)
    #[arg(short, long, global = true)]
    project_name: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build or rebuild services
    Build {
        /// Service names
        services: Vec<String>,
    },

    /// Build, (re)create, start and attach to containers for a service
    Up {
        /// Detached mode: run containers in the background
        #[arg(short, long)]
        detach: bool,
        /// Show timestamps in attached logs
        #[arg(short, long)]
        timestamps: bool,
        /// Service names
        services: Vec<String>,
    },

    /// List containers
    Ps {
        /// Service names
        services: Vec<String>,
    },

    /// View output from containers
    Logs {
        /// Show timestamps
        #[arg(short, long)]
        timestamps: bool,
        /// Service names
        services: Vec<String>,
    },

    /// Set number of containers to run for a service
    Scale {
        /// SERVICE=NUM pairs
        #[arg(required = true)]
        targets: Vec<String>,
    },

    /// Start existing containers for a service
    Start {
        /// Service names
        services: Vec<String>,
    },

    /// Stop running containers without removing them
    Stop {
        /// Service names
        services: Vec<String>,
    },

    /// Force stop service containers
    Kill {
        /// Service names
        services: Vec<String>,
    },

    /// Validate and print the fig file
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = run(cli).await;
    if let Err(e) = &result {
        if e.is_config() {
            error!("Check the fig file and service names: {}", e);
        } else if e.is_parse() {
            error!("Unexpected container in runtime state: {}", e);
        }
    }
    result
}

async fn run(cli: Cli) -> Result<()> {
    let working_dir = std::env::current_dir()?;
    let fig_file = cli
        .file
        .clone()
        .or_else(|| FigParser::find_fig_file(&working_dir))
        .unwrap_or_else(|| working_dir.join(DEFAULT_FIG_FILES[0]));

    let config = FigParser::parse_file(&fig_file)?;

    if let Commands::Config = cli.command {
        for warning in FigParser::validate(&config)? {
            println!("Warning: {}", warning);
        }

        let sorted: BTreeMap<_, _> = config.iter().collect();
        let yaml = serde_yaml::to_string(&sorted)
            .map_err(|e| IchijikuError::FigParse(format!("Failed to render YAML: {}", e)))?;
        print!("{}", yaml);
        return Ok(());
    }

    let project_dir = fig_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| working_dir.clone());
    let project_name = cli.project_name.clone().unwrap_or_else(|| {
        working_dir
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("default")
            .to_string()
    });
    let namespace = sanitize_namespace(&project_name);

    let driver: Arc<dyn RuntimeDriver> = Arc::new(DockerDriver::new());
    let palette = Arc::new(ColorPicker::new());
    let mut orchestrator =
        Orchestrator::new(&namespace, config, driver.clone())?.with_working_dir(project_dir);
    debug!(
        "Project {} from {}",
        orchestrator.namespace(),
        fig_file.display()
    );

    match cli.command {
        Commands::Build { services } => {
            orchestrator.select(&services)?;
            orchestrator.build(&services).await?;
        }

        Commands::Up {
            detach,
            timestamps,
            services,
        } => {
            orchestrator.select(&services)?;
            orchestrator.reconcile().await?;
            orchestrator.up(&services).await?;

            if !detach {
                follow_logs(&orchestrator, driver, palette, &services, timestamps).await?;
            }
        }

        Commands::Ps { services } => {
            orchestrator.select(&services)?;
            orchestrator.reconcile().await?;
            print_containers(&orchestrator.containers(&services)?);
        }

        Commands::Logs {
            timestamps,
            services,
        } => {
            orchestrator.select(&services)?;
            orchestrator.reconcile().await?;
            follow_logs(&orchestrator, driver, palette, &services, timestamps).await?;
        }

        Commands::Scale { targets } => {
            let targets = targets
                .iter()
                .map(|t| parse_scale_arg(t))
                .collect::<Result<Vec<_>>>()?;
            for (name, _) in &targets {
                orchestrator.service(name)?;
            }

            orchestrator.reconcile().await?;
            orchestrator.scale_all(&targets).await?;
        }

        Commands::Start { services } => {
            orchestrator.select(&services)?;
            orchestrator.reconcile().await?;
            orchestrator.start(&services).await?;
        }

        Commands::Stop { services } => {
            orchestrator.select(&services)?;
            orchestrator.reconcile().await?;
            orchestrator.stop(&services).await?;
        }

        Commands::Kill { services } => {
            orchestrator.select(&services)?;
            orchestrator.reconcile().await?;
            orchestrator.kill(&services).await?;
        }

        Commands::Config => {}
    }

    Ok(())
}

/// Multiplex logs of the selected containers onto stdout until every stream ends
async fn follow_logs(
    orchestrator: &Orchestrator,
    driver: Arc<dyn RuntimeDriver>,
    palette: Arc<ColorPicker>,
    services: &[String],
    timestamps: bool,
) -> Result<()> {
    let containers = orchestrator.containers(services)?;
    if containers.is_empty() {
        info!("No containers to attach to");
        return Ok(());
    }

    let (tx, rx) = log_channel();
    LogMultiplexer::new(driver, palette)
        .timestamps(timestamps)
        .stream_logs(&containers, &tx)
        .await?;
    drop(tx);

    drain(rx, std::io::stdout()).await?;
    Ok(())
}

fn print_containers(containers: &[&Container]) {
    println!("{:<30} {:<30} {:<25} PORTS", "NAME", "COMMAND", "STATE");
    for container in containers {
        println!(
            "{:<30} {:<30} {:<25} {}",
            container.name,
            container.command.as_deref().unwrap_or(""),
            container.status.as_deref().unwrap_or(""),
            container.ports.as_deref().unwrap_or("")
        );
    }

    let running = containers.iter().filter(|c| c.is_running()).count();
    debug!("{} of {} containers running", running, containers.len());
}
