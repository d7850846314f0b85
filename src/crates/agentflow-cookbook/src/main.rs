//! Cookbook CLI: list and run chapters, inspect storage selection

use clap::{Parser, Subcommand};

use agentflow_cookbook::chapters;
use agentflow_cookbook::config::AppConfig;
use agentflow_cookbook::logging::init_logging;
use agentflow_cookbook::storage::{Environment, StorageConfig, StorageManager};

#[derive(Parser)]
#[command(name = "cookbook")]
#[command(about = "Runnable chapters for the agentflow stack", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the chapters in reading order
    List,

    /// Run one chapter by name
    Run {
        /// Chapter name (see `list`)
        chapter: String,
    },

    /// Run every chapter in order
    All,

    /// Initialize storage for an environment and print its status
    StorageStatus {
        /// Target environment: development, production or testing
        #[arg(short, long, default_value = "development")]
        environment: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    match cli.command {
        Commands::List => {
            println!("chapters:");
            for (name, summary) in chapters::CHAPTERS {
                println!("  {name:<12} {summary}");
            }
        }
        Commands::Run { chapter } => {
            let config = AppConfig::from_env()?;
            chapters::run(&chapter, &config).await?;
        }
        Commands::All => {
            let config = AppConfig::from_env()?;
            chapters::run_all(&config).await?;
        }
        Commands::StorageStatus { environment } => {
            let environment = Environment::from_name(&environment);
            let manager =
                StorageManager::initialize(StorageConfig::from_env(environment)).await;
            println!("{}", serde_json::to_string_pretty(&manager.status())?);
            manager.close().await;
        }
    }

    Ok(())
}
