mod import;
mod reconcile;
mod scrape;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "costumedb")]
#[command(about = "Costume catalog import and maintenance")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Import outfits from an aggregator page or a sitemap of pages
    Import {
        /// Aggregator page URL, or a sitemap URL ending in `.xml`
        url: String,

        /// Discover products without scraping them or touching the database
        #[arg(long)]
        dry_run: bool,

        /// Process at most this many pages
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Scrape marketplace product pages and print each outcome as JSON
    Scrape {
        #[arg(required = true)]
        urls: Vec<String>,

        /// Persist successful scrapes, reusing records with the same URL
        #[arg(long)]
        save: bool,
    },
    /// Canonicalize stored product URLs and merge duplicate records
    Reconcile,
    /// Database maintenance commands
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check that the database is reachable
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("no command given; run `costumedb --help` for usage");
        return Ok(ExitCode::SUCCESS);
    };

    let config = costumedb_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let succeeded = match command {
        Commands::Import {
            url,
            dry_run,
            limit,
        } => {
            let pool = if dry_run {
                None
            } else {
                Some(connect(&config).await?)
            };
            let totals = import::run_import(pool.as_ref(), &config, &url, dry_run, limit).await?;
            totals.succeeded()
        }
        Commands::Scrape { urls, save } => {
            let pool = if save {
                Some(connect(&config).await?)
            } else {
                None
            };
            scrape::run_scrape(pool.as_ref(), &config, &urls).await?
        }
        Commands::Reconcile => {
            let pool = connect(&config).await?;
            reconcile::run_reconcile(&pool).await?
        }
        Commands::Db { command } => {
            let pool = connect(&config).await?;
            match command {
                DbCommands::Ping => {
                    costumedb_db::ping(&pool).await?;
                    println!("database ok");
                }
                DbCommands::Migrate => {
                    let applied = costumedb_db::run_migrations(&pool).await?;
                    println!("applied {applied} migrations");
                }
            }
            true
        }
    };

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn connect(config: &costumedb_core::AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = costumedb_db::PoolConfig::from_app_config(config);
    let pool = costumedb_db::connect_pool(config.require_database_url()?, pool_config).await?;
    Ok(pool)
}
