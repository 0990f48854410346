use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use shelfquery::{
    config::{Config, ConfigOverrides},
    db::Database,
    runner::{QueryRunner, RunReport},
    seed,
};

/// Run the books catalog queries against a MongoDB collection.
#[derive(Parser, Debug)]
#[command(name = "shelfquery", version)]
struct Cli {
    /// MongoDB connection string (overrides MONGODB_URI)
    #[arg(long, value_name = "URI")]
    uri: Option<String>,

    /// Database name (overrides SHELFQUERY_DATABASE)
    #[arg(long)]
    database: Option<String>,

    /// Collection name (overrides SHELFQUERY_COLLECTION)
    #[arg(long)]
    collection: Option<String>,

    /// One-based page number for the pagination query
    #[arg(long)]
    page: Option<u64>,

    /// Page size for the pagination query
    #[arg(long)]
    page_size: Option<u64>,

    /// Stop at the first failing operation
    #[arg(long)]
    fail_fast: bool,

    /// Insert the sample library before running the catalog
    #[arg(long)]
    seed: bool,

    /// How long the driver waits to find a usable server
    #[arg(long, value_name = "SECS")]
    server_selection_timeout_secs: Option<u64>,
}

impl From<Cli> for ConfigOverrides {
    fn from(cli: Cli) -> Self {
        ConfigOverrides {
            mongodb_uri: cli.uri,
            database_name: cli.database,
            collection_name: cli.collection,
            page: cli.page,
            page_size: cli.page_size,
            fail_fast: cli.fail_fast,
            seed: cli.seed,
            server_selection_timeout_secs: cli.server_selection_timeout_secs,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new("info")
            .add_directive("mongodb=warn".parse().expect("static directive"))
            .add_directive("shelfquery=info".parse().expect("static directive"))
    });

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    let config = Config::from_env().with_overrides(cli.into())?;
    let runner = QueryRunner::from_config(&config)?;

    let db = Database::connect(&config).await.map_err(|e| {
        error!("[{}] {}", e.error_code(), e);
        e
    })?;
    info!(
        "Using collection {}.{}",
        db.database_name(),
        db.collection_name()
    );

    // The connection is closed whatever the run returns.
    let result = run(&db, &runner, config.seed).await;
    db.close().await;

    let report = result?;
    println!("{}", report.summary());
    Ok(())
}

async fn run(db: &Database, runner: &QueryRunner, seed: bool) -> Result<RunReport> {
    let store = db.books();
    if seed {
        seed::seed_books(&store).await?;
    }
    Ok(runner.run(&store).await?)
}
