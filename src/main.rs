use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use eventreg::config::ServerConfig;
use eventreg::server::{AppState, create_router};
use eventreg::store::{DEFAULT_ADMIN_USERNAME, SqliteStore, Store};

#[derive(Parser)]
#[command(name = "eventreg")]
#[command(about = "Event registration backend", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Without a subcommand, `eventreg` serves with these options
    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and seed the default admin account
    Init {
        /// Data directory for the database and certificate files
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,
    },

    /// Start the server (the default when no subcommand is given)
    Serve(ServeArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// TOML config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind to [default: 0.0.0.0]
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to [default: 10000]
    #[arg(long, short, env = "PORT")]
    port: Option<u16>,

    /// Data directory for the database and certificate files [default: ./data]
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory holding login.html and the dashboard pages [default: ./frontend]
    #[arg(long)]
    static_dir: Option<PathBuf>,
}

impl ServeArgs {
    fn into_config(self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_file(path)?,
            None => ServerConfig::default(),
        };

        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(data_dir) = self.data_dir {
            config.data_dir = data_dir;
        }
        if let Some(static_dir) = self.static_dir {
            config.static_dir = static_dir;
        }

        Ok(config)
    }
}

fn open_store(config: &ServerConfig) -> anyhow::Result<SqliteStore> {
    fs::create_dir_all(&config.data_dir)?;
    fs::create_dir_all(config.certificates_dir())?;

    let store =
        SqliteStore::new(config.db_path())?.with_busy_timeout(config.storage_timeout());
    if store.initialize()? {
        info!("Seeded default admin account '{DEFAULT_ADMIN_USERNAME}'");
    }

    Ok(store)
}

fn run_init(data_dir: PathBuf) -> anyhow::Result<()> {
    let config = ServerConfig {
        data_dir,
        ..ServerConfig::default()
    };

    fs::create_dir_all(&config.data_dir)?;
    fs::create_dir_all(config.certificates_dir())?;

    let store = SqliteStore::new(config.db_path())?;
    let seeded = store.initialize()?;

    println!("Database ready at {}", config.db_path().display());
    if seeded {
        println!("Created admin account '{DEFAULT_ADMIN_USERNAME}'");
    } else {
        println!("Admin account already exists");
    }

    Ok(())
}

async fn run_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = args.into_config()?;
    config.validate()?;

    let store = open_store(&config)?;
    info!("Database at {}", store.db_path().display());

    if !config.static_dir.is_dir() {
        tracing::warn!(
            "Static directory {} not found; pages will return 404",
            config.static_dir.display()
        );
    }

    let state = Arc::new(AppState::new(Arc::new(store), &config));
    let removed = state.certificates.remove_stale_temp().await?;
    if removed > 0 {
        info!("Removed {removed} unfinished certificate writes");
    }

    let app = create_router(state);
    let addr = config.socket_addr()?;

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("eventreg=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init { data_dir }) => run_init(data_dir)?,
        Some(Commands::Serve(args)) => run_serve(args).await?,
        None => run_serve(cli.serve).await?,
    }

    Ok(())
}
