use blog_importer::cli::{self, ImportArgs};
use blog_importer::config::Config;
use blog_importer::registry::EngineRegistry;
use blog_importer::repository::LibsqlRepository;
use blog_importer::server::{self, AppState};
use blog_importer::{logging, metrics};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "blog-importer")]
#[command(about = "Import blog posts from external content sources")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import posts from a source into the blog database
    Import(ImportArgs),
    /// Serve the import HTTP API
    Serve {
        /// Port to listen on (overrides config and PORT)
        #[arg(long)]
        port: Option<u16>,
    },
}

async fn serve(config: Config, port: Option<u16>) -> anyhow::Result<()> {
    let database_url = config.database_url()?;
    let repository =
        LibsqlRepository::connect(database_url, config.database.auth_token.as_deref()).await?;

    let state = AppState {
        registry: Arc::new(EngineRegistry::with_default_engines(&config)),
        repository: Arc::new(repository),
        import_timeout: config.server.import_timeout(),
        metrics: metrics::init(),
    };

    let port = port.unwrap_or(config.server.port);
    info!("Starting importer API on port {}", port);
    server::start_server(state, port, config.server.enable_importer).await
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    logging::init_logging();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let code = match cli.command {
        Commands::Import(args) => cli::run_import(args, &config).await,
        Commands::Serve { port } => match serve(config, port).await {
            Ok(()) => 0,
            Err(e) => {
                error!("Server failed: {:#}", e);
                eprintln!("Error: {e:#}");
                1
            }
        },
    };

    std::process::exit(code);
}
