use crate::config::Config;
use crate::constants::DEFAULT_ENGINE;
use crate::context::Context;
use crate::progress::{ProgressReporter, TerminalReporter};
use crate::registry::EngineRegistry;
use crate::repository::{LibsqlRepository, PostRepository};
use crate::service::ImportService;
use crate::types::{ImportOptions, ImportResult};
use clap::{ArgAction, Args};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Flags of the `import` subcommand.
#[derive(Debug, Clone, Default, Args)]
pub struct ImportArgs {
    /// Import engine to use
    #[arg(long, default_value = DEFAULT_ENGINE)]
    pub source: String,

    /// Username to import articles from
    #[arg(long)]
    pub username: Option<String>,

    /// Specific article URL to import
    #[arg(long)]
    pub url: Option<String>,

    /// Specific article ID to import
    #[arg(long)]
    pub id: Option<String>,

    /// User ID to assign imported posts to (required)
    #[arg(long)]
    pub user_id: Option<String>,

    /// Update existing posts with matching titles
    #[arg(
        long,
        num_args = 0..=1,
        default_missing_value = "true",
        default_value_t = false,
        action = ArgAction::Set
    )]
    pub update: bool,

    /// Preview import without saving
    #[arg(
        long,
        num_args = 0..=1,
        default_missing_value = "true",
        default_value_t = false,
        action = ArgAction::Set
    )]
    pub dry_run: bool,

    /// List available engines and exit
    #[arg(long)]
    pub list_engines: bool,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl ImportArgs {
    /// Flag checks done before touching the database. The service repeats them.
    pub fn validate(&self) -> Result<(), String> {
        if non_empty(&self.user_id).is_none() {
            return Err("--user-id is required".into());
        }
        if non_empty(&self.username).is_none()
            && non_empty(&self.url).is_none()
            && non_empty(&self.id).is_none()
        {
            return Err("one of --username, --url, or --id must be provided".into());
        }
        Ok(())
    }

    pub fn to_options(&self) -> ImportOptions {
        let text = |v: &Option<String>| non_empty(v).unwrap_or_default().to_string();
        ImportOptions {
            source: self.source.clone(),
            user_id: text(&self.user_id),
            username: text(&self.username),
            article_url: text(&self.url),
            article_id: text(&self.id),
            update_existing: self.update,
            dry_run: self.dry_run,
        }
    }
}

pub fn engine_listing(registry: &EngineRegistry) -> String {
    let mut out = String::from("Available import engines:\n");
    for name in registry.list() {
        let _ = writeln!(out, "  - {name}");
    }
    out
}

/// The block printed after a completed run.
pub fn summary(result: &ImportResult) -> String {
    let mut out = String::from("\nImport Summary:\n");
    let _ = writeln!(out, "  Total fetched: {}", result.total_fetched);
    let _ = writeln!(out, "  Created: {}", result.created);
    let _ = writeln!(out, "  Updated: {}", result.updated);
    let _ = writeln!(out, "  Skipped: {}", result.skipped);
    let _ = writeln!(out, "  Failed: {}", result.failed);

    if !result.errors.is_empty() {
        out.push_str("\nErrors:\n");
        for err in &result.errors {
            let _ = writeln!(out, "  - {err}");
        }
    }
    out
}

/// Run the `import` subcommand and return the process exit code.
pub async fn run_import(args: ImportArgs, config: &Config) -> i32 {
    let registry = Arc::new(EngineRegistry::with_default_engines(config));

    if args.list_engines {
        print!("{}", engine_listing(&registry));
        return 0;
    }

    if let Err(msg) = args.validate() {
        eprintln!("Error: {msg}");
        eprintln!("Run 'blog-importer import --help' for usage.");
        return 1;
    }

    let database_url = match config.database_url() {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Error: DATABASE_URL environment variable is required");
            return 1;
        }
    };

    let repository =
        match LibsqlRepository::connect(database_url, config.database.auth_token.as_deref()).await
        {
            Ok(repo) => repo,
            Err(e) => {
                error!("Database connection failed: {}", e);
                eprintln!("Error: {e}");
                return 1;
            }
        };

    let ctx = Context::background().with_timeout(config.cli.run_timeout());
    let interrupt = {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling import");
                ctx.cancel();
            }
        })
    };

    let code = execute(
        &ctx,
        registry,
        Arc::new(repository),
        Arc::new(TerminalReporter::new()),
        &args.to_options(),
    )
    .await;
    interrupt.abort();
    code
}

/// Run one import with the given collaborators, printing the outcome.
pub async fn execute(
    ctx: &Context,
    registry: Arc<EngineRegistry>,
    repository: Arc<dyn PostRepository>,
    reporter: Arc<dyn ProgressReporter>,
    opts: &ImportOptions,
) -> i32 {
    if opts.dry_run {
        println!("Running in DRY-RUN mode - no changes will be saved");
    }

    let service = ImportService::new(registry, repository).with_reporter(reporter);
    match service.import(ctx, opts).await {
        Ok(result) => {
            print!("{}", summary(&result));
            info!("{}", result);
            if result.failed > 0 {
                1
            } else {
                0
            }
        }
        Err(abort) => {
            eprintln!("Import failed: {}", abort.error);
            if let Some(partial) = abort.partial.as_ref() {
                print!("{}", summary(partial));
            }
            1
        }
    }
}
