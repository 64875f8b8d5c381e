//! Foodgram server and operational commands.
//!
//! `foodgram` with no arguments runs the HTTP server. The other
//! subcommands manage the schema, static files, admin users and
//! reference data.

use std::io::{self, BufRead, Write};
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use foodgram::api::{self, RegisterRequest};
use foodgram::db::{self, UserRole};
use foodgram::services::{statics, DataLoader};
use foodgram::{config, AppState};

#[derive(Debug, Parser)]
#[command(name = "foodgram", version, about = "Recipe sharing service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Create or update the database schema
    Migrate,
    /// Copy static files into STATIC_ROOT
    Collectstatic {
        /// Do not ask for confirmation
        #[arg(long)]
        noinput: bool,
    },
    /// Create an admin user
    Createsuperuser(SuperuserArgs),
    /// Load ingredients from CSV or JSON
    #[command(alias = "load_data_ingredients")]
    LoadDataIngredients {
        /// Defaults to DATA_DIR/ingredients.csv
        path: Option<PathBuf>,
    },
    /// Load tags from CSV or JSON
    #[command(alias = "load_data_tags")]
    LoadDataTags {
        /// Defaults to DATA_DIR/tags.json
        path: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
struct SuperuserArgs {
    #[arg(long)]
    email: String,
    #[arg(long)]
    username: String,
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    password: String,
}

fn init_tracing() {
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let fmt_layer = if json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "foodgram=debug,tower_http=debug".into()),
        )
        .with(fmt_layer)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // .env may set RUST_LOG / LOG_FORMAT, so load it before logging
    dotenvy::dotenv().ok();
    init_tracing();
    let config = config::init();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::Migrate => {
            AppState::new().await.context("Failed to apply schema")?;
            println!("Database schema is up to date ({})", config.database.name);
            Ok(())
        }
        Command::Collectstatic { noinput } => {
            let (source, target) = (&config.statics.source, &config.statics.root);
            if !noinput && !confirm(&format!(
                "Static files will be copied from {} to {}, overwriting existing files.",
                source.display(),
                target.display()
            ))? {
                println!("Collecting static files cancelled.");
                return Ok(());
            }
            let copied = statics::collect(source, target).await?;
            println!("{} static files copied to '{}'.", copied, target.display());
            Ok(())
        }
        Command::Createsuperuser(args) => {
            let state = AppState::new().await?;
            let request = RegisterRequest {
                email: Some(args.email),
                username: Some(args.username),
                first_name: Some(args.first_name),
                last_name: Some(args.last_name),
                password: Some(args.password),
            };
            let user = api::create_account(&state, &request, UserRole::Admin).await?;
            println!("Superuser '{}' created (id {}).", user.username, user.id);
            Ok(())
        }
        Command::LoadDataIngredients { path } => {
            let path = path.unwrap_or_else(|| config.data.dir.join("ingredients.csv"));
            let state = AppState::new().await?;
            let report = DataLoader::new(state.db.clone()).load_ingredients(&path).await?;
            println!("Ingredients from {}: {}", path.display(), report);
            Ok(())
        }
        Command::LoadDataTags { path } => {
            let path = path.unwrap_or_else(|| config.data.dir.join("tags.json"));
            let state = AppState::new().await?;
            let report = DataLoader::new(state.db.clone()).load_tags(&path).await?;
            println!("Tags from {}: {}", path.display(), report);
            Ok(())
        }
    }
}

async fn serve() -> anyhow::Result<()> {
    let config = config::config();
    tracing::info!(
        "Starting Foodgram server on {}:{}",
        config.server.host,
        config.server.port
    );
    tracing::debug!(
        engine = ?config.database.engine,
        name = %config.database.name,
        "Database settings"
    );

    // Initialize application state
    let state = AppState::new().await?;
    db::health_check(&state.db).await?;
    tracing::info!("Application state initialized");

    let app = foodgram::router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid HOST/PORT")?;

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Ask a yes/no question on stdin.
fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{}\nType 'yes' to continue, or 'no' to cancel: ", prompt);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("yes"))
}
