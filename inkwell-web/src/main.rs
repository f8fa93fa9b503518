//! Inkwell Web Server
//!
//! Serves the post API behind the access policy.

use clap::{Parser, Subcommand};
use inkwell_core::InkwellConfig;
use inkwell_web::{init_logging, server::InkwellServerBuilder, AppState};
use std::path::PathBuf;
use tracing::info;

/// Inkwell Web Server - posts with owners, collaborators and access control
#[derive(Parser)]
#[command(name = "inkwell-web")]
#[command(about = "Serve the Inkwell post API")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Server port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// SQLite database URL
    #[arg(long)]
    database_url: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Register a user and exit
    AddUser {
        email: String,

        /// Grant the admin role
        #[arg(long)]
        admin: bool,
    },
}

impl Args {
    /// Layer command line overrides on top of the loaded configuration
    fn apply(&self, config: &mut InkwellConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(url) = &self.database_url {
            config.database.url = url.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    let mut config = InkwellConfig::load(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;

    init_logging(&config.logging)?;

    match args.command {
        Some(Command::AddUser { email, admin }) => {
            let state = AppState::from_config(config).await?;
            let user = state.posts.register_user(&email, admin).await?;
            info!(user_id = %user.id, email = %user.email, admin, "User added");
            println!("{}", user.id);
        }
        None => {
            let server = InkwellServerBuilder::with_config(config).build().await?;
            server.start().await?;
        }
    }

    Ok(())
}
