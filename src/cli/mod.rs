//! CLI module for Wayfarer
//!
//! - `serve`: run the HTTP server
//! - `chat`: answer one query in-process and print the refined response

use crate::server::{self, config::AppConfig};
use clap::{Parser, Subcommand};
use tracing::info;
use wayfarer_core::ChatRequest;

/// Wayfarer travel concierge
#[derive(Parser, Debug)]
#[command(name = "wayfarer")]
#[command(about = "Multi-agent travel concierge")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server
    Serve,
    /// Ask a single question
    Chat {
        /// Client session id; reuse it to continue a conversation
        #[arg(long)]
        session: Option<String>,
        /// User id
        #[arg(long, default_value = "user")]
        user: String,
        /// The question
        query: String,
    },
}

/// Run the CLI command
pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Serve) => {
            info!("Starting Wayfarer v{}", env!("CARGO_PKG_VERSION"));
            server::run(config).await
        }
        Some(Commands::Chat {
            session,
            user,
            query,
        }) => {
            let concierge = server::build_concierge(&config)?;
            let session = session.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let response = concierge
                .call(&ChatRequest::new(query, session, user))
                .await?;
            println!("{}", response.response);
            eprintln!("session: {}", response.session_id);
            Ok(())
        }
        None => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            cmd.print_help()?;
            println!();
            Ok(())
        }
    }
}
