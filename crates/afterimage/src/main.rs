// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Afterimage - keeps what your Telegram Business chats delete.
//!
//! This is the binary entry point.

mod admin;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Afterimage - keeps what your Telegram Business chats delete.
#[derive(Parser, Debug)]
#[command(name = "afterimage", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the default locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect to Telegram and start mirroring.
    Serve,
    /// Render a stored chat to an HTML file.
    Export {
        /// Owner's Telegram user id.
        #[arg(long)]
        owner: i64,
        /// Chat id.
        #[arg(long)]
        chat: i64,
        /// Chat name shown in the archive header.
        #[arg(long, default_value = "Chat")]
        name: String,
        /// Only the most recent N messages.
        #[arg(long)]
        limit: Option<u32>,
        /// Output file (defaults to the generated archive name).
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Show an owner's counters and subscription.
    Stats {
        /// Owner's Telegram user id.
        #[arg(long)]
        owner: i64,
    },
    /// Extend an owner's subscription.
    Grant {
        /// Owner's Telegram user id.
        #[arg(long)]
        owner: i64,
        /// Days to add.
        #[arg(long, default_value_t = 30)]
        days: u32,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => afterimage_config::load_and_validate_path(path),
        None => afterimage_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            afterimage_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Export {
            owner,
            chat,
            name,
            limit,
            out,
        }) => admin::run_export(&config, owner, chat, &name, limit, out).await,
        Some(Commands::Stats { owner }) => admin::run_stats(&config, owner).await,
        Some(Commands::Grant { owner, days }) => admin::run_grant(&config, owner, days).await,
        None => {
            println!("afterimage: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
