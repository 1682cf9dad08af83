// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Boardq - a shared queue of natural-language board commands.
//!
//! This is the binary entry point: queue inspection commands plus the
//! long-running `process` command that drains a board's queue.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod output;
mod process;
mod queue;

use std::path::PathBuf;
use std::time::Duration;

use boardq_config::BoardqConfig;
use boardq_core::{BoardId, BoardqError, CommandStatus};
use clap::{Parser, Subcommand};

/// Boardq - a shared queue of natural-language board commands.
#[derive(Parser, Debug)]
#[command(name = "boardq", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output.
    #[arg(long, global = true)]
    plain: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Queue a command for a board.
    Enqueue {
        #[arg(long)]
        board: String,
        #[arg(long, default_value = "cli")]
        user: String,
        /// The natural-language request.
        text: String,
    },
    /// List recent commands, newest first.
    List {
        #[arg(long)]
        board: String,
        /// Only show commands with this status (repeatable).
        #[arg(long)]
        status: Vec<CommandStatus>,
        /// Maximum number of records read. Defaults to `queue.history_limit`.
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Show one command.
    Show {
        #[arg(long)]
        board: String,
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// Print queue updates as they happen until Ctrl+C.
    Watch {
        #[arg(long)]
        board: String,
        /// Follow a single command instead of the whole board.
        #[arg(long)]
        command: Option<String>,
    },
    /// Delete finished commands older than the retention window.
    Cleanup {
        #[arg(long)]
        board: String,
        /// Override `queue.cleanup_ttl_secs`.
        #[arg(long)]
        older_than_secs: Option<u64>,
    },
    /// Claim and run the board's pending commands until Ctrl+C.
    Process {
        #[arg(long)]
        board: String,
        /// How long to wait for the in-flight command on shutdown.
        #[arg(long, default_value_t = 30)]
        grace_secs: u64,
    },
    /// List the board tools the executor understands.
    Tools {
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => boardq_config::load_and_validate_path(path),
        None => boardq_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            boardq_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    process::init_tracing(&config.log.level);

    let Some(command) = cli.command else {
        println!("boardq: use --help for available commands");
        return;
    };

    if let Err(e) = run(command, &config, cli.plain).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: &BoardqConfig, plain: bool) -> Result<(), BoardqError> {
    let use_color = output::use_color(plain);
    match command {
        Commands::Enqueue { board, user, text } => {
            let gateway = queue::open_gateway(config).await?;
            let id = gateway.enqueue(&BoardId::new(board), &user, &text).await?;
            println!("{id}");
            Ok(())
        }
        Commands::List {
            board,
            status,
            limit,
            json,
        } => {
            let gateway = queue::open_gateway(config).await?;
            let limit = limit.unwrap_or(config.queue.history_limit);
            let commands = queue::list(&gateway, &BoardId::new(board), status, limit).await?;
            println!("{}", output::render_commands(&commands, json, use_color)?);
            Ok(())
        }
        Commands::Show { board, id, json } => {
            let gateway = queue::open_gateway(config).await?;
            let command = queue::show(&gateway, &BoardId::new(board), &id).await?;
            println!("{}", output::render_command(&command, json, use_color)?);
            Ok(())
        }
        Commands::Watch { board, command } => {
            let gateway = queue::open_gateway(config).await?;
            let limit = config.queue.history_limit;
            queue::watch(&gateway, &BoardId::new(board), command, limit, use_color).await
        }
        Commands::Cleanup {
            board,
            older_than_secs,
        } => {
            let gateway = queue::open_gateway(config).await?;
            let older_than = older_than_secs
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.queue.cleanup_ttl());
            let removed = gateway.cleanup(&BoardId::new(board), older_than).await?;
            println!("removed {removed} command(s)");
            Ok(())
        }
        Commands::Process { board, grace_secs } => {
            process::run_process(
                config,
                BoardId::new(board),
                Duration::from_secs(grace_secs),
                use_color,
            )
            .await
        }
        Commands::Tools { json } => {
            println!("{}", output::render_tools(json, use_color)?);
            Ok(())
        }
    }
}
