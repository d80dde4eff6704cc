//! Ledger CLI - an append-only ledger in your terminal

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{account, doctor, logs, reports};
use ledger_core::{Error as LedgerError, LogEvent, OperationResult};

/// Ledger - balances derived from an append-only log
#[derive(Parser)]
#[command(name = "ledger", version, about, long_about = None)]
struct Cli {
    /// Session token of the calling user
    #[arg(long, global = true, env = "LEDGER_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new user and print a session token
    Register {
        username: String,
        /// Protect the account with a password (prompted, or LEDGER_PASSWORD)
        #[arg(long)]
        password: bool,
    },

    /// Log in and print a session token
    Login {
        username: String,
        /// Prompt for the password (or read LEDGER_PASSWORD)
        #[arg(long)]
        password: bool,
    },

    /// Credit your own account
    Topup {
        /// Whole amount in the smallest currency unit
        amount: String,
    },

    /// Show your current balance
    Balance,

    /// Send funds to another user
    Transfer {
        /// Receiver's username
        to: String,
        /// Whole amount in the smallest currency unit
        amount: String,
    },

    /// Rank senders by total outbound volume
    TopUsers,

    /// Your largest transfers, signed from your side
    TopTransactions,

    /// List every record touching your account
    History {
        /// Write the history to a CSV file instead of printing it
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Run ledger integrity checks
    Doctor {
        /// Show details of failing checks
        #[arg(long, short)]
        verbose: bool,
    },

    /// View and manage the operational log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Register { .. } => "register",
            Commands::Login { .. } => "login",
            Commands::Topup { .. } => "topup",
            Commands::Balance => "balance",
            Commands::Transfer { .. } => "transfer",
            Commands::TopUsers => "top-users",
            Commands::TopTransactions => "top-transactions",
            Commands::History { .. } => "history",
            Commands::Doctor { .. } => "doctor",
            Commands::Logs { .. } => "logs",
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("LEDGER_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let command = cli.command.name();
    let json = cli.json;

    let result = run(cli);

    // Opened after the command so `logs` has the log database to itself
    let logger = commands::get_logger();

    match result {
        Ok(()) => {
            commands::log_event(&logger, LogEvent::new("command_executed").with_command(command));
            ExitCode::SUCCESS
        }
        Err(e) => {
            let ledger_error = e.downcast_ref::<LedgerError>();
            let event = LogEvent::new("command_failed").with_command(command);
            let event = match ledger_error {
                Some(le) => event.with_ledger_error(le),
                None => event.with_error(e.to_string()),
            };
            commands::log_event(&logger, event);

            match (json, ledger_error) {
                (true, Some(le)) => {
                    let envelope: OperationResult<()> = OperationResult::fail(le);
                    match serde_json::to_string_pretty(&envelope) {
                        Ok(s) => println!("{}", s),
                        Err(_) => output::error(&format!("{:#}", e)),
                    }
                }
                _ => output::error(&format!("{:#}", e)),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let token = cli.token.as_deref();
    let json = cli.json;

    match cli.command {
        Commands::Register { username, password } => account::register(&username, password, json),
        Commands::Login { username, password } => account::login(&username, password, json),
        Commands::Topup { amount } => account::topup(token, &amount, json),
        Commands::Balance => account::balance(token, json),
        Commands::Transfer { to, amount } => account::transfer(token, &to, &amount, json),
        Commands::TopUsers => reports::top_users(token, json),
        Commands::TopTransactions => reports::top_transactions(token, json),
        Commands::History { csv } => reports::history(token, csv.as_deref(), json),
        Commands::Doctor { verbose } => doctor::run(verbose, json),
        Commands::Logs { command } => logs::run(command, json),
    }
}
