mod commands;
mod config;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use std::process;
use tracing::Level;

use loan_engine_core::LoanEngineError;

use commands::admin::SeedArgs;
use commands::calculators::{MaxLoanArgs, MonthlyPaymentArgs, ScheduleArgs};
use commands::loans::{HistoryArgs, RequestArgs, ReviewArgs, StatusArgs, UserArgs};
use commands::Context;

/// Loan quotes, applications and reviews
#[derive(Parser)]
#[command(
    name = "loanctl",
    version,
    about = "Loan quotes, applications and reviews",
    long_about = "A CLI over the loan engine. Pure calculators (monthly payment, \
                  amortization schedule, maximum loan) need no database; the \
                  remaining commands work against a SQLite database file."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// SQLite database file
    #[arg(long, default_value = "loan_engine.db", global = true)]
    db: PathBuf,

    /// Lending configuration file (.json, .yaml or .yml)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log at debug level on stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Level monthly payment for a principal, APR and term
    MonthlyPayment(MonthlyPaymentArgs),
    /// Full amortization schedule
    Schedule(ScheduleArgs),
    /// Maximum principal from income, DTI and multipliers
    MaxLoan(MaxLoanArgs),
    /// Create or update the database schema
    InitDb,
    /// Load settings, multipliers, tiers, users and accounts from a file
    Seed(SeedArgs),
    /// Balance totals, tier hints and active loan for a user
    Eligibility(UserArgs),
    /// Quote the maximum loan (and a requested amount) for a user
    Calculate(RequestArgs),
    /// Submit a loan application
    Apply(RequestArgs),
    /// Active loan and recent applications for a user
    Status(StatusArgs),
    /// Scheduled payments across a user's loans
    History(HistoryArgs),
    /// Approve or deny a pending application
    Review(ReviewArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    let ctx = Context {
        db: cli.db.clone(),
        config: cli.config.clone(),
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::MonthlyPayment(args) => commands::calculators::run_monthly_payment(args),
        Commands::Schedule(args) => commands::calculators::run_schedule(args),
        Commands::MaxLoan(args) => commands::calculators::run_max_loan(args),
        Commands::InitDb => commands::admin::run_init_db(&ctx),
        Commands::Seed(args) => commands::admin::run_seed(&ctx, args),
        Commands::Eligibility(args) => commands::loans::run_eligibility(&ctx, args),
        Commands::Calculate(args) => commands::loans::run_calculate(&ctx, args),
        Commands::Apply(args) => commands::loans::run_apply(&ctx, args),
        Commands::Status(args) => commands::loans::run_status(&ctx, args),
        Commands::History(args) => commands::loans::run_history(&ctx, args),
        Commands::Review(args) => commands::loans::run_review(&ctx, args),
        Commands::Version => {
            println!("loanctl {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            report(e.as_ref());
            process::exit(1);
        }
    }
}

/// Engine errors print their client-safe message; the cause of a server
/// error has already been logged.
fn report(e: &(dyn std::error::Error + 'static)) {
    match e.downcast_ref::<LoanEngineError>() {
        Some(LoanEngineError::RequestedAmountExceedsMax { max_principal, .. }) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            eprintln!("maxPrincipal: {}", max_principal);
        }
        Some(engine) => {
            if !engine.is_client_error() {
                tracing::error!(error = %engine, "command failed");
            }
            eprintln!("{}: {}", "error".red().bold(), engine.client_message());
        }
        None => eprintln!("{}: {}", "error".red().bold(), e),
    }
}
