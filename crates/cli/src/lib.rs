pub mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use outlay_core::config::{AppConfig, LogFormat};

#[derive(Debug, Parser)]
#[command(
    name = "outlay",
    about = "Outlay operator CLI",
    long_about = "Operate Outlay migrations, demo data, configuration inspection, and the \
                  expense approval workflow.",
    after_help = "Examples:\n  outlay doctor --json\n  outlay preview --submitter seed-staff-dev --amount 2400\n  outlay decide --expense seed-exp-pending --approver seed-mgr-platform --approve"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo dataset (org tree, budget tiers, requests)")]
    Seed,
    #[command(about = "Inspect effective configuration values")]
    Config,
    #[command(about = "Validate config and database connectivity readiness checks")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Preview the approval chain for a submitter and amount")]
    Preview {
        #[arg(long, help = "Submitting employee id")]
        submitter: String,
        #[arg(long, help = "Expense amount, e.g. 2400.00")]
        amount: String,
    },
    #[command(about = "Submit a new expense request and route it to its first approver")]
    Submit {
        #[arg(long, help = "Submitting employee id")]
        submitter: String,
        #[arg(long, help = "Expense amount, e.g. 2400.00")]
        amount: String,
        #[arg(long, help = "Short title for the request")]
        title: String,
        #[arg(long, default_value = "general", help = "Spend category")]
        category: String,
        #[arg(long, default_value = "", help = "What the expense covers")]
        description: String,
        #[arg(long, default_value = "", help = "Why the business needs it")]
        justification: String,
        #[arg(long, default_value = "medium", help = "Urgency: low|medium|high")]
        urgency: String,
    },
    #[command(about = "Record an approver decision on a pending expense request")]
    Decide {
        #[arg(long, help = "Expense request id")]
        expense: String,
        #[arg(long, help = "Deciding approver id")]
        approver: String,
        #[arg(long, conflicts_with = "reject", help = "Record an approval")]
        approve: bool,
        #[arg(long, help = "Record a rejection")]
        reject: bool,
        #[arg(long, help = "Optional decision comment")]
        comment: Option<String>,
    },
}

fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        LogFormat::Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    if let Ok(config) = AppConfig::load(Default::default()) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Preview { submitter, amount } => commands::preview::run(&submitter, &amount),
        Command::Submit {
            submitter,
            amount,
            title,
            category,
            description,
            justification,
            urgency,
        } => commands::submit::run(commands::submit::SubmitArgs {
            submitter,
            amount,
            title,
            category,
            description,
            justification,
            urgency,
        }),
        Command::Decide { expense, approver, approve, reject, comment } => {
            commands::decide::run(&expense, &approver, approve, reject, comment)
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
