use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use fintrack::{
    config::{Config, ConfigManager},
    domain::{Frequency, RecurrenceDraft, TransactionKind},
    engine::MAX_UPCOMING,
    init_with_filter,
    jobs::{render_definition, render_report, render_summary},
    utils::build_info,
    AppError, JobRunner,
};
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "fintrack", about = "Recurring transaction jobs for FinTrack")]
struct Cli {
    /// Base directory for configuration and data (defaults to FINTRACK_HOME or ~/.fintrack)
    #[arg(long, global = true)]
    home: Option<PathBuf>,
    /// JSON store path, overriding the configured one
    #[arg(long, global = true)]
    store: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Materialize every recurring transaction due on or before a date
    ProcessRecurring {
        /// Processing date (defaults to today, UTC)
        #[arg(long)]
        as_of: Option<NaiveDate>,
        /// Definitions processed concurrently
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Create a recurring transaction definition
    AddRecurring {
        #[arg(long)]
        owner: Uuid,
        #[arg(long)]
        amount: Decimal,
        #[arg(long)]
        description: String,
        #[arg(long, value_enum)]
        kind: KindArg,
        /// DAILY, WEEKLY, BIWEEKLY, MONTHLY, QUARTERLY or YEARLY
        #[arg(long)]
        frequency: Frequency,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: Option<NaiveDate>,
        /// First occurrence when it differs from the start date
        #[arg(long)]
        first: Option<NaiveDate>,
        #[arg(long)]
        category: Option<String>,
    },
    /// List stored definitions with status and next occurrence
    ListRecurring {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Preview the next occurrence dates of a definition
    Upcoming {
        id: Uuid,
        /// Number of dates to print (1 to 1000)
        #[arg(
            long,
            default_value_t = 5,
            value_parser = clap::value_parser!(u64).range(1..=MAX_UPCOMING as u64)
        )]
        count: u64,
    },
    /// Summarize the month before a date for one owner
    MonthlyReport {
        #[arg(long)]
        owner: Uuid,
        /// Reference date (defaults to today, UTC)
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Show or change persisted settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show build metadata
    Version,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as JSON
    Show,
    /// Set one key: store_path, workers, log_filter, report_top_categories or currency
    Set { key: String, value: String },
    /// Restore default settings
    Reset,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Income,
    Expense,
    Transfer,
}

impl From<KindArg> for TransactionKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Income => TransactionKind::Income,
            KindArg::Expense => TransactionKind::Expense,
            KindArg::Transfer => TransactionKind::Transfer,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    if let Commands::Version = cli.command {
        println!("{}", build_info::current());
        return Ok(());
    }

    let manager = match cli.home {
        Some(home) => ConfigManager::with_base_dir(home)?,
        None => ConfigManager::from_env()?,
    };
    if let Commands::Config { action } = cli.command {
        return run_config(&manager, action);
    }
    let runner = JobRunner::open(&manager, cli.store)?;
    init_with_filter(&runner.config().log_filter);

    match cli.command {
        Commands::ProcessRecurring { as_of, workers } => {
            let report = runner.process_recurring(as_of, workers)?;
            println!("{}", render_report(&report));
        }
        Commands::AddRecurring {
            owner,
            amount,
            description,
            kind,
            frequency,
            start,
            end,
            first,
            category,
        } => {
            let mut draft =
                RecurrenceDraft::new(owner, amount, description, kind.into(), frequency, start);
            if let Some(end) = end {
                draft = draft.with_end_date(end);
            }
            if let Some(first) = first {
                draft = draft.with_first_occurrence(first);
            }
            if let Some(category) = category {
                draft = draft.with_category(category);
            }
            let definition = runner.add_recurring(draft)?;
            println!(
                "Created recurring transaction {} (next {})",
                definition.id, definition.next_occurrence
            );
        }
        Commands::ListRecurring { json } => {
            let definitions = runner.list_recurring()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&definitions)?);
            } else if definitions.is_empty() {
                println!("No recurring transactions.");
            } else {
                for definition in &definitions {
                    println!("{}", render_definition(definition));
                }
            }
        }
        Commands::Upcoming { id, count } => {
            let count = usize::try_from(count)
                .map_err(|_| AppError::InvalidArgument(format!("count {count} is too large")))?;
            for date in runner.upcoming(id, count)? {
                println!("{date}");
            }
        }
        Commands::MonthlyReport { owner, today } => match runner.monthly_report(owner, today)? {
            Some(summary) => println!("{}", render_summary(&summary, &runner.config().currency)),
            None => println!("No transactions for {owner} in the previous month."),
        },
        // Handled before the store is opened.
        Commands::Config { .. } | Commands::Version => {}
    }
    Ok(())
}

fn run_config(manager: &ConfigManager, action: ConfigAction) -> Result<(), AppError> {
    match action {
        ConfigAction::Show => {
            let config = manager.load()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Set { key, value } => {
            manager.update(|config| config.set(&key, &value))?;
            println!("Updated {key}.");
        }
        ConfigAction::Reset => {
            manager.save(&Config::default())?;
            println!("Configuration reset to defaults.");
        }
    }
    Ok(())
}
