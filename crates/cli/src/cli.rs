use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

/// Monthly openFDA adverse-event counts, aggregated by week into PostgreSQL.
#[derive(Parser, Debug)]
#[command(name = "openfda", version, about)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch and persist a single month. Always appends, even if the month
    /// was loaded before.
    Run {
        #[command(flatten)]
        month: MonthArgs,

        /// Keep rows in memory and print them instead of writing to PostgreSQL.
        #[arg(long)]
        dry_run: bool,
    },

    /// Run every elapsed month since the schedule start that has no
    /// successful run recorded.
    Backfill {
        /// Override SCHEDULE_START_DATE (YYYY-MM-DD).
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Treat periods as elapsed up to this date instead of now (YYYY-MM-DD).
        #[arg(long)]
        until: Option<NaiveDate>,

        /// Rerun months that already succeeded.
        #[arg(long)]
        force: bool,

        #[arg(long)]
        dry_run: bool,
    },

    /// Backfill, then wait for each new month until Ctrl-C.
    Serve {
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the query URL for a month.
    Url {
        #[command(flatten)]
        month: MonthArgs,
    },

    /// Print the effective configuration (secrets redacted).
    Config,
}

#[derive(Args, Debug, Clone, Copy)]
pub struct MonthArgs {
    #[arg(long)]
    pub year: i32,

    /// 1-12
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
    pub month: u32,
}
