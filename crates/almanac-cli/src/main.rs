//! `almanac` CLI -- inspect and edit recurring-event occurrences from the
//! command line.
//!
//! The CLI works on a self-contained JSON dataset (calendars, events,
//! persisted occurrence exceptions) and drives the same engine surface the
//! transport layer uses.
//!
//! ## Usage
//!
//! ```sh
//! # Materialized occurrences of one event in a window
//! almanac occurrences -i data.json --event <uuid> \
//!     --from 2024-01-01T00:00:00Z --to 2024-02-01T00:00:00Z
//!
//! # Merged timeline for a week
//! almanac upcoming -i data.json --period week --anchor 2024-01-10
//!
//! # Move one occurrence; writes the updated dataset
//! almanac edit -i data.json -o data.json --event <uuid> \
//!     --at 2024-01-03T09:00:00Z --start 2024-01-03T14:00:00Z
//!
//! # Cancel one occurrence
//! almanac edit -i data.json --event <uuid> --at 2024-01-03T09:00:00Z --cancel
//! ```

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, Read};
use uuid::Uuid;

use almanac_engine::{
    mutate, occurrences_between, upcoming, EventSource, InMemoryStore, OccurrenceChanges,
    OccurrenceStore, PeriodKind, ReconcileOptions, UpcomingRequest,
};

#[derive(Parser)]
#[command(name = "almanac", version, about = "Recurring-event occurrence engine CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Materialize one event's occurrences within a window
    Occurrences {
        /// Dataset file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Event id
        #[arg(long)]
        event: Uuid,
        /// Window start (RFC 3339)
        #[arg(long)]
        from: DateTime<Utc>,
        /// Window end (RFC 3339)
        #[arg(long)]
        to: DateTime<Utc>,
        /// Also emit cancelled occurrences
        #[arg(long)]
        include_cancelled: bool,
    },
    /// Merged occurrence timeline across calendars for a period
    Upcoming {
        /// Dataset file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Calendar ids to include (defaults to every calendar in the dataset)
        #[arg(long)]
        calendar: Vec<Uuid>,
        /// Period to cover
        #[arg(long, value_enum, default_value = "week")]
        period: Period,
        /// Date the period is derived from (defaults to today)
        #[arg(long)]
        anchor: Option<NaiveDate>,
        /// Explicit range start, for --period custom (RFC 3339)
        #[arg(long, requires = "to")]
        from: Option<DateTime<Utc>>,
        /// Explicit range end, for --period custom (RFC 3339)
        #[arg(long, requires = "from")]
        to: Option<DateTime<Utc>>,
        /// Timezone for day/week/month boundaries (defaults to the first
        /// requested calendar's timezone)
        #[arg(long)]
        timezone: Option<String>,
        /// Also emit cancelled occurrences
        #[arg(long)]
        include_cancelled: bool,
    },
    /// Edit one occurrence without touching the recurrence rule
    Edit {
        /// Dataset file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Where to write the updated dataset (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// Event id
        #[arg(long)]
        event: Uuid,
        /// Original scheduled start of the occurrence to edit (RFC 3339)
        #[arg(long)]
        at: DateTime<Utc>,
        /// New start (RFC 3339)
        #[arg(long)]
        start: Option<DateTime<Utc>>,
        /// New end (RFC 3339)
        #[arg(long)]
        end: Option<DateTime<Utc>>,
        /// New title for just this occurrence
        #[arg(long)]
        title: Option<String>,
        /// New description for just this occurrence
        #[arg(long)]
        description: Option<String>,
        /// Cancel the occurrence (soft delete)
        #[arg(long, conflicts_with = "restore")]
        cancel: bool,
        /// Undo a cancellation
        #[arg(long)]
        restore: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Period {
    Day,
    Week,
    Month,
    Year,
    Custom,
}

impl From<Period> for PeriodKind {
    fn from(period: Period) -> Self {
        match period {
            Period::Day => PeriodKind::Day,
            Period::Week => PeriodKind::Week,
            Period::Month => PeriodKind::Month,
            Period::Year => PeriodKind::Year,
            Period::Custom => PeriodKind::Custom,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Occurrences {
            input,
            event,
            from,
            to,
            include_cancelled,
        } => {
            let store = load_dataset(input.as_deref())?;
            let Some(event) = store.event(event) else {
                bail!("event {event} is not in the dataset");
            };
            let options = ReconcileOptions { include_cancelled };
            let timeline =
                occurrences_between(&event, &store.exceptions_for(event.id), from, to, &options)
                    .context("Failed to materialize occurrences")?;
            println!("{}", serde_json::to_string_pretty(&timeline)?);
        }
        Commands::Upcoming {
            input,
            calendar,
            period,
            anchor,
            from,
            to,
            timezone,
            include_cancelled,
        } => {
            let store = load_dataset(input.as_deref())?;
            let calendars = if calendar.is_empty() {
                store.calendars.iter().map(|c| c.id).collect()
            } else {
                calendar
            };
            let timezone = resolve_timezone(&store, &calendars, timezone.as_deref())?;
            let request = UpcomingRequest {
                calendars,
                period: period.into(),
                anchor_date: anchor.unwrap_or_else(|| Utc::now().date_naive()),
                timezone,
                custom_start: from,
                custom_end: to,
            };
            let options = ReconcileOptions { include_cancelled };
            let timeline =
                upcoming(&store, &request, &options).context("Failed to query upcoming")?;
            println!("{}", serde_json::to_string_pretty(&timeline)?);
        }
        Commands::Edit {
            input,
            output,
            event,
            at,
            start,
            end,
            title,
            description,
            cancel,
            restore,
        } => {
            let mut store = load_dataset(input.as_deref())?;
            let Some(event) = store.event(event) else {
                bail!("event {event} is not in the dataset");
            };
            let cancelled = if cancel {
                Some(true)
            } else if restore {
                Some(false)
            } else {
                None
            };
            let changes = OccurrenceChanges {
                start,
                end,
                cancelled,
                title,
                description,
            };
            if changes.is_empty() {
                bail!(
                    "nothing to change: pass --start, --end, --title, --description, \
                     --cancel or --restore"
                );
            }
            let occurrence = mutate(&event, at, &changes, &mut store)
                .context("Failed to edit the occurrence")?;
            eprintln!(
                "updated occurrence {} of event {} ({} -> {})",
                occurrence.id, occurrence.event_id, occurrence.original_start, occurrence.start
            );
            write_output(output.as_deref(), &serde_json::to_string_pretty(&store)?)?;
        }
    }

    Ok(())
}

/// Pick the timezone for period boundaries: the explicit flag if given,
/// else the first requested calendar's timezone, else UTC.
fn resolve_timezone(
    store: &InMemoryStore,
    calendars: &[Uuid],
    explicit: Option<&str>,
) -> Result<chrono_tz::Tz> {
    let name = match explicit {
        Some(name) => name.to_string(),
        None => store
            .calendars
            .iter()
            .find(|c| calendars.contains(&c.id))
            .map(|c| c.timezone.clone())
            .unwrap_or_else(|| "UTC".to_string()),
    };
    name.parse()
        .map_err(|_| anyhow::anyhow!("Unknown timezone: {name}"))
}

fn load_dataset(path: Option<&str>) -> Result<InMemoryStore> {
    let raw = read_input(path)?;
    serde_json::from_str(&raw).context("Failed to parse the dataset")
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {path}"))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {path}"))?;
        }
        None => {
            println!("{content}");
        }
    }
    Ok(())
}
