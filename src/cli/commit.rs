use std::path::Path;

use clap::{Args, Subcommand};

use crate::cli::{block_on, open_store, OutputFormat};
use crate::core::pairing::MatchRecord;
use crate::core::types::{EventId, MatchId, MatchStatus, PostulationId};
use crate::matching::MatchCommitService;
use crate::store::{MatchQuery, MatchStore};

#[derive(Args)]
pub struct MatchArgs {
    #[command(subcommand)]
    pub action: MatchAction,
}

#[derive(Subcommand)]
pub enum MatchAction {
    /// Lodge a visitor with a host
    Create {
        /// Visitor postulation id
        visitor: String,

        /// Host postulation id
        host: String,
    },

    /// Cancel a match, returning the places to the host
    Cancel {
        /// Match id
        id: String,
    },

    /// List matches
    List {
        /// Only matches for this event
        #[arg(long)]
        event: Option<String>,

        /// Include cancelled matches
        #[arg(long)]
        all: bool,
    },
}

/// Execute match subcommand
///
/// # Errors
///
/// Returns an error if the data file cannot be read or written, or the
/// commit is refused.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: MatchArgs, data: &Path, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let store = open_store(data, verbose)?;
    let service = MatchCommitService::new(&store);

    match args.action {
        MatchAction::Create { visitor, host } => {
            let record = block_on(
                service.create_match(&PostulationId::new(visitor), &PostulationId::new(host)),
            )??;
            print_record(&record, format, "Created")?;
        }
        MatchAction::Cancel { id } => {
            let record = block_on(service.cancel_match(&MatchId::new(id)))??;
            print_record(&record, format, "Cancelled")?;
        }
        MatchAction::List { event, all } => {
            let query = MatchQuery {
                event_id: event.map(EventId::new),
                status: if all { None } else { Some(MatchStatus::Active) },
                ..MatchQuery::default()
            };
            let records = block_on(store.query_matches(&query))??;
            if records.is_empty() && !matches!(format, OutputFormat::Json) {
                eprintln!("No matches found.");
                return Ok(());
            }
            print_records(&records, format)?;
        }
    }

    Ok(())
}

fn print_record(record: &MatchRecord, format: OutputFormat, label: &str) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => println!("{label} {}", describe(record)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(record)?),
        OutputFormat::Tsv => print_tsv(std::slice::from_ref(record)),
    }
    Ok(())
}

fn print_records(records: &[MatchRecord], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            for record in records {
                println!("{}", describe(record));
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(records)?),
        OutputFormat::Tsv => print_tsv(records),
    }
    Ok(())
}

fn describe(record: &MatchRecord) -> String {
    format!(
        "{}: visitor {} lodged with host {} ({} people, {})",
        record.id,
        record.visitor_postulation_id,
        record.host_postulation_id,
        record.people_count,
        record.status
    )
}

fn print_tsv(records: &[MatchRecord]) {
    println!("id\tevent\tvisitor\thost\tpeople\tstatus\tcreated_at");
    for record in records {
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            record.id,
            record.event_id,
            record.visitor_postulation_id,
            record.host_postulation_id,
            record.people_count,
            record.status,
            record.created_at.as_datetime().to_rfc3339()
        );
    }
}
