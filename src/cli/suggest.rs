use std::path::Path;

use clap::{Args, Subcommand};

use crate::cli::score::print_explanation;
use crate::cli::{block_on, open_store, OutputFormat};
use crate::core::types::{EventId, PostulationId};
use crate::matching::{MatchingConfig, PairSuggestion, SuggestionEngine};

#[derive(Args)]
pub struct SuggestArgs {
    #[command(subcommand)]
    pub target: SuggestTarget,

    /// Number of suggestions to show
    #[arg(short = 'n', long, global = true)]
    pub max_suggestions: Option<usize>,

    /// Drop suggestions scoring below this (0-100)
    #[arg(long, global = true, default_value = "0", value_parser = clap::value_parser!(u8).range(0..=100))]
    pub min_score: u8,

    /// Show pros and cons for every suggestion
    #[arg(long, global = true)]
    pub explain: bool,
}

#[derive(Subcommand)]
pub enum SuggestTarget {
    /// Rank hosts for a visitor postulation
    Visitor {
        /// Visitor postulation id
        id: String,
    },

    /// Rank visitors for a host postulation
    Host {
        /// Host postulation id
        id: String,
    },

    /// Best host per approved visitor across an event
    Event {
        /// Event id
        id: String,
    },
}

/// One ranked row, whichever direction was asked for
struct Row<'a> {
    visitor: &'a str,
    host: &'a str,
    people: Option<u32>,
    places: Option<u32>,
    score: u8,
    fit: String,
    explanation: &'a crate::matching::Explanation,
}

/// Execute suggest subcommand
///
/// # Errors
///
/// Returns an error if the data file cannot be read or the postulation does
/// not exist.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(
    args: SuggestArgs,
    data: &Path,
    format: OutputFormat,
    verbose: bool,
) -> anyhow::Result<()> {
    let store = open_store(data, verbose)?;
    let config = MatchingConfig {
        min_score: args.min_score,
        limit: args.max_suggestions,
    };
    let engine = SuggestionEngine::with_config(&store, config);

    match &args.target {
        SuggestTarget::Visitor { id } => {
            let visitor = PostulationId::new(id.as_str());
            let suggestions = block_on(engine.suggest_hosts_for_visitor(&visitor))??;
            if format_json(format) {
                println!("{}", serde_json::to_string_pretty(&suggestions)?);
                return Ok(());
            }
            let rows: Vec<Row<'_>> = suggestions
                .iter()
                .map(|s| Row {
                    visitor: visitor.as_str(),
                    host: s.host.id.as_str(),
                    people: None,
                    places: s.host.as_host().map(|h| h.remaining_capacity),
                    score: s.score.total,
                    fit: s.score.fit.to_string(),
                    explanation: &s.explanation,
                })
                .collect();
            print_rows(&rows, format, args.explain, &format!("hosts for visitor {visitor}"));
        }
        SuggestTarget::Host { id } => {
            let host = PostulationId::new(id.as_str());
            let suggestions = block_on(engine.suggest_visitors_for_host(&host))??;
            if format_json(format) {
                println!("{}", serde_json::to_string_pretty(&suggestions)?);
                return Ok(());
            }
            let rows: Vec<Row<'_>> = suggestions
                .iter()
                .map(|s| Row {
                    visitor: s.visitor.id.as_str(),
                    host: host.as_str(),
                    people: s.visitor.as_visitor().map(|v| v.people_count),
                    places: None,
                    score: s.score.total,
                    fit: s.score.fit.to_string(),
                    explanation: &s.explanation,
                })
                .collect();
            print_rows(&rows, format, args.explain, &format!("visitors for host {host}"));
        }
        SuggestTarget::Event { id } => {
            let event = EventId::new(id.as_str());
            let pairs = block_on(engine.suggest_for_event(&event))??;
            if format_json(format) {
                println!("{}", serde_json::to_string_pretty(&pairs)?);
                return Ok(());
            }
            let rows: Vec<Row<'_>> = pairs.iter().map(pair_row).collect();
            print_rows(&rows, format, args.explain, &format!("pairs for event {event}"));
        }
    }

    Ok(())
}

fn format_json(format: OutputFormat) -> bool {
    matches!(format, OutputFormat::Json)
}

fn pair_row(pair: &PairSuggestion) -> Row<'_> {
    Row {
        visitor: pair.visitor.id.as_str(),
        host: pair.host.id.as_str(),
        people: pair.visitor.as_visitor().map(|v| v.people_count),
        places: pair.host.as_host().map(|h| h.remaining_capacity),
        score: pair.score.total,
        fit: pair.score.fit.to_string(),
        explanation: &pair.explanation,
    }
}

fn print_rows(rows: &[Row<'_>], format: OutputFormat, explain: bool, title: &str) {
    if rows.is_empty() {
        eprintln!("No suggestions found.");
        return;
    }

    match format {
        OutputFormat::Tsv => {
            println!("rank\tvisitor\thost\tpeople\tplaces_left\tscore\tfit");
            for (i, row) in rows.iter().enumerate() {
                println!(
                    "{}\t{}\t{}\t{}\t{}\t{}\t{}",
                    i + 1,
                    row.visitor,
                    row.host,
                    row.people.map_or_else(String::new, |p| p.to_string()),
                    row.places.map_or_else(String::new, |p| p.to_string()),
                    row.score,
                    row.fit
                );
            }
        }
        OutputFormat::Text | OutputFormat::Json => {
            println!("Top {} {title}:", rows.len());
            println!();
            for (i, row) in rows.iter().enumerate() {
                let mut line = format!(
                    "#{} {} -> {}  score {} ({})",
                    i + 1,
                    row.visitor,
                    row.host,
                    row.score,
                    row.fit
                );
                if let Some(people) = row.people {
                    line.push_str(&format!(", {people} people"));
                }
                if let Some(places) = row.places {
                    line.push_str(&format!(", {places} places left"));
                }
                println!("{line}");
                if explain {
                    print_explanation(row.explanation);
                    println!();
                }
            }
        }
    }
}
