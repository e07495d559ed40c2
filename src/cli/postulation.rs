use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Subcommand};

use crate::cli::{block_on, open_store, OutputFormat};
use crate::core::postulation::{Application, Postulation, Role};
use crate::core::types::{EventId, PostulationId, RequesterId, RoleKind, Status};
use crate::intake;
use crate::store::{PostulationQuery, PostulationStore};

#[derive(Args)]
pub struct PostulationArgs {
    #[command(subcommand)]
    pub action: PostulationAction,
}

#[derive(Subcommand)]
pub enum PostulationAction {
    /// List postulations for an event
    List {
        /// Event id
        #[arg(long)]
        event: String,

        /// Only this role (visitor or host)
        #[arg(long)]
        role: Option<RoleKind>,

        /// Only these statuses
        #[arg(long, value_delimiter = ',')]
        status: Vec<Status>,
    },

    /// File a visitor or host postulation
    ///
    /// The file holds one JSON object tagged `"type": "visitor"` or
    /// `"type": "host"` with the role's fields.
    Apply {
        /// Event id
        #[arg(long)]
        event: String,

        /// Requester id
        #[arg(long)]
        requester: String,

        /// JSON file describing the application
        #[arg(long = "from")]
        from: PathBuf,

        /// Free-text note attached to the postulation
        #[arg(long)]
        observation: Option<String>,
    },

    /// Move a postulation to a review status
    Review {
        /// Postulation id
        id: String,

        /// New status (approved, rejected, cancelled or completed)
        #[arg(long)]
        status: Status,

        /// Reviewer note
        #[arg(long)]
        observation: Option<String>,
    },
}

/// Execute postulation subcommand
///
/// # Errors
///
/// Returns an error if the data file cannot be read or written, the
/// application file is malformed, or the store refuses the change.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(
    args: PostulationArgs,
    data: &Path,
    format: OutputFormat,
    verbose: bool,
) -> anyhow::Result<()> {
    let store = open_store(data, verbose)?;

    match args.action {
        PostulationAction::List {
            event,
            role,
            status,
        } => {
            let mut query = PostulationQuery::for_event(&EventId::new(event)).with_statuses(&status);
            if let Some(role) = role {
                query = query.with_role(role);
            }
            let postulations = block_on(store.query_postulations(&query))??;
            if postulations.is_empty() && !matches!(format, OutputFormat::Json) {
                eprintln!("No postulations found.");
                return Ok(());
            }
            print_postulations(&postulations, format)?;
        }
        PostulationAction::Apply {
            event,
            requester,
            from,
            observation,
        } => {
            let application = read_application(&from)?;
            let postulation = block_on(intake::apply(
                &store,
                &EventId::new(event),
                &RequesterId::new(requester),
                application,
                observation,
            ))??;
            print_postulation(&postulation, format, "Filed")?;
        }
        PostulationAction::Review {
            id,
            status,
            observation,
        } => {
            let postulation = block_on(intake::review(
                &store,
                &PostulationId::new(id),
                status,
                observation,
            ))??;
            print_postulation(&postulation, format, "Reviewed")?;
        }
    }

    Ok(())
}

fn read_application(path: &Path) -> anyhow::Result<Application> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse application in {}", path.display()))
}

fn print_postulation(postulation: &Postulation, format: OutputFormat, label: &str) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => println!("{label} {}", summarize(postulation)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(postulation)?),
        OutputFormat::Tsv => print_tsv(std::slice::from_ref(postulation)),
    }
    Ok(())
}

fn print_postulations(postulations: &[Postulation], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            for postulation in postulations {
                println!("{}", summarize(postulation));
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(postulations)?),
        OutputFormat::Tsv => print_tsv(postulations),
    }
    Ok(())
}

fn summarize(postulation: &Postulation) -> String {
    let detail = match &postulation.role {
        Role::Visitor(request) => format!("{} people, {}", request.people_count, request.gender),
        Role::Host(offer) => format!(
            "{}/{} places left, accepts {}",
            offer.remaining_capacity, offer.total_capacity, offer.gender_policy
        ),
    };
    format!(
        "{} [{} {}] requester {}: {detail}",
        postulation.id,
        postulation.role_kind(),
        postulation.status,
        postulation.requester_id
    )
}

fn print_tsv(postulations: &[Postulation]) {
    println!("id\tevent\trequester\trole\tstatus\tpeople\tcapacity\tremaining");
    for postulation in postulations {
        let (people, capacity, remaining) = match &postulation.role {
            Role::Visitor(request) => (request.people_count.to_string(), String::new(), String::new()),
            Role::Host(offer) => (
                String::new(),
                offer.total_capacity.to_string(),
                offer.remaining_capacity.to_string(),
            ),
        };
        println!(
            "{}\t{}\t{}\t{}\t{}\t{people}\t{capacity}\t{remaining}",
            postulation.id,
            postulation.event_id,
            postulation.requester_id,
            postulation.role_kind(),
            postulation.status
        );
    }
}
