use std::path::Path;

use clap::Args;

use crate::cli::{block_on, open_store, OutputFormat};
use crate::core::types::PostulationId;
use crate::error::MatchError;
use crate::matching::{CompatibilityScore, Explanation};
use crate::store::PostulationStore;

#[derive(Args)]
pub struct ScoreArgs {
    /// Visitor postulation id
    pub visitor: String,

    /// Host postulation id
    pub host: String,
}

/// Execute score subcommand
///
/// # Errors
///
/// Returns an error if the data file cannot be read or either postulation
/// does not exist.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: ScoreArgs, data: &Path, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let store = open_store(data, verbose)?;
    let visitor_id = PostulationId::new(args.visitor);
    let host_id = PostulationId::new(args.host);

    let (visitor, host) = block_on(async {
        let visitor = store
            .get_postulation(&visitor_id)
            .await?
            .ok_or_else(|| MatchError::postulation_not_found(&visitor_id))?;
        let host = store
            .get_postulation(&host_id)
            .await?
            .ok_or_else(|| MatchError::postulation_not_found(&host_id))?;
        Ok::<_, MatchError>((visitor, host))
    })??;

    let score = CompatibilityScore::calculate(&visitor, &host);
    let explanation = Explanation::analyze(&visitor, &host);

    match format {
        OutputFormat::Text => {
            println!("Visitor: {}  Host: {}", visitor.id, host.id);
            println!("Score:   {}/100 ({})", score.total, score.fit);
            if let Some(reason) = &score.disqualified {
                println!("Disqualified: {reason}");
            } else {
                println!();
                print_factors(&score);
            }
            println!();
            print_explanation(&explanation);
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "visitor": visitor.id,
                "host": host.id,
                "score": score,
                "explanation": explanation,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Tsv => {
            println!("factor\tearned\tpossible");
            for factor in &score.factors {
                println!("{}\t{}\t{}", factor.factor, factor.earned, factor.possible);
            }
            println!("total\t{}\t100", score.total);
        }
    }

    Ok(())
}

fn print_factors(score: &CompatibilityScore) {
    println!("  {:<10} {:>6}", "Factor", "Points");
    for factor in &score.factors {
        if factor.possible == 0 {
            println!("  {:<10} {:>6}", factor.factor.to_string(), format!("+{}", factor.earned));
        } else {
            println!(
                "  {:<10} {:>6}",
                factor.factor.to_string(),
                format!("{}/{}", factor.earned, factor.possible)
            );
        }
    }
}

/// Print pros, cons and neutral notes, one per line
pub(crate) fn print_explanation(explanation: &Explanation) {
    for pro in &explanation.pros {
        println!("  + {pro}");
    }
    for con in &explanation.cons {
        println!("  - {con}");
    }
    for note in &explanation.neutral {
        println!("  ~ {note}");
    }
}
