use clap::Parser;
use tracing_subscriber::EnvFilter;

use lodging_matcher::{cli, web};

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("lodging_matcher=debug,info")
    } else {
        EnvFilter::new("lodging_matcher=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        cli::Commands::Suggest(args) => {
            cli::suggest::run(args, &cli.data, cli.format, cli.verbose)?;
        }
        cli::Commands::Score(args) => {
            cli::score::run(args, &cli.data, cli.format, cli.verbose)?;
        }
        cli::Commands::Match(args) => {
            cli::commit::run(args, &cli.data, cli.format, cli.verbose)?;
        }
        cli::Commands::Postulation(args) => {
            cli::postulation::run(args, &cli.data, cli.format, cli.verbose)?;
        }
        cli::Commands::Serve(args) => {
            web::server::run(args, &cli.data)?;
        }
    }

    Ok(())
}
