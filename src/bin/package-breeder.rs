use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use package_breeder::{Breeder, BreederError, EnsureOutcome};
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Build nests (chroot environments) for species and hatch eggs from genomes
#[derive(Parser)]
#[command(name = "package-breeder", version, about, long_about = None)]
struct Cli {
    /// Base directory to work on
    base_dir: PathBuf,

    /// Enable debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available species (distributions and their architecture)
    Species {
        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build a nest for a given specie, replacing any existing one
    BuildNest {
        /// Specie name from species.yaml
        specie: String,
    },

    /// Build nests for all species which do not have one already
    BuildNests,

    /// Hatch an egg for a given specie using a given genome (build a package)
    HatchAnEgg {
        /// Specie name from species.yaml
        specie: String,

        /// Genome file; bare names are looked up in BASEDIR/genomes
        genome: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("ERROR: {err:#}. Aborting.");
            if let Some(BreederError::UnknownTarget(_)) = err.downcast_ref::<BreederError>() {
                let _ = Cli::command().write_help(&mut io::stderr());
            }
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let breeder = Breeder::open(&cli.base_dir)?;

    match &cli.command {
        Commands::Species { json } => list_species(&breeder, *json),
        Commands::BuildNest { specie } => build_nest(&breeder, specie),
        Commands::BuildNests => build_nests(&breeder),
        Commands::HatchAnEgg { specie, genome } => hatch_an_egg(&breeder, specie, genome),
    }
}

fn list_species(breeder: &Breeder, json: bool) -> Result<()> {
    if breeder.catalog().is_empty() {
        warn!(
            "No species defined in {}",
            breeder.nests().layout().species_file().display()
        );
    }

    let listing = breeder.species();
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&listing).context("serializing species listing")?
        );
        return Ok(());
    }

    for status in &listing {
        println!("{status}");
        println!();
    }
    Ok(())
}

fn build_nest(breeder: &Breeder, specie: &str) -> Result<()> {
    let nest = breeder
        .build_nest(specie)
        .with_context(|| format!("building nest for '{specie}'"))?;
    println!("[nest:{specie}] built {}", nest.built());
    Ok(())
}

fn build_nests(breeder: &Breeder) -> Result<()> {
    for outcome in breeder.build_nests().context("building nests")? {
        let nest = outcome.nest();
        let name = nest.specie().name();
        match &outcome {
            EnsureOutcome::AlreadyBuilt(_) => {
                println!("[nest:{name}] already built {}", nest.built())
            }
            EnsureOutcome::BuiltNow(_) => println!("[nest:{name}] built {}", nest.built()),
        }
    }
    Ok(())
}

fn hatch_an_egg(breeder: &Breeder, specie: &str, genome: &str) -> Result<()> {
    let hatching = breeder
        .hatch_an_egg(specie, genome)
        .with_context(|| format!("hatching '{genome}' for '{specie}'"))?;

    println!(
        "[egg:{}-{}] nest for '{}' built {} at {}",
        hatching.genome.name,
        hatching.genome.version,
        hatching.specie.name(),
        hatching.nest.built(),
        hatching.image.display()
    );
    warn!("Hatching eggs is not implemented yet; no package was built");
    Ok(())
}
