//! # Delve Command Line
//!
//! Generates floors as JSON and reports encounter statistics for content tuning.

use clap::{Parser, Subcommand};
use delve::{
    collect_statistics, utils, DelveError, DelveResult, EncounterLibrary, FloorGenerator, GenerationConfig,
    Generator, MonsterLibrary, PartyConfig,
};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

/// Command line arguments for Delve.
#[derive(Parser, Debug)]
#[command(name = "delve")]
#[command(about = "Procedural dungeon floors with encounters scaled to your party")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Encounter library JSON replacing the bundled content
    #[arg(long, global = true)]
    encounters: Option<PathBuf>,

    /// Monster roster JSON replacing the bundled content
    #[arg(long, global = true)]
    monsters: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate one floor and print it as JSON
    Generate {
        #[command(flatten)]
        overrides: ConfigOverrides,

        /// Write the floor here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Generate many floors per level and tally the encounters drawn
    Stats {
        #[command(flatten)]
        overrides: ConfigOverrides,

        /// Floors generated per level
        #[arg(long, default_value_t = 100)]
        runs: usize,

        /// Report floors 1 through this one, with the party level matching the floor
        #[arg(long, default_value_t = 4)]
        floors: u32,
    },
}

/// Generation settings layered over `--config` or the defaults.
#[derive(clap::Args, Debug)]
struct ConfigOverrides {
    /// GenerationConfig JSON file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Random seed for floor generation
    #[arg(short, long)]
    seed: Option<u64>,

    /// Layers per floor, boss included
    #[arg(long)]
    layers: Option<usize>,

    /// Floor number
    #[arg(long)]
    floor: Option<u32>,

    /// Number of characters in the party
    #[arg(long)]
    party_size: Option<u32>,

    /// Average party level
    #[arg(long)]
    party_level: Option<u8>,
}

impl ConfigOverrides {
    fn resolve(&self) -> DelveResult<GenerationConfig> {
        let mut config = match &self.config {
            Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
            None => GenerationConfig::default(),
        };
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(layers) = self.layers {
            config.layers_per_floor = layers;
        }
        if let Some(floor) = self.floor {
            config.current_floor = floor;
        }
        config.party = PartyConfig::new(
            self.party_size.unwrap_or(config.party.size),
            self.party_level.unwrap_or(config.party.average_level),
        );
        config.validate()?;
        Ok(config)
    }
}

fn main() -> DelveResult<()> {
    let args = Args::parse();

    initialize_logging(&args.log_level)?;

    info!("Starting Delve v{}", delve::VERSION);

    let encounters = load_encounters(args.encounters.as_deref())?;
    let monsters = load_monsters(args.monsters.as_deref())?;
    let generator = FloorGenerator::new(&encounters, &monsters);

    match &args.command {
        Command::Generate {
            overrides,
            output,
            pretty,
        } => {
            let config = overrides.resolve()?;
            let mut rng = utils::create_rng(&config);
            let map = generator.generate(&config, &mut rng)?;
            let json = if *pretty {
                serde_json::to_string_pretty(&map)?
            } else {
                serde_json::to_string(&map)?
            };
            match output {
                Some(path) => {
                    fs::write(path, json)?;
                    info!("Wrote floor {} to {}", map.current_floor, path.display());
                }
                None => println!("{json}"),
            }
        }
        Command::Stats {
            overrides,
            runs,
            floors,
        } => {
            let base = overrides.resolve()?;
            for floor in 1..=*floors {
                let level = u8::try_from(floor)
                    .map_err(|_| DelveError::InvalidConfig(format!("floor {floor} has no matching party level")))?;
                let config = GenerationConfig {
                    current_floor: floor,
                    party: PartyConfig::new(base.party.size, level),
                    ..base.clone()
                };
                config.validate()?;
                println!("{}", collect_statistics(&generator, &config, *runs)?);
            }
        }
    }

    Ok(())
}

/// Initializes the logging system based on the specified log level.
///
/// `RUST_LOG` takes precedence when set.
fn initialize_logging(log_level: &str) -> DelveResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_target(false)
        .try_init()
        .map_err(|e| DelveError::InvalidState(format!("Failed to initialize logging: {e}")))
}

fn load_encounters(path: Option<&Path>) -> DelveResult<EncounterLibrary> {
    let library = match path {
        Some(path) => EncounterLibrary::from_path(path)?,
        None => EncounterLibrary::builtin()?,
    };
    info!("Loaded {} encounters", library.len());
    Ok(library)
}

fn load_monsters(path: Option<&Path>) -> DelveResult<MonsterLibrary> {
    let library = match path {
        Some(path) => MonsterLibrary::from_path(path)?,
        None => MonsterLibrary::builtin()?,
    };
    info!("Loaded {} monsters", library.len());
    Ok(library)
}
