use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use geo_owl::adapters::intake::{
    parse_closed_teams, parse_room_list, parse_shuffle_input, read_census, read_patients,
};
use geo_owl::app::report::{render_placement, render_redistribution, render_shuffle};
use geo_owl::core::placer::analyze_shuffle;
use geo_owl::domain::placement::{Census, PlacementRules};
use geo_owl::utils::logger;
use geo_owl::utils::validation::Validate;
use geo_owl::{Placer, TomlConfig};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "geo-placer")]
#[command(about = "Recommend team assignments by geography and census balance")]
struct Args {
    /// CSV with `team,census` columns (NA/X marks a closed team)
    #[arg(long)]
    census: Option<PathBuf>,

    /// Patient locations, one per line (reads stdin when omitted)
    #[arg(long)]
    patients: Option<PathBuf>,

    /// T-list distribution: empty census, no duplicate filtering
    #[arg(long)]
    quick: bool,

    /// TOML configuration providing [placement] thresholds
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Find patients on non-geographic teams (`<room> [Med] <team>` per line)
    Shuffle {
        /// Input file (reads stdin when omitted)
        #[arg(long)]
        input: Option<PathBuf>,

        /// Closed teams, comma-separated
        #[arg(long, default_value = "14, 15")]
        closed: String,

        /// Reassign every room by geography instead of listing mismatches
        /// (one room per line, current team optional)
        #[arg(long)]
        redistribute: bool,
    },
}

fn open_input(path: Option<&Path>) -> Result<Box<dyn BufRead>> {
    match path {
        Some(path) => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(std::io::stdin()))),
    }
}

fn load_rules(config: Option<&Path>) -> Result<PlacementRules> {
    let config = match config {
        Some(path) => TomlConfig::from_file(path)
            .with_context(|| format!("Failed to load config file '{}'", path.display()))?,
        None => TomlConfig::default(),
    };
    config.validate().context("Invalid configuration")?;
    Ok(config.placement_rules())
}

fn run_placement(args: &Args) -> Result<()> {
    let rules = load_rules(args.config.as_deref())?;

    let census = match (&args.census, args.quick) {
        (Some(_), true) => {
            tracing::warn!("--quick ignores the census file");
            Census::new()
        }
        (Some(path), false) => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("Failed to open census {}", path.display()))?;
            read_census(file).with_context(|| format!("Invalid census {}", path.display()))?
        }
        (None, _) => Census::new(),
    };

    let list = read_patients(open_input(args.patients.as_deref())?, !args.quick)
        .context("Failed to read patient list")?;
    if !list.duplicates.is_empty() {
        tracing::warn!("⚠️  Skipped {} duplicate(s)", list.duplicates.len());
    }
    if list.patients.is_empty() {
        tracing::info!("No patients entered. Exiting.");
        return Ok(());
    }

    tracing::info!("Placing {} patient(s)", list.patients.len());
    let outcome = Placer::new(rules).optimize(&list.patients, &census);

    match args.format {
        OutputFormat::Text => print!("{}", render_placement(&outcome, &rules)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
    }
    Ok(())
}

fn read_text(input: Option<&Path>) -> Result<String> {
    let mut text = String::new();
    open_input(input)?
        .read_to_string(&mut text)
        .context("Failed to read shuffle input")?;
    Ok(text)
}

fn run_redistribution(args: &Args, input: Option<&Path>, closed: &str) -> Result<()> {
    let rules = load_rules(args.config.as_deref())?;
    let text = read_text(input)?;

    let closed = parse_closed_teams(closed);
    let (entries, warnings) = parse_room_list(&text);
    for warning in &warnings {
        tracing::warn!("{}", warning);
    }
    tracing::info!("Redistributing {} rooms", entries.len());

    let plan = Placer::new(rules).redistribute(&entries, &closed);
    match args.format {
        OutputFormat::Text => print!("{}", render_redistribution(&plan, &closed)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
    }
    Ok(())
}

fn run_shuffle(input: Option<&Path>, closed: &str, format: OutputFormat) -> Result<()> {
    let text = read_text(input)?;

    let closed = parse_closed_teams(closed);
    let parsed = parse_shuffle_input(&text);
    for warning in &parsed.warnings {
        tracing::warn!("{}", warning);
    }
    tracing::info!("Parsed {} patients", parsed.patients.len());

    let analysis = analyze_shuffle(&parsed.patients, &closed);
    match format {
        OutputFormat::Text => print!("{}", render_shuffle(&analysis, &closed)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&analysis)?),
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    match &args.command {
        Some(Command::Shuffle {
            input,
            closed,
            redistribute: true,
        }) => run_redistribution(&args, input.as_deref(), closed),
        Some(Command::Shuffle { input, closed, .. }) => {
            run_shuffle(input.as_deref(), closed, args.format)
        }
        None => run_placement(&args),
    }
}
