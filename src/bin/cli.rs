//! seabed CLI - Debug tool for station association and map aggregation
//!
//! Usage:
//!   seabed-cli contains <lat> <lon> <feature.json>
//!   seabed-cli distance <lat1> <lon1> <lat2> <lon2>
//!   seabed-cli associate <dataset.json> [--output <file>] [--db <sqlite>]
//!   seabed-cli tree <dataset.json> [filter flags] [--pretty]
//!   seabed-cli analytics <dataset.json> --block <id>
//!
//! Datasets are JSON snapshots of every entity collection. Logging goes to
//! stderr and honours `RUST_LOG`; results go to stdout.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use seabed::{
    geometry::{distance_km, try_contains_point},
    CacheConfig, Dataset, Gazetteer, InMemoryStore, MapFilter, SeabedEngine,
};

#[derive(Parser)]
#[command(name = "seabed-cli")]
#[command(about = "Debug tool for station association and map aggregation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON file overriding the cache tier settings
    #[arg(long, global = true)]
    cache_config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Test whether a point lies inside a GeoJSON polygon feature
    Contains {
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        #[arg(allow_negative_numbers = true)]
        lon: f64,
        /// File containing a GeoJSON Feature with Polygon geometry
        feature: PathBuf,
    },

    /// Great-circle distance between two points in kilometres
    Distance {
        #[arg(allow_negative_numbers = true)]
        lat1: f64,
        #[arg(allow_negative_numbers = true)]
        lon1: f64,
        #[arg(allow_negative_numbers = true)]
        lat2: f64,
        #[arg(allow_negative_numbers = true)]
        lon2: f64,
    },

    /// Assign every station to the block containing it
    Associate {
        /// Dataset JSON file
        dataset: PathBuf,

        /// Write the updated dataset to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Run against a SQLite database seeded from the dataset
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Print the filtered contractor and cruise tree
    Tree {
        /// Dataset JSON file
        dataset: PathBuf,

        #[arg(long)]
        contractor: Option<i64>,

        #[arg(long)]
        contract_type: Option<i64>,

        #[arg(long)]
        contract_status: Option<i64>,

        #[arg(long)]
        sponsoring_state: Option<String>,

        #[arg(long)]
        year: Option<i32>,

        #[arg(long)]
        cruise: Option<i64>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Print analytics for one block
    Analytics {
        /// Dataset JSON file
        dataset: PathBuf,

        /// Block id
        #[arg(long)]
        block: i64,
    },

    /// Write a deterministic synthetic dataset
    #[cfg(feature = "synthetic")]
    Generate {
        /// Output dataset JSON file
        output: PathBuf,

        /// Approximate number of stations
        #[arg(long, default_value = "120")]
        stations: usize,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();

    let result = match cli.command {
        Commands::Contains { lat, lon, feature } => run_contains(lat, lon, &feature),
        Commands::Distance {
            lat1,
            lon1,
            lat2,
            lon2,
        } => {
            println!("{:.3}", distance_km(lat1, lon1, lat2, lon2));
            Ok(())
        }
        Commands::Associate {
            dataset,
            output,
            db,
        } => match db {
            #[cfg(feature = "persistence")]
            Some(db) => run_associate_sqlite(&dataset, &db, output.as_deref()),
            #[cfg(not(feature = "persistence"))]
            Some(_) => Err(seabed::SeabedError::Storage(
                "built without the persistence feature".to_string(),
            )),
            None => run_associate(&dataset, output.as_deref()),
        },
        Commands::Tree {
            dataset,
            contractor,
            contract_type,
            contract_status,
            sponsoring_state,
            year,
            cruise,
            pretty,
        } => {
            let filter = MapFilter {
                contractor_id: contractor,
                contract_type_id: contract_type,
                contract_status_id: contract_status,
                sponsoring_state,
                year,
                cruise_id: cruise,
            };
            run_tree(&dataset, &filter, pretty, cli.cache_config.as_deref())
        }
        Commands::Analytics { dataset, block } => {
            run_analytics(&dataset, block, cli.cache_config.as_deref())
        }
        #[cfg(feature = "synthetic")]
        Commands::Generate {
            output,
            stations,
            seed,
        } => run_generate(&output, stations, seed),
    };

    exit_on_error(result);
}

fn exit_on_error(result: seabed::Result<()>) {
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_cache_config(path: Option<&Path>) -> seabed::Result<CacheConfig> {
    match path {
        Some(path) => Ok(serde_json::from_str(&fs::read_to_string(path)?)?),
        None => Ok(CacheConfig::default()),
    }
}

fn load_engine(
    dataset: &Path,
    cache_config: Option<&Path>,
) -> seabed::Result<SeabedEngine<InMemoryStore>> {
    let data = Dataset::from_json_file(dataset)?;
    let store = Arc::new(InMemoryStore::from_dataset(data)?);
    let config = load_cache_config(cache_config)?;
    Ok(SeabedEngine::with_config(store, &config, Gazetteer::default()))
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> seabed::Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json);
    Ok(())
}

fn run_contains(lat: f64, lon: f64, feature: &Path) -> seabed::Result<()> {
    let doc = fs::read_to_string(feature)?;
    match try_contains_point(lat, lon, &doc) {
        Ok(inside) => println!("{}", inside),
        Err(e) => {
            // Unreadable boundaries never contain anything
            eprintln!("  [WARN] {}: {}", feature.display(), e);
            println!("false");
        }
    }
    Ok(())
}

fn print_association_header(dataset: &Path) {
    println!("\n{}", "=".repeat(60));
    println!("Associating stations from: {}", dataset.display());
    println!("{}", "=".repeat(60));
}

fn print_report(report: &seabed::AssociationReport) {
    println!("  Stations examined:   {}", report.stations_examined);
    println!("  Stations matched:    {}", report.stations_matched);
    println!("  Stations unmatched:  {}", report.stations_unmatched);
    println!("  Blocks considered:   {}", report.blocks_considered);
    println!("  Invalid boundaries:  {}", report.invalid_boundaries);
    println!("  Updates saved:       {}", report.updates_saved);
    println!("  Elapsed:             {}ms", report.elapsed_ms);
}

fn run_associate(dataset: &Path, output: Option<&Path>) -> seabed::Result<()> {
    print_association_header(dataset);
    let engine = load_engine(dataset, None)?;
    let report = engine.associate_all_stations_report()?;
    print_report(&report);

    if let Some(output) = output {
        engine.store().snapshot().write_json_file(output)?;
        println!("\nWrote {}", output.display());
    }
    Ok(())
}

#[cfg(feature = "persistence")]
fn run_associate_sqlite(dataset: &Path, db: &Path, output: Option<&Path>) -> seabed::Result<()> {
    use seabed::SqliteEntityStore;

    print_association_header(dataset);
    let store = Arc::new(SqliteEntityStore::open(db)?);
    store.import(&Dataset::from_json_file(dataset)?)?;
    println!("  Seeded database:     {}", db.display());

    let engine = SeabedEngine::new(Arc::clone(&store));
    let report = engine.associate_all_stations_report()?;
    print_report(&report);

    if let Some(output) = output {
        store.export()?.write_json_file(output)?;
        println!("\nWrote {}", output.display());
    }
    Ok(())
}

fn run_tree(
    dataset: &Path,
    filter: &MapFilter,
    pretty: bool,
    cache_config: Option<&Path>,
) -> seabed::Result<()> {
    let engine = load_engine(dataset, cache_config)?;
    let tree = engine.get_filtered_tree(filter)?;
    log::info!(
        "{} contractors, {} cruises, {} stations",
        tree.contractors.len(),
        tree.cruises.len(),
        tree.station_count()
    );
    print_json(tree.as_ref(), pretty)
}

fn run_analytics(dataset: &Path, block: i64, cache_config: Option<&Path>) -> seabed::Result<()> {
    let engine = load_engine(dataset, cache_config)?;
    match engine.get_block_analytics(block)? {
        Some(analytics) => print_json(&analytics, true),
        None => {
            eprintln!("Block {} not found", block);
            std::process::exit(2);
        }
    }
}

#[cfg(feature = "synthetic")]
fn run_generate(output: &Path, stations: usize, seed: u64) -> seabed::Result<()> {
    use seabed::synthetic::SyntheticScenario;

    let scenario = SyntheticScenario {
        seed,
        ..SyntheticScenario::with_station_count(stations)
    };
    let synthetic = scenario.generate();
    synthetic.dataset.write_json_file(output)?;
    println!(
        "Wrote {} blocks and {} stations to {}",
        synthetic.dataset.blocks.len(),
        synthetic.dataset.stations.len(),
        output.display()
    );
    Ok(())
}
