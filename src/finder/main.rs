use anyhow::{Context, Result};
use clap::Parser;
use feature_finder::config::{DistanceStrategy, EXPANDED_MAX_RESULTS, MatchConfig};
use feature_finder::engine::FeatureMatcher;
use feature_finder::format::format_matches;
use feature_finder::ingest::{self, discovery};
use feature_finder::tag_filter::{TagMatchStrategy, TagQuery};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Parser, Debug)]
#[command(author, version, about = "Find OSM and Overture features describing the same place", long_about = None)]
struct Args {
    /// Tag values to look for, e.g. `airport aerodrome`
    #[arg(required = true)]
    tags: Vec<String>,

    /// Only keep features whose name contains this text (case-insensitive)
    #[arg(long)]
    name: Option<String>,

    /// Return ten times as many matches
    #[arg(long = "10x")]
    ten_x: bool,

    /// Directory holding the `*-Transect.osm.pbf` and `*-Transect.parquet` extracts
    #[arg(long, env = "FEATURE_FINDER_DATA_DIR", default_value = "data/sources")]
    data_dir: PathBuf,

    /// Seed the sampler for reproducible output
    #[arg(long, env = "FEATURE_FINDER_SEED")]
    seed: Option<u64>,

    /// Measure every pair in its own UTM zone instead of using the Web Mercator index
    #[arg(long)]
    precise: bool,

    /// Compare OSM values exactly, without stripping embedded `key=` prefixes
    #[arg(long)]
    strict_tags: bool,

    /// Worker threads for ingestion and matching
    #[arg(long)]
    threads: Option<usize>,

    /// RON file with matching parameters
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Args {
    fn match_config(&self) -> Result<MatchConfig> {
        let mut config = match &self.config {
            Some(path) => MatchConfig::load(path)
                .with_context(|| format!("Config: failed to load {}", path.display()))?,
            None => MatchConfig::default(),
        };

        if self.ten_x {
            config.max_results = EXPANDED_MAX_RESULTS;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.precise {
            config.distance_strategy = DistanceStrategy::UtmExhaustive;
        }
        if self.strict_tags {
            config.tag_match = TagMatchStrategy::Exact;
        }

        Ok(config)
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::Level::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to initialize thread pool")?;
    }

    let config = args.match_config()?;
    let query = TagQuery::new(&args.tags)
        .with_name(args.name.clone())
        .with_strategy(config.tag_match);

    let sources = discovery::discover(&args.data_dir)
        .with_context(|| format!("Looking for transect extracts in {}", args.data_dir.display()))?;
    info!(
        "Found {} OSM and {} Overture extracts in {}",
        sources.osm.len(),
        sources.overture.len(),
        args.data_dir.display()
    );

    let start = Instant::now();
    let osm_features = ingest::ingest(&ingest::osm_units(&sources.osm), &query);
    let overture_features = ingest::ingest(&ingest::overture_units(&sources.overture), &query);
    info!(
        "Found {} OSM features and {} Overture features in {:?}",
        osm_features.len(),
        overture_features.len(),
        start.elapsed()
    );

    let matcher = FeatureMatcher::new(config);
    let matches = matcher.run(&osm_features, &overture_features);

    println!(
        "{}",
        format_matches(&matches, matcher.config().threshold_km())
    );

    Ok(())
}
