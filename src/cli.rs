//! CLI commands for artistpath

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{
    EngineConfig, SearchDefaults, DEFAULT_BUDGET, DEFAULT_MAX_RELATIONS, DEFAULT_MIN_SIMILARITY,
};
use crate::engine::Engine;
use crate::id::ArtistId;
use crate::search::{Algorithm, SearchControl, SearchParams};
use crate::server;
use crate::store::Direction;

#[derive(Parser)]
#[command(name = "artistpath")]
#[command(about = "Artist-to-artist pathfinding over the Last.fm similarity graph", long_about = None)]
pub struct Cli {
    /// Directory holding graph.fwd, graph.rev and artists.meta
    #[arg(short, long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Log output format: text or json
    #[arg(long, default_value = "text")]
    pub log_format: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Similarity floor applied to every edge, in [0, 1]
    #[arg(long, default_value_t = DEFAULT_MIN_SIMILARITY)]
    pub min_similarity: f32,

    /// Per-node fan-out cap, in [1, 250]
    #[arg(long, default_value_t = DEFAULT_MAX_RELATIONS)]
    pub max_relations: usize,

    /// Max distinct artists visited before giving up
    #[arg(long, default_value_t = DEFAULT_BUDGET)]
    pub budget: usize,

    /// bfs (fewest hops) or weighted (best similarity product)
    #[arg(long, value_enum, default_value = "bfs")]
    pub algorithm: Algorithm,
}

impl SearchArgs {
    fn params(&self) -> SearchParams {
        SearchParams {
            min_similarity: self.min_similarity,
            max_relations: self.max_relations,
            budget: self.budget,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server with OpenAPI docs
    Serve {
        /// Port to listen on (OS-assigned if omitted; the chosen port is
        /// logged at startup)
        #[arg(short, long)]
        port: Option<u16>,

        /// Number of concurrent search workers
        #[arg(long)]
        workers: Option<usize>,

        /// Wall-clock cap per search, in milliseconds
        #[arg(long)]
        deadline_ms: Option<u64>,

        #[command(flatten)]
        search: SearchArgs,
    },
    /// Find a path between two artists (names or UUIDs)
    Path {
        from: String,
        to: String,

        #[command(flatten)]
        search: SearchArgs,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Bounded neighborhood around one artist
    Explore {
        artist: String,

        /// Follow incoming edges instead of outgoing ones
        #[arg(long)]
        reverse: bool,

        #[command(flatten)]
        search: SearchArgs,

        #[arg(long)]
        json: bool,
    },
    /// Resolve a name query to artists
    Search {
        query: String,

        /// Max hits returned
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Pick a uniformly random artist
    Random,
    /// Check every store invariant: offsets, sort order, transpose
    Verify,
    /// Print store-wide counters
    Stats,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = EngineConfig::new(self.data_dir.clone());

        match self.command {
            Commands::Serve {
                port,
                workers,
                deadline_ms,
                search,
            } => {
                let config = EngineConfig {
                    defaults: SearchDefaults {
                        min_similarity: search.min_similarity,
                        max_relations: search.max_relations,
                        budget: search.budget,
                    },
                    workers: workers.unwrap_or(config.workers),
                    deadline: deadline_ms.map(Duration::from_millis),
                    ..config
                };
                server::serve(config, port).await
            }
            Commands::Path {
                from,
                to,
                search,
                json,
            } => {
                let engine = open(&config)?;
                let from = resolve(&engine, &from)?;
                let to = resolve(&engine, &to)?;
                let result = engine.find_path(
                    from,
                    to,
                    search.params(),
                    search.algorithm,
                    &SearchControl::default(),
                )?;

                if json {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                    return Ok(());
                }
                match &result.path {
                    Some(path) => {
                        println!(
                            "Path found: {} hops, {} artists visited in {} ms",
                            result.hops.unwrap_or_default(),
                            result.stats.visited,
                            result.stats.duration_ms
                        );
                        if let Some(product) = result.similarity_product {
                            println!("Similarity product: {product:.4}");
                        }
                        for (i, artist) in path.iter().enumerate() {
                            println!("  {i}. {} <{}>", artist.name, artist.url);
                        }
                    }
                    None if result.budget_exhausted => {
                        println!(
                            "No path within budget ({} artists visited); try relaxing parameters",
                            result.stats.visited
                        );
                    }
                    None => {
                        println!(
                            "No path ({} artists visited in {} ms)",
                            result.stats.visited, result.stats.duration_ms
                        );
                    }
                }
                Ok(())
            }
            Commands::Explore {
                artist,
                reverse,
                search,
                json,
            } => {
                let engine = open(&config)?;
                let root = resolve(&engine, &artist)?;
                let direction = if reverse {
                    Direction::Reverse
                } else {
                    Direction::Forward
                };
                let result = engine.explore(
                    root,
                    direction,
                    search.params(),
                    search.algorithm,
                    &SearchControl::default(),
                )?;

                if json {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                    return Ok(());
                }
                println!(
                    "{} neighborhood of {}: {} artists, {} edges in {} ms{}",
                    match direction {
                        Direction::Forward => "Forward",
                        Direction::Reverse => "Reverse",
                    },
                    result.root.name,
                    result.subgraph.nodes.len(),
                    result.subgraph.edges.len(),
                    result.stats.duration_ms,
                    if result.truncated { " (budget hit)" } else { "" }
                );
                for node in &result.subgraph.nodes {
                    match (node.depth, node.cost) {
                        (Some(depth), _) => println!("  [{depth}] {}", node.name),
                        (_, Some(cost)) => println!("  [{cost:.3}] {}", node.name),
                        _ => println!("  {}", node.name),
                    }
                }
                Ok(())
            }
            Commands::Search { query, limit } => {
                let engine = open(&config)?;
                let artists = engine.resolve_name(&query, limit)?;
                if artists.is_empty() {
                    println!("artist not found");
                    return Ok(());
                }
                for artist in artists {
                    println!("{}  {}  <{}>", artist.id, artist.name, artist.url);
                }
                Ok(())
            }
            Commands::Random => {
                let engine = open(&config)?;
                let artist = engine.random_artist()?;
                println!("{}  {}  <{}>", artist.id, artist.name, artist.url);
                Ok(())
            }
            Commands::Verify => {
                let engine = open(&config)?;
                let report = engine.verify()?;
                println!(
                    "✓ {} artists, {} forward edges, {} reverse edges",
                    report.artists, report.forward_edges, report.reverse_edges
                );
                println!("All store invariants hold.");
                Ok(())
            }
            Commands::Stats => {
                let engine = open(&config)?;
                println!("{} artists", engine.stats().artists);
                Ok(())
            }
        }
    }
}

fn open(config: &EngineConfig) -> Result<Engine> {
    Engine::open(config)
        .with_context(|| format!("failed to open store in {}", config.data_dir.display()))
}

/// Accept a raw UUID, an exact name, or fall back to the best substring
/// match.
fn resolve(engine: &Engine, input: &str) -> Result<ArtistId> {
    if let Ok(id) = input.parse::<ArtistId>() {
        return Ok(id);
    }
    let exact = engine.resolve_exact(input)?;
    if let Some(artist) = exact.first() {
        if exact.len() > 1 {
            eprintln!(
                "note: {} artists share the name {input:?}; using {}",
                exact.len(),
                artist.id
            );
        }
        return Ok(artist.id);
    }
    let close = engine.resolve_name(input, 1)?;
    match close.first() {
        Some(artist) => {
            eprintln!("note: no exact match for {input:?}; using {:?}", artist.name);
            Ok(artist.id)
        }
        None => bail!("artist not found: {input}"),
    }
}
