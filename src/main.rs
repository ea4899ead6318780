//! Media Catalog CLI
//!
//! Scans directory trees for photos/videos into a SQLite catalog, searches
//! the catalog, and groups files into capture-time sequences.

use clap::{Parser, Subcommand};
use env_logger::Env;
use log::info;
use std::path::PathBuf;

use chrono::NaiveDate;
use media_catalog::{
    config, detect_sequences, scan_into_catalog, Catalog, DateRange, MediaKind, ScanConfig,
    SearchFilters, TypeFilter,
};

/// Media file cataloger
#[derive(Parser)]
#[command(name = "media_catalog")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Catalog database path (default: MEDIA_CATALOG_DB env or ./media_catalog.db)
    #[arg(short = 'd', long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a directory tree into the catalog
    Scan {
        /// Root directory to scan
        root: PathBuf,

        /// Media kinds to include: images | videos | all
        #[arg(short = 'f', long, default_value = "all")]
        filter: String,

        /// Only include files captured on or after this date (YYYY-MM-DD)
        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,

        /// Only include files captured on or before this date (YYYY-MM-DD)
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,

        /// Directory prefix to exclude (repeatable)
        #[arg(short = 'x', long = "exclude")]
        excludes: Vec<PathBuf>,

        /// Paths per emitted batch
        #[arg(short = 'b', long, default_value_t = config::DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Compute content hashes during reconciliation
        #[arg(long)]
        hash: bool,

        /// Output scan statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search the catalog
    Search {
        /// Restrict to one folder id
        #[arg(long)]
        folder: Option<i64>,

        /// Media kind: image | video | other
        #[arg(short = 'k', long)]
        kind: Option<String>,

        /// Only favorites
        #[arg(long)]
        favorite: bool,

        /// Only hidden entries
        #[arg(long)]
        hidden: bool,

        /// Tag the result must carry (repeatable, AND semantics)
        #[arg(short = 't', long = "tag")]
        tags: Vec<String>,

        /// Substring match against filename or path
        #[arg(long)]
        text: Option<String>,

        /// Maximum number of results
        #[arg(long, default_value_t = 500)]
        limit: u32,

        /// Result offset for pagination
        #[arg(long, default_value_t = 0)]
        offset: u32,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Group files into capture-time sequences
    Sequences {
        /// Files to group
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Maximum gap in seconds within one sequence
        #[arg(short = 'g', long, default_value_t = 60)]
        gap: i64,

        /// Output sequences as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let db_path = config::resolve_db_path(cli.db);

    match cli.command {
        Commands::Scan {
            root,
            filter,
            from,
            to,
            excludes,
            batch_size,
            hash,
            json,
        } => {
            let type_filter = TypeFilter::from_name(&filter)
                .ok_or_else(|| format!("unknown filter '{filter}' (use images|videos|all)"))?;

            let mut builder = ScanConfig::builder(root)
                .type_filter(type_filter)
                .excluded_prefixes(excludes)
                .batch_size(batch_size)
                .compute_hash(hash);
            if let (Some(from), Some(to)) = (from, to) {
                builder = builder.date_range(DateRange::new(from, to));
            }
            let scan_config = builder.build();

            info!("catalog: {}", db_path.display());
            let mut catalog = Catalog::open(&db_path)?;
            let stats = scan_into_catalog(&scan_config, &mut catalog)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Scan completed:");
                println!("  Folder id:      {}", stats.folder_id);
                println!("  Upserts:        {}", stats.upserts);
                println!("  Marked missing: {}", stats.missing_marked);
                println!("  Skipped:        {}", stats.skipped);
                println!("  Duration:       {}ms", stats.elapsed_ms);
            }
        }

        Commands::Search {
            folder,
            kind,
            favorite,
            hidden,
            tags,
            text,
            limit,
            offset,
            json,
        } => {
            let mut filters = SearchFilters::new();
            filters.folder_id = folder;
            filters.kind = kind.as_deref().map(MediaKind::from_str);
            filters.favorite = favorite.then_some(true);
            filters.hidden = hidden.then_some(true);
            filters.tags = tags;
            filters.text = text;
            filters.limit = limit;
            filters.offset = offset;

            let catalog = Catalog::open(&db_path)?;
            let results = catalog.search(&filters)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                for item in &results {
                    let flags = format!(
                        "{}{}{}",
                        if item.favorite { "*" } else { "" },
                        if item.hidden { "h" } else { "" },
                        if item.missing { "!" } else { "" },
                    );
                    println!("{:>6}  {:<5} {:>3}  {}", item.id, item.kind, flags, item.path);
                }
                println!("{} result(s)", results.len());
            }
        }

        Commands::Sequences { files, gap, json } => {
            let sequences = detect_sequences(&files, gap);
            if json {
                let as_strings: Vec<Vec<String>> = sequences
                    .iter()
                    .map(|s| s.iter().map(|p| p.display().to_string()).collect())
                    .collect();
                println!("{}", serde_json::to_string_pretty(&as_strings)?);
            } else {
                for (i, seq) in sequences.iter().enumerate() {
                    println!("sequence {} ({} files):", i + 1, seq.len());
                    for path in seq {
                        println!("  {}", path.display());
                    }
                }
                println!("{} sequence(s)", sequences.len());
            }
        }
    }

    Ok(())
}
