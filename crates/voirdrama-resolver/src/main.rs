//! Command-line front end for the VoirDrama resolver.
//!
//! Each subcommand runs one resolver operation and prints the result as
//! pretty JSON on stdout, with logs going to stderr or the log file.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use shared::Config;
use std::path::PathBuf;
use tracing::info;
use voirdrama_resolver::{CatalogView, DramaResolver, ListingOrder};

#[derive(Parser)]
#[command(name = "voirdrama-resolver")]
#[command(about = "Resolve VoirDrama catalogs, series and streams")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List a catalog page
    Catalog {
        /// Which catalog to list
        #[arg(long, value_enum, default_value = "recent")]
        kind: CatalogKind,

        /// Number of leading entries to skip
        #[arg(long, default_value_t = 0)]
        skip: u32,

        /// Full-text search instead of a listing
        #[arg(long)]
        search: Option<String>,
    },
    /// Fetch one series with its episode list
    Meta {
        /// Series id, either voirdrama:{slug} or an IMDb id
        id: String,
    },
    /// Resolve the streams of one episode
    Streams {
        /// Video id of the form voirdrama:{series}:{episode}
        id: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CatalogKind {
    /// Most recently updated series
    Recent,
    /// Series still airing
    Ongoing,
    /// The site's default listing order
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load_or_default(&args.config);
    if args.verbose {
        config.logging.default_level = "debug".to_string();
    }

    shared::logging::init("voirdrama-resolver", &config.logging, &config.log_dir())?;

    info!(
        base_url = %config.upstream.base_url,
        cache_dir = %config.cache_dir().display(),
        "VoirDrama resolver starting"
    );

    let resolver = DramaResolver::from_config(&config)?;

    match args.command {
        Command::Catalog { kind, skip, search } => {
            let view = match search {
                Some(query) => CatalogView::Search { query },
                None => match kind {
                    CatalogKind::Recent => CatalogView::Paged {
                        skip,
                        order: ListingOrder::Newest,
                    },
                    CatalogKind::All => CatalogView::Paged {
                        skip,
                        order: ListingOrder::Default,
                    },
                    CatalogKind::Ongoing => CatalogView::Ongoing { skip },
                },
            };
            let entries = resolver.catalog(view).await;
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        Command::Meta { id } => {
            let detail = resolver.series_detail(&id).await;
            if detail.is_none() {
                info!(id = %id, "No series found");
            }
            println!("{}", serde_json::to_string_pretty(&detail)?);
        }
        Command::Streams { id } => {
            let streams = resolver.streams(&id).await;
            println!("{}", serde_json::to_string_pretty(&streams)?);
        }
    }

    Ok(())
}
