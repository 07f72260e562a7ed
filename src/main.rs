use anyhow::Result;
use aptscout::db;
use aptscout::fetch::PageFetcher;
use aptscout::geocoding::Nominatim;
use aptscout::pipeline::{run_source, ApartmentSource, RunOptions};
use aptscout::sources::{CpmSource, JsmSource};
use clap::Parser;
use std::time::Duration;
use tracing::error;

#[derive(Parser, Debug)]
#[command(author, version, about = "Aptscout - apartment listing scraper")]
struct Args {
    /// Path to the SQLite database file
    #[arg(short, long, default_value = "apartments.db")]
    database: String,

    /// Keep the existing database instead of resetting it
    /// (re-running without a reset duplicates agency data)
    #[arg(long)]
    keep_db: bool,

    /// Maximum number of apartments to scrape per site
    #[arg(short = 'i', long)]
    max_items: Option<usize>,

    /// Delay between detail-page fetches, in milliseconds
    #[arg(long, default_value = "500")]
    fetch_delay_ms: u64,

    /// Skip the CPM scraper
    #[arg(long)]
    skip_cpm: bool,

    /// Skip the JSM scraper
    #[arg(long)]
    skip_jsm: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let conn = if args.keep_db {
        let conn = db::connect(&args.database)?;
        db::init_schema(&conn)?;
        conn
    } else {
        db::create(&args.database)?
    };

    let fetcher = PageFetcher::new()?;
    let mut geocoder = Nominatim::new()?;
    let options = RunOptions {
        max_items: args.max_items,
        fetch_delay: Duration::from_millis(args.fetch_delay_ms),
    };

    let mut sources: Vec<Box<dyn ApartmentSource>> = Vec::new();
    if !args.skip_cpm {
        sources.push(Box::new(CpmSource));
    }
    if !args.skip_jsm {
        sources.push(Box::new(JsmSource));
    }

    let mut total = 0usize;
    let mut failed = 0usize;
    for source in &sources {
        // Site runs are independent: a failure here leaves earlier sites'
        // committed data in place and moves on.
        match run_source(source.as_ref(), &fetcher, &mut geocoder, &options) {
            Ok(run) => {
                let count = run.apartments.len();
                db::store_run(&conn, &run)?;
                println!("{}: stored {} apartments", source.name(), count);
                total += count;
            }
            Err(e) => {
                error!(source = source.name(), error = %e, "site run failed");
                failed += 1;
            }
        }
    }

    println!("\n=== Summary ===");
    println!("Total apartments stored: {}", total);
    if failed > 0 {
        println!("Failed site runs: {}", failed);
    }
    println!("Database: {}", args.database);

    Ok(())
}
