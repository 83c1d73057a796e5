mod cards;
mod catalog;
mod error;
mod fetcher;
mod locator;
mod model;
mod records;
mod settings;
mod util;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::warn;

use cards::render::PageRenderer;
use cards::CardJob;
use catalog::{CatalogApi, SpotifyClient};
use fetcher::{CancelFlag, Fetcher};
use locator::{Locator, LocatorKind};
use model::RequestSize;
use settings::Settings;

#[derive(Parser)]
#[command(name = "songdeck", about = "Printable song cards from Spotify playlists")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a playlist (or single track) and save it as CSV
    Import {
        /// Spotify playlist or track URL
        locator: String,
        /// Number of tracks to import, or "all"
        #[arg(short = 'n', long, default_value = "all")]
        count: RequestSize,
    },
    /// Render front/back card pages from an imported CSV
    Generate {
        /// CSV written by `import`
        csv: PathBuf,
        /// Output directory (default: generated_cards/<timestamp>_<name>)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Verify credentials and catalog connectivity
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;

    let result = match cli.command {
        Commands::Import { locator, count } => import(&settings, &locator, count).await,
        Commands::Generate { csv, output_dir } => generate(&settings, csv, output_dir),
        Commands::Check => {
            let client = SpotifyClient::connect(&settings).await?;
            client.ping().await.context("Catalog connection test failed")?;
            println!("Catalog connection OK.");
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", util::format_duration(elapsed));
    }

    result
}

async fn import(settings: &Settings, raw: &str, count: RequestSize) -> anyhow::Result<()> {
    let locator = Locator::parse(raw)?;
    let client = SpotifyClient::connect(settings)
        .await
        .context("Could not authenticate with Spotify")?;

    let cancel = CancelFlag::default();
    cancel_on_ctrl_c(cancel.clone());

    let run = Fetcher::new(&client, settings.batch_delay(), cancel)
        .fetch(&locator, count)
        .await;
    if run.stop.is_partial() {
        println!(
            "Stopped early ({:?}); keeping the {} tracks fetched so far.",
            run.stop,
            run.records.len()
        );
    }

    let name = match locator.kind {
        LocatorKind::Playlist => client
            .playlist_name(&locator.id)
            .await
            .unwrap_or_else(|e| {
                warn!("Could not fetch playlist name: {}", e);
                locator.id.clone()
            }),
        LocatorKind::Track => run
            .records
            .first()
            .map(|r| format!("{} - {}", r.artist, r.title))
            .unwrap_or_else(|| locator.id.clone()),
    };

    let path = records::import_path(&settings.imported_dir, count, &name, Local::now());
    records::write_records(&run.records, &path)?;
    println!(
        "{} tracks imported to {} ({} skipped).",
        run.records.len(),
        path.display(),
        run.skipped
    );
    Ok(())
}

fn generate(settings: &Settings, csv: PathBuf, output_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let renderer = PageRenderer::load(
        &settings.front_template,
        &settings.back_template,
        &settings.stylesheet,
        &settings.background,
    )
    .context("Could not load card templates")?;

    let rows = records::read_records(&csv)?;
    let out_dir = output_dir.unwrap_or_else(|| {
        cards::output_dir(
            &settings.generated_dir,
            &records::name_from_path(&csv),
            Local::now(),
        )
    });

    let job = CardJob {
        renderer: &renderer,
        capacity: settings.page_capacity,
        ec_level: settings.ec_level()?,
        out_dir: &out_dir,
    };
    let outcome = job.run(rows, &mut rand::rng())?;
    println!("{outcome}");
    Ok(())
}

/// First Ctrl-C lets the fetch loop finish its current batch and return;
/// a second one exits straight away, even mid-request or mid-backoff.
fn cancel_on_ctrl_c(cancel: CancelFlag) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("Interrupted, stopping after the current batch (Ctrl-C again to quit)");
        cancel.cancel();
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
}
