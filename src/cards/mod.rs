pub mod gradient;
pub mod pages;
pub mod qr;
pub mod render;

use std::fmt;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use qrcode::EcLevel;
use rand::Rng;
use serde::Serialize;
use tracing::info;

use crate::error::{DeckError, DeckResult};
use crate::records::CardRow;
use crate::util::{progress_bar, sanitize_dir_name, timestamp};
use gradient::Gradient;
use render::PageRenderer;

/// A persisted row plus the assets derived for this render only.
#[derive(Debug, Clone, Serialize)]
pub struct CardView {
    pub serial_number: String,
    pub artist: String,
    pub song_name: String,
    pub year: String,
    pub spotify_url: String,
    pub gradient: String,
    pub qr_data_uri: String,
}

impl CardView {
    pub fn build<R: Rng + ?Sized>(row: CardRow, ec_level: EcLevel, rng: &mut R) -> DeckResult<Self> {
        let qr_data_uri = qr::qr_data_uri(&row.spotify_url, ec_level)?;
        Ok(Self {
            gradient: Gradient::random(rng).to_css(),
            qr_data_uri,
            serial_number: row.serial_number,
            artist: row.artist,
            song_name: row.song_name,
            year: row.year,
            spotify_url: row.spotify_url,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateOutcome {
    NothingToGenerate,
    Generated {
        tracks: usize,
        pages: usize,
        dir: PathBuf,
    },
}

impl fmt::Display for GenerateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NothingToGenerate => f.write_str("No tracks to generate."),
            Self::Generated { tracks, pages, dir } => write!(
                f,
                "{} tracks across {} pages, saved in {}",
                tracks,
                pages,
                dir.display()
            ),
        }
    }
}

/// `<root>/<timestamp>_<name>` with reserved characters replaced.
pub fn output_dir(root: &Path, name: &str, now: DateTime<Local>) -> PathBuf {
    root.join(format!("{}_{}", timestamp(now), sanitize_dir_name(name)))
}

pub fn front_file_name(page_number: usize) -> String {
    format!("cards_front_page{page_number}.html")
}

pub fn back_file_name(page_number: usize) -> String {
    format!("cards_back_page{page_number}.html")
}

pub struct CardJob<'a> {
    pub renderer: &'a PageRenderer,
    pub capacity: NonZeroUsize,
    pub ec_level: EcLevel,
    pub out_dir: &'a Path,
}

impl CardJob<'_> {
    /// Partition `rows` into pages and write a front/back document pair per page.
    pub fn run<R: Rng + ?Sized>(&self, rows: Vec<CardRow>, rng: &mut R) -> DeckResult<GenerateOutcome> {
        let cards = rows
            .into_iter()
            .map(|row| CardView::build(row, self.ec_level, &mut *rng))
            .collect::<DeckResult<Vec<_>>>()?;

        let pages = pages::partition(&cards, self.capacity);
        if pages.is_empty() {
            info!("No tracks found, nothing to generate");
            return Ok(GenerateOutcome::NothingToGenerate);
        }

        fs::create_dir_all(self.out_dir).map_err(|e| DeckError::io(self.out_dir, e))?;

        let total = pages.len();
        let pb = progress_bar(total);
        pb.set_message("rendering pages");
        for (i, page) in pages.into_iter().enumerate() {
            let number = i + 1;
            let rendered = self.renderer.render(page, number, total)?;
            self.write(&front_file_name(number), &rendered.front)?;
            self.write(&back_file_name(number), &rendered.back)?;
            info!("Generated page {}/{} ({} cards)", number, total, page.len());
            pb.inc(1);
        }
        pb.finish_and_clear();

        Ok(GenerateOutcome::Generated {
            tracks: cards.len(),
            pages: total,
            dir: self.out_dir.to_path_buf(),
        })
    }

    fn write(&self, file_name: &str, markup: &str) -> DeckResult<()> {
        let path = self.out_dir.join(file_name);
        fs::write(&path, markup).map_err(|e| DeckError::io(path, e))
    }
}
