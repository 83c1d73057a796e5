use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{DeckError, DeckResult};
use crate::model::{RequestSize, TrackRecord};
use crate::util::{progress_bar, safe_file_stem, timestamp};

pub const HEADER: [&str; 5] = ["Serial Number", "Artist", "Song Name", "Year", "Spotify URL"];
const FILE_SUFFIX: &str = "_tracks.csv";

/// A persisted record as the card stage reads it back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRow {
    #[serde(rename = "Serial Number")]
    pub serial_number: String,
    #[serde(rename = "Artist")]
    pub artist: String,
    #[serde(rename = "Song Name")]
    pub song_name: String,
    #[serde(rename = "Year")]
    pub year: String,
    #[serde(rename = "Spotify URL")]
    pub spotify_url: String,
}

/// `<root>/<timestamp>_<count>/<name>_tracks.csv`
pub fn import_path(root: &Path, size: RequestSize, playlist_name: &str, now: DateTime<Local>) -> PathBuf {
    root.join(format!("{}_{}", timestamp(now), size))
        .join(format!("{}{}", safe_file_stem(playlist_name), FILE_SUFFIX))
}

/// Playlist name recovered from a file written by [`write_records`].
pub fn name_from_path(path: &Path) -> String {
    let stem = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    stem.strip_suffix(FILE_SUFFIX)
        .or_else(|| stem.strip_suffix(".csv"))
        .unwrap_or(stem)
        .to_string()
}

/// Write the run as CSV. Refuses to replace an existing file.
pub fn write_records(records: &[TrackRecord], path: &Path) -> DeckResult<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| DeckError::io(parent, e))?;
    }
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| DeckError::io(path, e))?;

    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(HEADER)?;

    let pb = progress_bar(records.len());
    pb.set_message("writing tracks");
    for r in records {
        let serial = r.serial();
        writer.write_record([
            serial.as_str(),
            r.artist.as_str(),
            r.title.as_str(),
            r.year.as_str(),
            r.locator.as_str(),
        ])?;
        pb.inc(1);
    }
    writer.flush().map_err(|e| DeckError::io(path, e))?;
    pb.finish_and_clear();

    info!("Wrote {} tracks to {}", records.len(), path.display());
    Ok(path.to_path_buf())
}

pub fn read_records(path: &Path) -> DeckResult<Vec<CardRow>> {
    let file = File::open(path).map_err(|e| DeckError::io(path, e))?;
    let rows = csv::Reader::from_reader(file)
        .deserialize()
        .collect::<Result<Vec<CardRow>, _>>()?;
    Ok(rows)
}
