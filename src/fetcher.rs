use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::catalog::CatalogApi;
use crate::locator::{Locator, LocatorKind};
use crate::model::{CollectionRun, RequestSize, StopReason, TrackRecord, UNKNOWN};

/// Most entries the playlist endpoint returns per call.
pub const BATCH_CAP: usize = 100;
/// Stand-in for `RequestSize::Unbounded`; the endpoint stops paging well before this.
const UNBOUNDED_CEILING: usize = 10_000;

/// Set from the Ctrl-C handler, polled at the top of each batch.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why an upstream entry did not become a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingTrack,
    Unplayable,
    MissingLocator,
    Malformed,
}

#[derive(Deserialize)]
struct RawEntry {
    track: Option<RawTrack>,
}

#[derive(Deserialize)]
struct RawTrack {
    artists: Option<Vec<RawArtist>>,
    name: Option<String>,
    album: Option<RawAlbum>,
    external_urls: Option<RawUrls>,
    is_playable: Option<bool>,
}

#[derive(Deserialize)]
struct RawArtist {
    name: Option<String>,
}

#[derive(Deserialize)]
struct RawAlbum {
    release_date: Option<String>,
}

#[derive(Deserialize)]
struct RawUrls {
    spotify: Option<String>,
}

/// Normalize one playlist entry (`{ "track": {..} }`).
pub fn normalize_entry(entry: &Value, ordinal: usize) -> Result<TrackRecord, SkipReason> {
    let entry = RawEntry::deserialize(entry).map_err(|_| SkipReason::Malformed)?;
    let track = entry.track.ok_or(SkipReason::MissingTrack)?;
    normalize_track(track, ordinal)
}

fn normalize_track(track: RawTrack, ordinal: usize) -> Result<TrackRecord, SkipReason> {
    if track.is_playable == Some(false) {
        return Err(SkipReason::Unplayable);
    }
    let locator = track
        .external_urls
        .and_then(|urls| urls.spotify)
        .filter(|url| !url.trim().is_empty())
        .ok_or(SkipReason::MissingLocator)?;

    let artist = track
        .artists
        .and_then(|artists| artists.into_iter().next())
        .and_then(|artist| artist.name);

    Ok(TrackRecord {
        ordinal,
        artist: or_unknown(artist),
        title: or_unknown(track.name),
        year: release_year(track.album.and_then(|a| a.release_date).as_deref()),
        locator,
    })
}

fn or_unknown(value: Option<String>) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// `1999-05-01`, `1999-05` and `1999` all yield `1999`.
fn release_year(date: Option<&str>) -> String {
    date.and_then(|d| d.trim().split('-').next())
        .filter(|y| y.len() == 4 && y.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(UNKNOWN)
        .to_string()
}

pub struct Fetcher<'a, C> {
    api: &'a C,
    batch_delay: Duration,
    cancel: CancelFlag,
}

impl<'a, C: CatalogApi> Fetcher<'a, C> {
    pub fn new(api: &'a C, batch_delay: Duration, cancel: CancelFlag) -> Self {
        Self {
            api,
            batch_delay,
            cancel,
        }
    }

    pub async fn fetch(&self, locator: &Locator, size: RequestSize) -> CollectionRun {
        debug!("Resolving {} as {:?}", locator.raw, locator.kind);
        match locator.kind {
            LocatorKind::Playlist => self.fetch_playlist(&locator.id, size).await,
            LocatorKind::Track => self.fetch_track(&locator.id).await,
        }
    }

    /// Page through a playlist until `size` records are kept or upstream runs dry.
    ///
    /// Never fails: an unavailable catalog or a malformed page ends the loop and
    /// whatever was collected so far is returned.
    pub async fn fetch_playlist(&self, playlist_id: &str, size: RequestSize) -> CollectionRun {
        let ceiling = match size {
            RequestSize::Bounded(n) => n.get(),
            RequestSize::Unbounded => UNBOUNDED_CEILING,
        };

        info!("Fetching up to {} tracks from playlist {}", size, playlist_id);
        let mut records: Vec<TrackRecord> = Vec::new();
        let mut skipped = 0usize;
        let mut offset = 0usize;

        let stop = loop {
            if records.len() >= ceiling {
                break StopReason::Satisfied;
            }
            if offset > 0 {
                tokio::time::sleep(self.batch_delay).await;
            }
            if self.cancel.is_cancelled() {
                warn!("Fetch cancelled after {} tracks", records.len());
                break StopReason::Cancelled;
            }

            let limit = BATCH_CAP.min(ceiling - records.len());
            info!("Batch fetch: offset={}, limit={}", offset, limit);

            let page = match self.api.playlist_items(playlist_id, limit, offset).await {
                Ok(page) => page,
                Err(e) => {
                    warn!("Stopping at offset {}: {}", offset, e);
                    break StopReason::UpstreamUnavailable;
                }
            };

            let Some(items) = page.get("items").and_then(Value::as_array) else {
                warn!("Malformed page at offset {} (no items array), stopping", offset);
                break StopReason::MalformedResponse;
            };
            if items.is_empty() {
                break StopReason::EmptyBatch;
            }

            for (i, item) in items.iter().take(limit).enumerate() {
                match normalize_entry(item, records.len() + 1) {
                    Ok(record) => records.push(record),
                    Err(reason) => {
                        skipped += 1;
                        debug!("Skipped entry {}: {:?}", offset + i, reason);
                    }
                }
            }

            offset += limit;

            if page.get("next").map_or(true, Value::is_null) {
                break StopReason::LastPage;
            }
        };

        info!(
            "Fetched {} tracks ({} skipped, stop: {:?})",
            records.len(),
            skipped,
            stop
        );
        CollectionRun {
            records,
            skipped,
            stop,
        }
    }

    /// A single-track locator still produces a run, of zero or one records.
    pub async fn fetch_track(&self, track_id: &str) -> CollectionRun {
        info!("Fetching track {}", track_id);
        let value = match self.api.track(track_id).await {
            Ok(value) => value,
            Err(e) => {
                warn!("Could not fetch track {}: {}", track_id, e);
                return CollectionRun {
                    records: Vec::new(),
                    skipped: 0,
                    stop: StopReason::UpstreamUnavailable,
                };
            }
        };

        let normalized = RawTrack::deserialize(&value)
            .map_err(|_| SkipReason::Malformed)
            .and_then(|track| normalize_track(track, 1));

        match normalized {
            Ok(record) => CollectionRun {
                records: vec![record],
                skipped: 0,
                stop: StopReason::Satisfied,
            },
            Err(SkipReason::Malformed) => {
                warn!("Malformed track response for {}", track_id);
                CollectionRun {
                    records: Vec::new(),
                    skipped: 0,
                    stop: StopReason::MalformedResponse,
                }
            }
            Err(reason) => {
                warn!("Track {} skipped: {:?}", track_id, reason);
                CollectionRun {
                    records: Vec::new(),
                    skipped: 1,
                    stop: StopReason::Satisfied,
                }
            }
        }
    }
}
