use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

pub const UNKNOWN: &str = "Unknown";

/// One normalized catalog track, numbered within its collection run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRecord {
    pub ordinal: usize,
    pub artist: String,
    pub title: String,
    pub year: String,
    pub locator: String,
}

impl TrackRecord {
    /// Printed serial, e.g. `SN-007`.
    pub fn serial(&self) -> String {
        format_serial(self.ordinal)
    }
}

pub fn format_serial(ordinal: usize) -> String {
    format!("SN-{:03}", ordinal)
}

/// How many tracks a run should collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestSize {
    Bounded(NonZeroUsize),
    #[default]
    Unbounded,
}

impl RequestSize {
    pub fn bounded(n: usize) -> Option<Self> {
        NonZeroUsize::new(n).map(Self::Bounded)
    }
}

impl FromStr for RequestSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::Unbounded);
        }
        s.parse::<usize>()
            .ok()
            .and_then(Self::bounded)
            .ok_or_else(|| format!("expected a positive number or 'all', got {s:?}"))
    }
}

impl fmt::Display for RequestSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bounded(n) => write!(f, "{n}"),
            Self::Unbounded => f.write_str("all"),
        }
    }
}

/// Why a fetch loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Satisfied,
    EmptyBatch,
    LastPage,
    MalformedResponse,
    UpstreamUnavailable,
    Cancelled,
}

impl StopReason {
    /// Whether the run may be missing tracks that exist upstream.
    pub fn is_partial(self) -> bool {
        matches!(
            self,
            Self::MalformedResponse | Self::UpstreamUnavailable | Self::Cancelled
        )
    }
}

/// Records produced by one fetch invocation.
#[derive(Debug, Clone)]
pub struct CollectionRun {
    pub records: Vec<TrackRecord>,
    pub skipped: usize,
    pub stop: StopReason,
}
