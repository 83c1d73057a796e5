use crate::error::{DeckError, DeckResult};

/// What a locator points at in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorKind {
    Playlist,
    Track,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub kind: LocatorKind,
    pub id: String,
    pub raw: String,
}

impl Locator {
    /// Classify a catalog URL such as `https://open.spotify.com/playlist/<id>?si=..`.
    pub fn parse(raw: &str) -> DeckResult<Self> {
        let raw = raw.trim();
        let id = extract_id(raw)?;

        let path = strip_suffixes(raw);
        let kind = path
            .split('/')
            .rev()
            .skip(1)
            .find_map(|segment| match segment {
                "playlist" => Some(LocatorKind::Playlist),
                "track" => Some(LocatorKind::Track),
                _ => None,
            })
            .ok_or_else(|| DeckError::malformed_locator(raw))?;

        Ok(Self {
            kind,
            id,
            raw: raw.to_string(),
        })
    }
}

/// Trailing path segment of a locator, query string removed.
pub fn extract_id(locator: &str) -> DeckResult<String> {
    let path = strip_suffixes(locator.trim());
    let id = path.rsplit('/').next().unwrap_or_default();
    if id.is_empty() {
        return Err(DeckError::malformed_locator(locator));
    }
    Ok(id.to_string())
}

fn strip_suffixes(locator: &str) -> &str {
    let end = locator.find(['?', '#']).unwrap_or(locator.len());
    &locator[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_query_from_trailing_segment() {
        let id = extract_id("https://open.spotify.com/playlist/ABC123?si=xyz").unwrap();
        assert_eq!(id, "ABC123");
    }

    #[test]
    fn bare_identifier_is_its_own_segment() {
        assert_eq!(extract_id("ABC123").unwrap(), "ABC123");
    }

    #[test]
    fn empty_trailing_segment_is_malformed() {
        for bad in ["", "   ", "https://open.spotify.com/playlist/", "?si=xyz"] {
            assert!(
                matches!(extract_id(bad), Err(DeckError::MalformedLocator(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn classifies_playlist_and_track() {
        let p = Locator::parse("https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M?si=a").unwrap();
        assert_eq!(p.kind, LocatorKind::Playlist);
        assert_eq!(p.id, "37i9dQZF1DXcBWIGoYBM5M");

        let t = Locator::parse("https://open.spotify.com/intl-de/track/4uLU6hMCjMI75M1A2tKUQC").unwrap();
        assert_eq!(t.kind, LocatorKind::Track);
        assert_eq!(t.id, "4uLU6hMCjMI75M1A2tKUQC");
    }

    #[test]
    fn unknown_kind_is_malformed() {
        let err = Locator::parse("https://open.spotify.com/album/1DFixLWuPkv3KT3TnV35m3").unwrap_err();
        assert!(matches!(err, DeckError::MalformedLocator(_)));
        assert!(Locator::parse("ABC123").is_err());
    }
}
