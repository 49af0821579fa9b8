use std::sync::Arc;

use crate::locator::{self, LocatorKind};
use crate::source::{SourceError, SourceResult, StreamingSource};
use crate::track::Track;

/// Outcome of turning one user query into playable tracks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Direct link to one track
    SingleTrack(Track),
    /// Direct link that also names a playlist; `entries` excludes the track itself
    SingleTrackWithPlaylist {
        track: Track,
        playlist_title: String,
        entries: Vec<Track>,
    },
    /// Direct link that also carries a mix marker; `entries` excludes the track itself
    SingleTrackWithMix { track: Track, entries: Vec<Track> },
    /// Playlist link
    Playlist { title: String, entries: Vec<Track> },
    /// Mix link with no single track
    Mix { entries: Vec<Track> },
    /// Top hit of a free text search
    SearchResult(Track),
    NotFound,
    /// The primary lookup itself failed
    LookupFailed(String),
}

impl Resolution {
    /// Tracks to append, in queue order
    pub fn tracks(&self) -> Vec<Track> {
        match self {
            Resolution::SingleTrack(track) | Resolution::SearchResult(track) => vec![track.clone()],
            Resolution::SingleTrackWithPlaylist { track, entries, .. }
            | Resolution::SingleTrackWithMix { track, entries } => {
                std::iter::once(track.clone()).chain(entries.iter().cloned()).collect()
            }
            Resolution::Playlist { entries, .. } | Resolution::Mix { entries } => entries.clone(),
            Resolution::NotFound | Resolution::LookupFailed(_) => Vec::new(),
        }
    }
}

/// Playlist contents, listed without queueing anything
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistListing {
    pub title: String,
    pub entries: Vec<Track>,
}

pub struct Resolver {
    source: Arc<dyn StreamingSource>,
    mix_size: usize,
}

impl Resolver {
    pub fn new(source: Arc<dyn StreamingSource>, mix_size: usize) -> Self {
        Self {
            source,
            mix_size: mix_size.max(1),
        }
    }

    /// Classify `query` once and resolve it.
    ///
    /// Order: single track (plus an embedded playlist, else mix), playlist,
    /// mix, free text search.
    pub fn resolve(&self, query: &str) -> Resolution {
        let query = query.trim();
        if query.is_empty() {
            return Resolution::NotFound;
        }

        match self.source.classify(query) {
            LocatorKind::Video => self.resolve_single(query),
            LocatorKind::Playlist => self.resolve_playlist(query),
            LocatorKind::None => match locator::mix_seed(query) {
                Some(seed) => self.resolve_mix(&seed),
                None => self.resolve_search(query),
            },
        }
    }

    fn resolve_single(&self, query: &str) -> Resolution {
        let track = match self.source.resolve_metadata(query) {
            Ok(track) => track,
            Err(e) => {
                log::warn!("Metadata lookup failed for {}: {}", query, e);
                return Resolution::LookupFailed(e.to_string());
            }
        };

        if let Some(list_id) = self.embedded_playlist(query) {
            return match self.source.expand_playlist(&playlist_url(&list_id)) {
                Ok(playlist) => Resolution::SingleTrackWithPlaylist {
                    entries: without_primary(playlist.entries, query),
                    playlist_title: playlist.title,
                    track,
                },
                Err(e) => {
                    log::warn!("Playlist {} could not be expanded: {}", list_id, e);
                    Resolution::SingleTrack(track)
                }
            };
        }

        if let Some(seed) = locator::mix_seed(query) {
            return match self.mix_entries(&seed) {
                Ok(entries) => Resolution::SingleTrackWithMix {
                    entries: without_primary(entries, query),
                    track,
                },
                Err(e) => {
                    log::warn!("Mix {} could not be expanded: {}", seed, e);
                    Resolution::SingleTrack(track)
                }
            };
        }

        Resolution::SingleTrack(track)
    }

    fn embedded_playlist(&self, query: &str) -> Option<String> {
        let list_id = locator::playlist_id(query)?;
        (self.source.classify(&playlist_url(&list_id)) == LocatorKind::Playlist).then_some(list_id)
    }

    fn resolve_playlist(&self, query: &str) -> Resolution {
        match self.source.expand_playlist(query) {
            Ok(playlist) if playlist.entries.is_empty() => {
                log::info!("Playlist {} has no playable entries", query);
                Resolution::NotFound
            }
            Ok(playlist) => Resolution::Playlist {
                title: playlist.title,
                entries: playlist.entries,
            },
            Err(e) => {
                log::warn!("Playlist lookup failed for {}: {}", query, e);
                Resolution::LookupFailed(e.to_string())
            }
        }
    }

    fn resolve_mix(&self, seed: &str) -> Resolution {
        match self.mix_entries(seed) {
            Ok(entries) if !entries.is_empty() => Resolution::Mix { entries },
            Ok(_) => Resolution::NotFound,
            Err(e) => {
                log::warn!("Mix lookup failed for {}: {}", seed, e);
                Resolution::NotFound
            }
        }
    }

    fn mix_entries(&self, seed: &str) -> SourceResult<Vec<Track>> {
        let hits = self.source.search(seed, self.mix_size)?;
        Ok(hits.into_iter().map(Track::from).collect())
    }

    fn resolve_search(&self, query: &str) -> Resolution {
        match self.source.search(query, 1) {
            Ok(hits) => match hits.into_iter().next() {
                Some(hit) => Resolution::SearchResult(hit.into()),
                None => Resolution::NotFound,
            },
            Err(e) => {
                log::warn!("Search failed for {:?}: {}", query, e);
                Resolution::LookupFailed(e.to_string())
            }
        }
    }

    /// List a playlist's entries without queueing them
    pub fn inspect_playlist(&self, url: &str) -> SourceResult<PlaylistListing> {
        let list_id =
            locator::playlist_id(url).ok_or_else(|| SourceError::InvalidLocator(url.to_string()))?;
        let playlist = self.source.expand_playlist(&playlist_url(&list_id))?;
        Ok(PlaylistListing {
            title: playlist.title,
            entries: playlist.entries,
        })
    }
}

fn playlist_url(list_id: &str) -> String {
    format!("https://www.youtube.com/playlist?list={}", list_id)
}

fn without_primary(entries: Vec<Track>, primary: &str) -> Vec<Track> {
    entries
        .into_iter()
        .filter(|t| !locator::same_video(&t.locator, primary))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{AudioStream, PlaylistInfo, SearchHit};
    use std::collections::HashMap;
    use std::sync::Mutex;

    const VIDEO: &str = "https://www.youtube.com/watch?v=aaaaaaaaaaa";
    const VIDEO_IN_LIST: &str = "https://www.youtube.com/watch?v=aaaaaaaaaaa&list=PLlist";
    const VIDEO_IN_MIX: &str = "https://www.youtube.com/watch?v=aaaaaaaaaaa&list=RDaaaaaaaaaaa";
    const PLAYLIST: &str = "https://www.youtube.com/playlist?list=PLlist";

    fn watch(id: &str) -> String {
        locator::watch_url(id)
    }

    #[derive(Default)]
    struct FakeSource {
        titles: HashMap<String, String>,
        playlists: HashMap<String, PlaylistInfo>,
        searches: HashMap<String, Vec<SearchHit>>,
        fail_search: bool,
        searched: Mutex<Vec<(String, usize)>>,
    }

    impl StreamingSource for FakeSource {
        fn get_stream(&self, track: &Track) -> SourceResult<AudioStream> {
            Ok(AudioStream::new(track.locator.clone(), std::io::empty()))
        }

        fn resolve_metadata(&self, locator: &str) -> SourceResult<Track> {
            self.titles
                .get(locator)
                .map(|title| Track::with_title(locator, title.clone()))
                .ok_or_else(|| SourceError::Lookup("video unavailable".to_string()))
        }

        fn search(&self, text: &str, limit: usize) -> SourceResult<Vec<SearchHit>> {
            self.searched.lock().unwrap().push((text.to_string(), limit));
            if self.fail_search {
                return Err(SourceError::Lookup("network down".to_string()));
            }
            Ok(self.searches.get(text).cloned().unwrap_or_default())
        }

        fn expand_playlist(&self, locator: &str) -> SourceResult<PlaylistInfo> {
            self.playlists
                .get(locator)
                .cloned()
                .ok_or_else(|| SourceError::Lookup("playlist unavailable".to_string()))
        }
    }

    fn hit(id: &str) -> SearchHit {
        SearchHit {
            title: format!("title {}", id),
            locator: watch(id),
        }
    }

    fn source() -> FakeSource {
        let mut source = FakeSource::default();
        source.titles.insert(VIDEO.to_string(), "Primary".to_string());
        source.titles.insert(VIDEO_IN_LIST.to_string(), "Primary".to_string());
        source.titles.insert(VIDEO_IN_MIX.to_string(), "Primary".to_string());
        source.playlists.insert(
            PLAYLIST.to_string(),
            PlaylistInfo {
                title: "My list".to_string(),
                entries: vec![
                    Track::new(watch("bbbbbbbbbbb")),
                    Track::new(watch("aaaaaaaaaaa")),
                    Track::new(watch("ccccccccccc")),
                ],
            },
        );
        source.searches.insert(
            "aaaaaaaaaaa".to_string(),
            vec![hit("aaaaaaaaaaa"), hit("ddddddddddd"), hit("eeeeeeeeeee")],
        );
        source.searches.insert("lofi beats".to_string(), vec![hit("fffffffffff"), hit("ggggggggggg")]);
        source
    }

    fn resolver(source: FakeSource) -> Resolver {
        Resolver::new(Arc::new(source), 10)
    }

    #[test]
    fn plain_video_is_single_track() {
        let resolution = resolver(source()).resolve(VIDEO);
        assert_eq!(resolution, Resolution::SingleTrack(Track::with_title(VIDEO, "Primary")));
    }

    #[test]
    fn video_with_playlist_skips_primary() {
        let resolution = resolver(source()).resolve(VIDEO_IN_LIST);
        match resolution {
            Resolution::SingleTrackWithPlaylist { track, playlist_title, entries } => {
                assert_eq!(track.locator, VIDEO_IN_LIST);
                assert_eq!(playlist_title, "My list");
                assert_eq!(
                    entries,
                    vec![Track::new(watch("bbbbbbbbbbb")), Track::new(watch("ccccccccccc"))]
                );
            }
            other => panic!("unexpected resolution: {:?}", other),
        }
    }

    #[test]
    fn resolution_tracks_put_primary_first() {
        let tracks = resolver(source()).resolve(VIDEO_IN_LIST).tracks();
        assert_eq!(tracks.len(), 3);
        assert_eq!(tracks[0].locator, VIDEO_IN_LIST);
        assert_eq!(
            tracks.iter().filter(|t| locator::same_video(&t.locator, VIDEO)).count(),
            1
        );
    }

    #[test]
    fn broken_playlist_keeps_primary_track() {
        let mut source = source();
        source.playlists.clear();
        let resolution = resolver(source).resolve(VIDEO_IN_LIST);
        assert_eq!(
            resolution,
            Resolution::SingleTrack(Track::with_title(VIDEO_IN_LIST, "Primary"))
        );
    }

    #[test]
    fn video_with_mix_expands_by_search() {
        let source = source();
        let resolution = resolver(source).resolve(VIDEO_IN_MIX);
        match resolution {
            Resolution::SingleTrackWithMix { track, entries } => {
                assert_eq!(track.title.as_deref(), Some("Primary"));
                assert_eq!(
                    entries.iter().map(|t| t.locator.clone()).collect::<Vec<_>>(),
                    vec![watch("ddddddddddd"), watch("eeeeeeeeeee")]
                );
            }
            other => panic!("unexpected resolution: {:?}", other),
        }
    }

    #[test]
    fn failing_mix_lookup_keeps_primary_track() {
        let mut source = source();
        source.fail_search = true;
        let resolution = resolver(source).resolve(VIDEO_IN_MIX);
        assert!(matches!(resolution, Resolution::SingleTrack(_)));
    }

    #[test]
    fn playlist_link_expands_fully() {
        let resolution = resolver(source()).resolve(PLAYLIST);
        match resolution {
            Resolution::Playlist { title, entries } => {
                assert_eq!(title, "My list");
                assert_eq!(entries.len(), 3);
            }
            other => panic!("unexpected resolution: {:?}", other),
        }
    }

    #[test]
    fn empty_playlist_is_not_found() {
        let mut source = source();
        source.playlists.insert(PLAYLIST.to_string(), PlaylistInfo::default());
        assert_eq!(resolver(source).resolve(PLAYLIST), Resolution::NotFound);
    }

    #[test]
    fn bare_mix_link_uses_mix_size() {
        let source = Arc::new(source());
        let resolver = Resolver::new(source.clone(), 25);
        let resolution = resolver.resolve("https://www.youtube.com/playlist?list=RDaaaaaaaaaaa");
        assert!(matches!(resolution, Resolution::Mix { ref entries } if entries.len() == 3));
        assert_eq!(
            source.searched.lock().unwrap().as_slice(),
            &[("aaaaaaaaaaa".to_string(), 25)]
        );
    }

    #[test]
    fn free_text_takes_first_hit_only() {
        let source = Arc::new(source());
        let resolver = Resolver::new(source.clone(), 10);
        let resolution = resolver.resolve("lofi beats");
        assert_eq!(
            resolution,
            Resolution::SearchResult(Track::with_title(watch("fffffffffff"), "title fffffffffff"))
        );
        assert_eq!(source.searched.lock().unwrap()[0].1, 1);
    }

    #[test]
    fn search_without_hits_is_not_found() {
        assert_eq!(resolver(source()).resolve("nothing like this"), Resolution::NotFound);
        assert_eq!(resolver(source()).resolve("   "), Resolution::NotFound);
    }

    #[test]
    fn failures_degrade_instead_of_panicking() {
        let mut source = source();
        source.fail_search = true;
        let resolver = resolver(source);
        assert!(matches!(resolver.resolve("lofi beats"), Resolution::LookupFailed(_)));
        assert!(matches!(
            resolver.resolve("https://www.youtube.com/watch?v=zzzzzzzzzzz"),
            Resolution::LookupFailed(_)
        ));
    }

    #[test]
    fn inspect_playlist_requires_a_list_id() {
        let resolver = resolver(source());
        let listing = resolver.inspect_playlist(VIDEO_IN_LIST).unwrap();
        assert_eq!(listing.title, "My list");
        assert_eq!(listing.entries.len(), 3);

        assert!(matches!(
            resolver.inspect_playlist(VIDEO),
            Err(SourceError::InvalidLocator(_))
        ));
    }
}
