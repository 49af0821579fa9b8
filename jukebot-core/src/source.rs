use std::io::Read;

use thiserror::Error;

use crate::locator::{self, LocatorKind};
use crate::track::Track;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid locator: {0}")]
    InvalidLocator(String),

    #[error("lookup failed: {0}")]
    Lookup(String),

    #[error("unexpected response from source: {0}")]
    Malformed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// One search hit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub locator: String,
}

impl From<SearchHit> for Track {
    fn from(hit: SearchHit) -> Self {
        Track::with_title(hit.locator, hit.title)
    }
}

/// An expanded playlist
#[derive(Debug, Clone, Default)]
pub struct PlaylistInfo {
    pub title: String,
    pub entries: Vec<Track>,
}

/// Raw audio bytes for one track, as produced by the streaming source.
///
/// Reading may block on the network, so consumers should drain it off the
/// controller thread.
pub struct AudioStream {
    pub locator: String,
    reader: Box<dyn Read + Send>,
}

impl AudioStream {
    pub fn new(locator: impl Into<String>, reader: impl Read + Send + 'static) -> Self {
        Self {
            locator: locator.into(),
            reader: Box::new(reader),
        }
    }

    pub fn into_reader(self) -> Box<dyn Read + Send> {
        self.reader
    }
}

impl std::fmt::Debug for AudioStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioStream").field("locator", &self.locator).finish_non_exhaustive()
    }
}

/// Remote catalogue the bot plays from.
///
/// Every lookup may hit the network; failures come back as `SourceError`.
pub trait StreamingSource: Send + Sync {
    /// Open the audio byte stream for a track
    fn get_stream(&self, track: &Track) -> SourceResult<AudioStream>;

    /// Fetch the title (and canonical locator) of a single track
    fn resolve_metadata(&self, locator: &str) -> SourceResult<Track>;

    /// Free text search, returning at most `limit` hits
    fn search(&self, text: &str, limit: usize) -> SourceResult<Vec<SearchHit>>;

    /// List every entry of a playlist
    fn expand_playlist(&self, locator: &str) -> SourceResult<PlaylistInfo>;

    fn classify(&self, locator: &str) -> LocatorKind {
        locator::classify(locator)
    }
}
