use std::fmt::Display;

use crate::track::{ChannelId, Track};

/// What the bot tells the channel a command came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    // ==============================
    // Confirmations
    // ==============================
    Enqueued { track: Track },
    PlaylistEnqueued { title: String, count: usize },
    MixEnqueued { title: String, count: usize },
    Paused,
    Resumed,
    Stopped,
    Skipped,
    PlayingPrevious { track: Track },
    QueueListing { upcoming: Vec<Track>, total: usize },
    PlaylistListing { title: String, entries: Vec<Track> },

    // ==============================
    // Notices
    // ==============================
    QueueEmpty,
    HistoryEmpty,
    NothingPlaying,

    // ==============================
    // Errors
    // ==============================
    NotInVoiceChannel,
    MissingQuery,
    MissingPlaylistUrl,
    InvalidPlaylist { url: String },
    NotFound { query: String },
    LookupFailed { reason: String },
    VoiceUnavailable { reason: String },
}

impl Reply {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Reply::NotInVoiceChannel
                | Reply::MissingQuery
                | Reply::MissingPlaylistUrl
                | Reply::InvalidPlaylist { .. }
                | Reply::NotFound { .. }
                | Reply::LookupFailed { .. }
                | Reply::VoiceUnavailable { .. }
        )
    }
}

impl Display for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reply::Enqueued { track } => write!(f, "Added to the queue: {}", track),
            Reply::PlaylistEnqueued { title, count } => {
                write!(f, "Added {} songs from the playlist: {}", count, title)
            }
            Reply::MixEnqueued { title, count } => {
                write!(f, "Added the mix: {} ({} songs)", title, count)
            }
            Reply::Paused => write!(f, "Playback paused."),
            Reply::Resumed => write!(f, "Playback resumed."),
            Reply::Stopped => write!(f, "Playback stopped and connection closed."),
            Reply::Skipped => write!(f, "Song skipped."),
            Reply::PlayingPrevious { track } => write!(f, "Playing the previous song: {}", track),
            Reply::QueueListing { upcoming, total } => {
                writeln!(f, "Next songs in the queue:")?;
                for (index, track) in upcoming.iter().enumerate() {
                    writeln!(f, "{}. {}", index + 1, track)?;
                }
                if *total > upcoming.len() {
                    write!(f, "...and {} more", total - upcoming.len())?;
                }
                Ok(())
            }
            Reply::PlaylistListing { title, entries } => {
                writeln!(f, "Playlist: {}", title)?;
                for (index, track) in entries.iter().enumerate() {
                    writeln!(f, "{}. {} - {}", index + 1, track, track.locator)?;
                }
                Ok(())
            }
            Reply::QueueEmpty => write!(f, "The queue is empty."),
            Reply::HistoryEmpty => write!(f, "There are no previous songs in the history."),
            Reply::NothingPlaying => write!(f, "Nothing is playing."),
            Reply::NotInVoiceChannel => write!(f, "You need to join a voice channel first!"),
            Reply::MissingQuery => write!(f, "Please provide a URL or the name of a song."),
            Reply::MissingPlaylistUrl => write!(f, "Please provide a playlist URL."),
            Reply::InvalidPlaylist { url } => write!(f, "Invalid playlist URL: {}", url),
            Reply::NotFound { query } => write!(f, "No results found for: {}", query),
            Reply::LookupFailed { reason } => {
                write!(f, "There was an error fetching the song: {}", reason)
            }
            Reply::VoiceUnavailable { reason } => {
                write!(f, "Could not connect to the voice channel: {}", reason)
            }
        }
    }
}

/// Delivers replies back to chat
pub trait ReplySink: Send {
    fn send(&self, channel: ChannelId, reply: Reply);
}
