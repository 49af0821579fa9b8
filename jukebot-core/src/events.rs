use crossbeam_channel::Sender;

use crate::commands::CommandRequest;
use crate::resolver::{PlaylistListing, Resolution};
use crate::source::SourceError;
use crate::track::{ChannelId, ConnectionId, GuildId, PlaybackId};

/// Status reported by a sink for the track bound to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkStatus {
    /// Track finished, or was stopped
    Idle,
    /// Track failed mid-stream
    Error(String),
}

/// Work finished on the resolver thread
#[derive(Debug)]
pub enum JobOutcome {
    Resolved(Resolution),
    Listed(Result<PlaylistListing, SourceError>),
}

/// Everything the controller loop reacts to
#[derive(Debug)]
pub enum Event {
    /// A chat command
    Command(CommandRequest),
    /// A resolver job finished
    JobDone {
        guild: GuildId,
        epoch: u64,
        query: String,
        voice_channel: Option<ChannelId>,
        text_channel: ChannelId,
        outcome: JobOutcome,
    },
    /// A voice connection became usable
    ConnectionReady { guild: GuildId, id: ConnectionId },
    /// A sink changed status
    Sink {
        guild: GuildId,
        id: PlaybackId,
        status: SinkStatus,
    },
    /// Stop every session and leave the loop
    Shutdown,
}

/// Cloneable handle for posting events into the controller loop
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<Event>,
}

impl EventSender {
    pub fn new(tx: Sender<Event>) -> Self {
        Self { tx }
    }

    /// Post an event. Returns false when the loop is gone.
    pub fn send(&self, event: Event) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn connection_ready(&self, guild: GuildId, id: ConnectionId) -> bool {
        self.send(Event::ConnectionReady { guild, id })
    }

    pub fn sink_status(&self, guild: GuildId, id: PlaybackId, status: SinkStatus) -> bool {
        self.send(Event::Sink { guild, id, status })
    }
}
