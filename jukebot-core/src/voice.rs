//! Contracts of the voice transport the controller plays into.
//!
//! Implementations report asynchronous status (connection ready, sink idle,
//! sink error) by posting events through the `EventSender` they are handed.

use thiserror::Error;

use crate::events::EventSender;
use crate::source::AudioStream;
use crate::track::{ChannelId, ConnectionId, GuildId, PlaybackId};

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("could not join {channel}: {reason}")]
    Join { channel: ChannelId, reason: String },

    #[error("connection is closed")]
    Closed,

    #[error("sink error: {0}")]
    Sink(String),
}

pub type VoiceResult<T> = std::result::Result<T, VoiceError>;

/// Opens voice connections
pub trait VoiceService: Send {
    /// Join `channel` in `guild`.
    ///
    /// The returned connection may not be usable yet; the implementation must
    /// post `Event::ConnectionReady` with `id` once it is.
    fn join(
        &mut self,
        guild: GuildId,
        channel: ChannelId,
        id: ConnectionId,
        events: EventSender,
    ) -> VoiceResult<Box<dyn VoiceConnection>>;
}

/// One live voice connection
pub trait VoiceConnection: Send {
    /// Create a sink subscribed to this connection.
    ///
    /// The sink must post `Event::Sink` with `id` when its track ends or fails,
    /// including when it ends because `stop` was called.
    fn create_sink(&mut self, id: PlaybackId, events: EventSender) -> VoiceResult<Box<dyn PlaybackSink>>;

    fn destroy(&mut self);
}

/// Plays one stream into a connection
pub trait PlaybackSink: Send {
    fn play(&mut self, stream: AudioStream) -> VoiceResult<()>;

    fn pause(&mut self);

    fn unpause(&mut self);

    /// Force the current track to end
    fn stop(&mut self);
}
