use crate::events::EventSender;
use crate::queue::PlayQueue;
use crate::track::{ChannelId, ConnectionId, GuildId, PlaybackId, Track};
use crate::voice::{PlaybackSink, VoiceConnection, VoiceResult, VoiceService};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
pub enum PlayerState {
    /// No track bound to a sink
    #[default]
    Idle,
    Playing,
    Paused,
}

/// The track currently bound to a sink
pub struct NowPlaying {
    pub id: PlaybackId,
    pub track: Track,
    pub sink: Box<dyn PlaybackSink>,
}

/// Playback context of one guild.
///
/// The queue and history outlive the voice connection; only `stop` clears
/// them, by dropping the whole session.
pub struct Session {
    pub guild: GuildId,
    pub queue: PlayQueue,
    pub state: PlayerState,
    pub now_playing: Option<NowPlaying>,
    connection: Option<Box<dyn VoiceConnection>>,
    connection_id: Option<ConnectionId>,
    connection_ready: bool,
    voice_channel: Option<ChannelId>,
    /// Unique per session; resolver results tagged with another epoch are stale
    pub epoch: u64,
}

impl Session {
    pub fn new(guild: GuildId, epoch: u64) -> Self {
        Self {
            guild,
            queue: PlayQueue::new(),
            state: PlayerState::Idle,
            now_playing: None,
            connection: None,
            connection_id: None,
            connection_ready: false,
            voice_channel: None,
            epoch,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state != PlayerState::Idle
    }

    pub fn has_connection(&self) -> bool {
        self.connection.is_some()
    }

    /// A connection exists and reported ready
    pub fn is_ready(&self) -> bool {
        self.connection.is_some() && self.connection_ready
    }

    pub fn voice_channel(&self) -> Option<ChannelId> {
        self.voice_channel
    }

    pub fn connection_mut(&mut self) -> Option<&mut Box<dyn VoiceConnection>> {
        self.connection.as_mut()
    }

    /// Join `channel` as connection `id` unless a connection is already live.
    ///
    /// A fresh connection starts out not ready; the voice service posts
    /// `ConnectionReady` with `id` when it becomes usable.
    pub fn ensure_connection(
        &mut self,
        voice: &mut dyn VoiceService,
        channel: ChannelId,
        id: ConnectionId,
        events: &EventSender,
    ) -> VoiceResult<()> {
        if self.connection.is_some() {
            return Ok(());
        }

        log::info!("Joining {} in {} ({})", channel, self.guild, id);
        let connection = voice.join(self.guild, channel, id, events.clone())?;
        self.connection = Some(connection);
        self.connection_id = Some(id);
        self.connection_ready = false;
        self.voice_channel = Some(channel);
        Ok(())
    }

    /// Mark the live connection ready if it is the one `id` names.
    ///
    /// Returns false for reports from connections already torn down.
    pub fn mark_ready(&mut self, id: ConnectionId) -> bool {
        if self.connection.is_none() || self.connection_id != Some(id) {
            return false;
        }
        self.connection_ready = true;
        true
    }

    /// Destroy the connection, if there is one
    pub fn teardown(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            log::info!("Leaving voice in {}", self.guild);
            connection.destroy();
        }
        self.connection_id = None;
        self.connection_ready = false;
        self.voice_channel = None;
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("guild", &self.guild)
            .field("state", &self.state)
            .field("now_playing", &self.now_playing.as_ref().map(|n| &n.track))
            .field("queue", &self.queue.len())
            .field("history", &self.queue.history_len())
            .field("connection", &self.connection_id)
            .field("epoch", &self.epoch)
            .finish()
    }
}
