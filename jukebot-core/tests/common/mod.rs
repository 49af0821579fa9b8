#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use jukebot_core::source::{PlaylistInfo, SearchHit, SourceResult};
use jukebot_core::voice::VoiceResult;
use jukebot_core::{
    AudioStream, BotConfig, ChannelId, Command, CommandRequest, ConnectionId, ControllerHandle,
    Event, EventSender, GuildId, PlaybackController, PlaybackId, PlaybackSink, PlayerState, Reply,
    ReplySink, SinkStatus, SourceError, StreamingSource, Track, VoiceConnection, VoiceError,
    VoiceService,
};

pub const GUILD: GuildId = GuildId(1);
pub const VOICE: ChannelId = ChannelId(10);
pub const TEXT: ChannelId = ChannelId(20);

pub fn url(id: &str) -> String {
    // pad to a valid 11 character video id
    format!("https://www.youtube.com/watch?v={:_<11}", id)
}

// ===== Streaming source =====

#[derive(Default)]
pub struct ScriptedSource {
    pub titles: HashMap<String, String>,
    pub playlists: HashMap<String, PlaylistInfo>,
    pub searches: HashMap<String, Vec<SearchHit>>,
    pub broken_streams: HashSet<String>,
}

impl ScriptedSource {
    /// Source that knows videos `a`..`e` titled after their id
    pub fn with_videos() -> Self {
        let mut source = Self::default();
        for id in ["a", "b", "c", "d", "e"] {
            source.titles.insert(url(id), id.to_string());
        }
        source
    }
}

impl StreamingSource for ScriptedSource {
    fn get_stream(&self, track: &Track) -> SourceResult<AudioStream> {
        if self.broken_streams.contains(&track.locator) {
            return Err(SourceError::Lookup("stream unavailable".to_string()));
        }
        Ok(AudioStream::new(track.locator.clone(), std::io::empty()))
    }

    fn resolve_metadata(&self, locator: &str) -> SourceResult<Track> {
        self.titles
            .get(locator)
            .map(|title| Track::with_title(locator, title.clone()))
            .ok_or_else(|| SourceError::Lookup("video unavailable".to_string()))
    }

    fn search(&self, text: &str, limit: usize) -> SourceResult<Vec<SearchHit>> {
        let mut hits = self.searches.get(text).cloned().unwrap_or_default();
        hits.truncate(limit);
        Ok(hits)
    }

    fn expand_playlist(&self, locator: &str) -> SourceResult<PlaylistInfo> {
        self.playlists
            .get(locator)
            .cloned()
            .ok_or_else(|| SourceError::Lookup("playlist unavailable".to_string()))
    }
}

// ===== Voice =====

#[derive(Debug, Default)]
pub struct VoiceLog {
    pub joins: Vec<(GuildId, ChannelId)>,
    /// Connection id handed to every successful `join`
    pub connections: Vec<ConnectionId>,
    pub destroyed: usize,
    /// (sink id, locator) for every `play`
    pub played: Vec<(PlaybackId, String)>,
    pub stopped: Vec<PlaybackId>,
    pub paused: Vec<PlaybackId>,
    pub unpaused: Vec<PlaybackId>,
}

#[derive(Clone)]
pub struct FakeVoice {
    pub log: Arc<Mutex<VoiceLog>>,
    /// Post ConnectionReady straight from `join`
    pub auto_ready: bool,
    pub fail_join: bool,
    pub fail_sinks: bool,
}

impl FakeVoice {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(VoiceLog::default())),
            auto_ready: true,
            fail_join: false,
            fail_sinks: false,
        }
    }
}

impl VoiceService for FakeVoice {
    fn join(
        &mut self,
        guild: GuildId,
        channel: ChannelId,
        id: ConnectionId,
        events: EventSender,
    ) -> VoiceResult<Box<dyn VoiceConnection>> {
        if self.fail_join {
            return Err(VoiceError::Join {
                channel,
                reason: "missing permissions".to_string(),
            });
        }
        {
            let mut log = self.log.lock().unwrap();
            log.joins.push((guild, channel));
            log.connections.push(id);
        }
        if self.auto_ready {
            events.connection_ready(guild, id);
        }
        Ok(Box::new(FakeConnection {
            guild,
            log: self.log.clone(),
            fail_sinks: self.fail_sinks,
        }))
    }
}

struct FakeConnection {
    guild: GuildId,
    log: Arc<Mutex<VoiceLog>>,
    fail_sinks: bool,
}

impl VoiceConnection for FakeConnection {
    fn create_sink(&mut self, id: PlaybackId, events: EventSender) -> VoiceResult<Box<dyn PlaybackSink>> {
        if self.fail_sinks {
            return Err(VoiceError::Closed);
        }
        Ok(Box::new(FakeSink {
            guild: self.guild,
            id,
            events,
            log: self.log.clone(),
        }))
    }

    fn destroy(&mut self) {
        self.log.lock().unwrap().destroyed += 1;
    }
}

/// Sink that never finishes on its own; `stop` reports Idle like a real one
struct FakeSink {
    guild: GuildId,
    id: PlaybackId,
    events: EventSender,
    log: Arc<Mutex<VoiceLog>>,
}

impl PlaybackSink for FakeSink {
    fn play(&mut self, stream: AudioStream) -> VoiceResult<()> {
        self.log.lock().unwrap().played.push((self.id, stream.locator.clone()));
        Ok(())
    }

    fn pause(&mut self) {
        self.log.lock().unwrap().paused.push(self.id);
    }

    fn unpause(&mut self) {
        self.log.lock().unwrap().unpaused.push(self.id);
    }

    fn stop(&mut self) {
        self.log.lock().unwrap().stopped.push(self.id);
        self.events.sink_status(self.guild, self.id, SinkStatus::Idle);
    }
}

// ===== Replies =====

#[derive(Clone, Default)]
pub struct RecordingReplies {
    pub sent: Arc<Mutex<Vec<(ChannelId, Reply)>>>,
}

impl ReplySink for RecordingReplies {
    fn send(&self, channel: ChannelId, reply: Reply) {
        self.sent.lock().unwrap().push((channel, reply));
    }
}

// ===== Harness =====

/// Controller with inline resolution, driven synchronously by `pump`
pub struct Harness {
    pub controller: PlaybackController,
    pub handle: ControllerHandle,
    pub voice: FakeVoice,
    pub replies: RecordingReplies,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(ScriptedSource::with_videos(), FakeVoice::new())
    }

    pub fn with(source: ScriptedSource, voice: FakeVoice) -> Self {
        let replies = RecordingReplies::default();
        let (controller, handle) = PlaybackController::new_inline(
            &BotConfig::default(),
            Arc::new(source),
            Box::new(voice.clone()),
            Box::new(replies.clone()),
        );
        Self {
            controller,
            handle,
            voice,
            replies,
        }
    }

    pub fn send_from(&mut self, command: Command, guild: GuildId, voice_channel: Option<ChannelId>) {
        self.handle
            .submit(CommandRequest {
                command,
                guild,
                voice_channel,
                text_channel: TEXT,
            })
            .unwrap();
        self.controller.pump();
    }

    pub fn send(&mut self, command: Command) {
        self.send_from(command, GUILD, Some(VOICE));
    }

    pub fn play(&mut self, id: &str) {
        self.send(Command::Play(url(id)));
    }

    pub fn current_id(&self) -> Option<PlaybackId> {
        self.controller
            .session(GUILD)
            .and_then(|s| s.now_playing.as_ref())
            .map(|now| now.id)
    }

    /// Id of the most recent join
    pub fn last_connection(&self) -> ConnectionId {
        *self.voice_log().connections.last().expect("never joined")
    }

    /// Deliver a ready report for connection `id`
    pub fn ready(&mut self, id: ConnectionId) {
        self.controller.handle_event(Event::ConnectionReady { guild: GUILD, id });
        self.controller.pump();
    }

    /// Report the bound track as finished
    pub fn finish_current(&mut self) {
        self.report_current(SinkStatus::Idle);
    }

    pub fn fail_current(&mut self, reason: &str) {
        self.report_current(SinkStatus::Error(reason.to_string()));
    }

    fn report_current(&mut self, status: SinkStatus) {
        let id = self.current_id().expect("nothing is playing");
        self.controller.handle_event(Event::Sink {
            guild: GUILD,
            id,
            status,
        });
        self.controller.pump();
    }

    pub fn playing(&self) -> Option<String> {
        self.controller
            .session(GUILD)
            .and_then(|s| s.now_playing.as_ref())
            .map(|now| now.track.label().to_string())
    }

    pub fn state(&self) -> PlayerState {
        self.controller
            .session(GUILD)
            .map(|s| s.state)
            .unwrap_or_default()
    }

    pub fn queue(&self) -> Vec<String> {
        self.controller
            .session(GUILD)
            .map(|s| {
                s.queue
                    .snapshot_head(usize::MAX)
                    .iter()
                    .map(|t| t.label().to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn history(&self) -> Vec<String> {
        self.controller
            .session(GUILD)
            .map(|s| s.queue.history().iter().map(|t| t.label().to_string()).collect())
            .unwrap_or_default()
    }

    pub fn connected(&self) -> bool {
        self.controller
            .session(GUILD)
            .is_some_and(|s| s.has_connection())
    }

    pub fn replies(&self) -> Vec<Reply> {
        self.replies.sent.lock().unwrap().iter().map(|(_, r)| r.clone()).collect()
    }

    pub fn last_reply(&self) -> Option<Reply> {
        self.replies().last().cloned()
    }

    pub fn voice_log(&self) -> std::sync::MutexGuard<'_, VoiceLog> {
        self.voice.log.lock().unwrap()
    }
}
