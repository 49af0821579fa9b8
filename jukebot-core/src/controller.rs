use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, unbounded};

use crate::commands::{Command, CommandRequest};
use crate::config::BotConfig;
use crate::error::{ControllerError, Result};
use crate::events::{Event, EventSender, JobOutcome, SinkStatus};
use crate::locator;
use crate::reply::{Reply, ReplySink};
use crate::resolver::{Resolution, Resolver};
use crate::session::{NowPlaying, PlayerState, Session};
use crate::source::{SourceError, StreamingSource};
use crate::track::{ChannelId, ConnectionId, GuildId, PlaybackId, Track};
use crate::voice::{PlaybackSink, VoiceError, VoiceService};
use crate::worker::{Dispatch, InlineDispatch, JobKind, ResolveJob, ResolverWorker};

/// Handle used by command sources to talk to a running controller
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    events: EventSender,
}

impl ControllerHandle {
    pub fn submit(&self, request: CommandRequest) -> Result<()> {
        if self.events.send(Event::Command(request)) {
            Ok(())
        } else {
            Err(ControllerError::Disconnected)
        }
    }

    /// Stop every session and end the controller loop
    pub fn shutdown(&self) -> Result<()> {
        if self.events.send(Event::Shutdown) {
            Ok(())
        } else {
            Err(ControllerError::Disconnected)
        }
    }
}

/// Why a queued track could not be started
enum StartError {
    /// The track itself is unplayable; it counts as played
    Track(String),
    /// The voice connection is unusable; the track goes back to the queue
    Connection(VoiceError),
}

/// Owns every session and reacts to events one at a time.
///
/// Commands, resolver results, connection readiness and sink status all
/// arrive on one queue, so no session state is ever touched concurrently.
pub struct PlaybackController {
    sessions: HashMap<GuildId, Session>,
    source: Arc<dyn StreamingSource>,
    voice: Box<dyn VoiceService>,
    replies: Box<dyn ReplySink>,
    dispatch: Box<dyn Dispatch>,
    events: EventSender,
    event_rx: Receiver<Event>,
    next_playback: u64,
    next_connection: u64,
    next_epoch: u64,
    queue_preview: usize,
}

impl PlaybackController {
    /// Controller whose lookups run on a background resolver thread
    pub fn new(
        config: &BotConfig,
        source: Arc<dyn StreamingSource>,
        voice: Box<dyn VoiceService>,
        replies: Box<dyn ReplySink>,
    ) -> Result<(Self, ControllerHandle)> {
        let (tx, event_rx) = unbounded();
        let events = EventSender::new(tx);
        let resolver = Resolver::new(source.clone(), config.mix_size);
        let dispatch = Box::new(ResolverWorker::spawn(resolver, events.clone())?);
        Ok(Self::assemble(config, source, voice, replies, dispatch, events, event_rx))
    }

    /// Controller that resolves on its own thread, in command order
    pub fn new_inline(
        config: &BotConfig,
        source: Arc<dyn StreamingSource>,
        voice: Box<dyn VoiceService>,
        replies: Box<dyn ReplySink>,
    ) -> (Self, ControllerHandle) {
        let (tx, event_rx) = unbounded();
        let events = EventSender::new(tx);
        let resolver = Resolver::new(source.clone(), config.mix_size);
        let dispatch = Box::new(InlineDispatch::new(resolver, events.clone()));
        Self::assemble(config, source, voice, replies, dispatch, events, event_rx)
    }

    fn assemble(
        config: &BotConfig,
        source: Arc<dyn StreamingSource>,
        voice: Box<dyn VoiceService>,
        replies: Box<dyn ReplySink>,
        dispatch: Box<dyn Dispatch>,
        events: EventSender,
        event_rx: Receiver<Event>,
    ) -> (Self, ControllerHandle) {
        let handle = ControllerHandle {
            events: events.clone(),
        };
        let controller = Self {
            sessions: HashMap::new(),
            source,
            voice,
            replies,
            dispatch,
            events,
            event_rx,
            next_playback: 1,
            next_connection: 1,
            next_epoch: 0,
            queue_preview: config.queue_preview.max(1),
        };
        (controller, handle)
    }

    /// Run the loop on a dedicated thread
    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("jukebot-controller".to_string())
            .spawn(move || self.run())
    }

    /// Handle events until `Shutdown` arrives
    pub fn run(mut self) {
        log::info!("Playback controller started");
        while let Ok(event) = self.event_rx.recv() {
            if !self.handle_event(event) {
                break;
            }
        }
        log::info!("Playback controller stopped");
    }

    /// Handle every event already queued without blocking.
    ///
    /// Returns false once `Shutdown` has been handled.
    pub fn pump(&mut self) -> bool {
        while let Ok(event) = self.event_rx.try_recv() {
            if !self.handle_event(event) {
                return false;
            }
        }
        true
    }

    pub fn session(&self, guild: GuildId) -> Option<&Session> {
        self.sessions.get(&guild)
    }

    /// Returns false when the loop should end
    pub fn handle_event(&mut self, event: Event) -> bool {
        match event {
            Event::Command(request) => self.handle_command(request),
            Event::JobDone {
                guild,
                epoch,
                query,
                voice_channel,
                text_channel,
                outcome,
            } => self.on_job_done(guild, epoch, query, voice_channel, text_channel, outcome),
            Event::ConnectionReady { guild, id } => self.on_connection_ready(guild, id),
            Event::Sink { guild, id, status } => self.on_sink_status(guild, id, status),
            Event::Shutdown => {
                let guilds: Vec<GuildId> = self.sessions.keys().copied().collect();
                for guild in guilds {
                    self.stop_session(guild);
                }
                return false;
            }
        }
        true
    }

    fn reply(&self, channel: ChannelId, reply: Reply) {
        if reply.is_error() {
            log::debug!("Replying with error to {}: {:?}", channel, reply);
        }
        self.replies.send(channel, reply);
    }

    // ==============================================
    // Commands
    // ==============================================

    /// Session for `guild`, created with a fresh epoch when missing
    fn session_entry(&mut self, guild: GuildId) -> &mut Session {
        let next_epoch = &mut self.next_epoch;
        self.sessions.entry(guild).or_insert_with(|| {
            *next_epoch += 1;
            Session::new(guild, *next_epoch)
        })
    }

    /// The bound track of `guild` and the state it plays in
    fn bound_track(&mut self, guild: GuildId) -> Option<(&mut NowPlaying, &mut PlayerState)> {
        let Session {
            now_playing, state, ..
        } = self.sessions.get_mut(&guild)?;
        now_playing.as_mut().map(|now| (now, state))
    }

    fn handle_command(&mut self, request: CommandRequest) {
        let CommandRequest {
            command,
            guild,
            voice_channel,
            text_channel,
        } = request;
        log::debug!("{} from {}", command.name(), guild);

        match command {
            Command::Play(query) => {
                let Some(channel) = voice_channel else {
                    self.reply(text_channel, Reply::NotInVoiceChannel);
                    return;
                };
                let query = query.trim().to_string();
                if query.is_empty() {
                    self.reply(text_channel, Reply::MissingQuery);
                    return;
                }
                let job = ResolveJob {
                    kind: JobKind::Resolve,
                    guild,
                    epoch: self.session_entry(guild).epoch,
                    query,
                    voice_channel: Some(channel),
                    text_channel,
                };
                self.dispatch.submit(job);
            }
            Command::Playlist(url) => {
                let url = url.trim().to_string();
                if url.is_empty() {
                    self.reply(text_channel, Reply::MissingPlaylistUrl);
                    return;
                }
                if locator::playlist_id(&url).is_none() {
                    self.reply(text_channel, Reply::InvalidPlaylist { url });
                    return;
                }
                // Listing touches no session, so the epoch is never checked
                let job = ResolveJob {
                    kind: JobKind::InspectPlaylist,
                    guild,
                    epoch: 0,
                    query: url,
                    voice_channel,
                    text_channel,
                };
                self.dispatch.submit(job);
            }
            Command::Pause => {
                let reply = match self.bound_track(guild) {
                    Some((now, state)) => {
                        now.sink.pause();
                        *state = PlayerState::Paused;
                        Reply::Paused
                    }
                    None => Reply::NothingPlaying,
                };
                self.reply(text_channel, reply);
            }
            Command::Resume => {
                let reply = match self.bound_track(guild) {
                    Some((now, state)) => {
                        now.sink.unpause();
                        *state = PlayerState::Playing;
                        Reply::Resumed
                    }
                    None => Reply::NothingPlaying,
                };
                self.reply(text_channel, reply);
            }
            Command::Skip => {
                // The sink's Idle event records the track and advances
                let reply = match self.bound_track(guild) {
                    Some((now, _)) => {
                        log::info!("Skipping {} in {}", now.track, guild);
                        now.sink.stop();
                        Reply::Skipped
                    }
                    None => Reply::NothingPlaying,
                };
                self.reply(text_channel, reply);
            }
            Command::Queue => {
                let reply = match self.sessions.get(&guild).filter(|s| !s.queue.is_empty()) {
                    Some(session) => Reply::QueueListing {
                        upcoming: session.queue.snapshot_head(self.queue_preview),
                        total: session.queue.len(),
                    },
                    None => Reply::QueueEmpty,
                };
                self.reply(text_channel, reply);
            }
            Command::Back => self.go_back(guild, voice_channel, text_channel),
            Command::Stop => {
                self.stop_session(guild);
                self.reply(text_channel, Reply::Stopped);
            }
        }
    }

    /// Requeue the most recent history entry at the head and play it.
    ///
    /// While a track is bound, it is force-stopped and the completion path
    /// records it into history before the requeued track is dequeued.
    fn go_back(&mut self, guild: GuildId, voice_channel: Option<ChannelId>, text_channel: ChannelId) {
        let Some(session) = self
            .sessions
            .get_mut(&guild)
            .filter(|s| s.queue.history_len() > 0)
        else {
            self.reply(text_channel, Reply::HistoryEmpty);
            return;
        };

        if session.now_playing.is_none() && voice_channel.is_none() && !session.has_connection() {
            self.reply(text_channel, Reply::NotInVoiceChannel);
            return;
        }

        let Some(previous) = session.queue.pop_history() else {
            return;
        };
        log::info!("Going back to {} in {}", previous, guild);
        session.queue.requeue_front(previous.clone());

        match session.now_playing.as_mut() {
            Some(now) => {
                now.sink.stop();
                self.reply(text_channel, Reply::PlayingPrevious { track: previous });
            }
            None => {
                let channel = voice_channel.or_else(|| session.voice_channel());
                self.reply(text_channel, Reply::PlayingPrevious { track: previous });
                if let Some(channel) = channel {
                    self.start_playback(guild, channel, text_channel);
                }
            }
        }
    }

    /// Hard reset: the session is dropped with its queue, history and
    /// connection.
    ///
    /// The sink is unbound before it is stopped, so its final Idle event finds
    /// no session and does not advance.
    fn stop_session(&mut self, guild: GuildId) {
        let Some(mut session) = self.sessions.remove(&guild) else {
            return;
        };
        log::info!("Stopping playback in {}", guild);
        if let Some(mut now) = session.now_playing.take() {
            now.sink.stop();
        }
        session.teardown();
    }

    // ==============================================
    // Resolver results
    // ==============================================

    fn on_job_done(
        &mut self,
        guild: GuildId,
        epoch: u64,
        query: String,
        voice_channel: Option<ChannelId>,
        text_channel: ChannelId,
        outcome: JobOutcome,
    ) {
        let resolution = match outcome {
            JobOutcome::Listed(listing) => {
                let reply = match listing {
                    Ok(listing) => Reply::PlaylistListing {
                        title: listing.title,
                        entries: listing.entries,
                    },
                    Err(SourceError::InvalidLocator(url)) => Reply::InvalidPlaylist { url },
                    Err(e) => Reply::LookupFailed {
                        reason: e.to_string(),
                    },
                };
                self.reply(text_channel, reply);
                return;
            }
            JobOutcome::Resolved(resolution) => resolution,
        };

        let Some(session) = self.sessions.get_mut(&guild).filter(|s| s.epoch == epoch) else {
            log::info!("Discarding results for {:?}: playback in {} was stopped", query, guild);
            return;
        };

        let replies = match &resolution {
            Resolution::NotFound => vec![Reply::NotFound { query }],
            Resolution::LookupFailed(reason) => vec![Reply::LookupFailed {
                reason: reason.clone(),
            }],
            Resolution::SingleTrack(track) | Resolution::SearchResult(track) => {
                vec![Reply::Enqueued { track: track.clone() }]
            }
            Resolution::SingleTrackWithPlaylist {
                track,
                playlist_title,
                entries,
            } => {
                let mut replies = vec![Reply::Enqueued { track: track.clone() }];
                if !entries.is_empty() {
                    replies.push(Reply::PlaylistEnqueued {
                        title: playlist_title.clone(),
                        count: entries.len(),
                    });
                }
                replies
            }
            Resolution::SingleTrackWithMix { track, entries } => {
                let mut replies = vec![Reply::Enqueued { track: track.clone() }];
                replies.extend(mix_reply(entries));
                replies
            }
            Resolution::Playlist { title, entries } => vec![Reply::PlaylistEnqueued {
                title: title.clone(),
                count: entries.len(),
            }],
            Resolution::Mix { entries } => mix_reply(entries).into_iter().collect(),
        };

        let tracks = resolution.tracks();
        let queued = !tracks.is_empty();
        session.queue.enqueue_many(tracks);

        for reply in replies {
            self.reply(text_channel, reply);
        }
        if !queued {
            return;
        }

        match voice_channel {
            Some(channel) => self.start_playback(guild, channel, text_channel),
            None => log::warn!("Tracks queued in {} without a voice channel to play in", guild),
        }
    }

    // ==============================================
    // Connection and playback
    // ==============================================

    /// Make sure a connection exists and, if it is ready, start playing
    fn start_playback(&mut self, guild: GuildId, channel: ChannelId, text_channel: ChannelId) {
        let id = ConnectionId(self.next_connection);
        self.next_connection += 1;

        let Some(session) = self.sessions.get_mut(&guild) else {
            return;
        };
        if let Err(e) = session.ensure_connection(self.voice.as_mut(), channel, id, &self.events) {
            log::error!("Could not connect to {} in {}: {}", channel, guild, e);
            self.reply(
                text_channel,
                Reply::VoiceUnavailable {
                    reason: e.to_string(),
                },
            );
            return;
        }
        if session.is_ready() {
            self.advance(guild);
        }
    }

    fn on_connection_ready(&mut self, guild: GuildId, id: ConnectionId) {
        let Some(session) = self.sessions.get_mut(&guild) else {
            log::debug!("Ready event for {} in {} without a session", id, guild);
            return;
        };
        if !session.mark_ready(id) {
            log::debug!("Ignoring ready event from stale {} in {}", id, guild);
            return;
        }
        log::info!("Voice connection {} ready in {}", id, guild);
        self.advance(guild);
    }

    fn on_sink_status(&mut self, guild: GuildId, id: PlaybackId, status: SinkStatus) {
        let Some(session) = self.sessions.get_mut(&guild) else {
            return;
        };
        let is_current = session.now_playing.as_ref().is_some_and(|now| now.id == id);
        if !is_current {
            log::debug!("Ignoring {:?} from stale sink {} in {}", status, id, guild);
            return;
        }

        if let Some(now) = session.now_playing.take() {
            match &status {
                SinkStatus::Idle => log::info!("Finished {} in {}", now.track, guild),
                SinkStatus::Error(reason) => {
                    log::error!("Playback of {} failed in {}: {}", now.track, guild, reason)
                }
            }
            session.queue.push_history(now.track);
        }
        session.state = PlayerState::Idle;
        self.advance(guild);
    }

    /// Start the next queued track, or leave voice when nothing is left.
    ///
    /// Unplayable tracks are recorded as played and the next one is tried.
    fn advance(&mut self, guild: GuildId) {
        let Some(session) = self.sessions.get_mut(&guild) else {
            return;
        };
        if session.is_playing() {
            return;
        }
        if session.queue.is_empty() {
            session.state = PlayerState::Idle;
            session.teardown();
            return;
        }
        if !session.is_ready() {
            log::debug!("Waiting for the voice connection in {}", guild);
            return;
        }

        while let Some(track) = session.queue.dequeue_head() {
            let id = PlaybackId(self.next_playback);
            self.next_playback += 1;

            match start_track(self.source.as_ref(), session, id, &track, &self.events) {
                Ok(sink) => {
                    log::info!("Now playing {} in {} (sink {})", track, guild, id);
                    session.now_playing = Some(NowPlaying { id, track, sink });
                    session.state = PlayerState::Playing;
                    return;
                }
                Err(StartError::Track(reason)) => {
                    log::error!("Could not start {} in {}: {}", track, guild, reason);
                    session.queue.push_history(track);
                }
                Err(StartError::Connection(e)) => {
                    log::error!("Voice connection in {} failed: {}", guild, e);
                    session.queue.requeue_front(track);
                    session.state = PlayerState::Idle;
                    session.teardown();
                    return;
                }
            }
        }

        log::info!("Queue drained in {}", guild);
        session.state = PlayerState::Idle;
        session.teardown();
    }
}

fn mix_reply(entries: &[Track]) -> Option<Reply> {
    entries.first().map(|first| Reply::MixEnqueued {
        title: first.label().to_string(),
        count: entries.len(),
    })
}

fn start_track(
    source: &dyn StreamingSource,
    session: &mut Session,
    id: PlaybackId,
    track: &Track,
    events: &EventSender,
) -> std::result::Result<Box<dyn PlaybackSink>, StartError> {
    let stream = source
        .get_stream(track)
        .map_err(|e| StartError::Track(e.to_string()))?;
    let connection = session
        .connection_mut()
        .ok_or(StartError::Connection(VoiceError::Closed))?;
    let mut sink = connection
        .create_sink(id, events.clone())
        .map_err(StartError::Connection)?;
    sink.play(stream).map_err(|e| StartError::Track(e.to_string()))?;
    Ok(sink)
}
