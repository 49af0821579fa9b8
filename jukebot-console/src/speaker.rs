//! Local speaker output standing in for a voice channel.
//!
//! Each "connection" owns an output stream on its own thread, since the
//! stream handle cannot leave the thread that opened it. Sinks attach to the
//! stream's mixer and decode from a disk spool filled as the track downloads.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Sender, bounded};
use rodio::mixer::Mixer;
use rodio::{Decoder, OutputStreamBuilder, Sink};

use crate::spool::{Spool, SpoolState, fill};
use jukebot_core::voice::VoiceResult;
use jukebot_core::{
    AudioStream, ChannelId, ConnectionId, EventSender, GuildId, PlaybackId, PlaybackSink, SinkStatus,
    VoiceConnection, VoiceError, VoiceService,
};

#[derive(Debug, Default)]
pub struct SpeakerVoice;

impl VoiceService for SpeakerVoice {
    fn join(
        &mut self,
        guild: GuildId,
        channel: ChannelId,
        id: ConnectionId,
        events: EventSender,
    ) -> VoiceResult<Box<dyn VoiceConnection>> {
        let (mixer_tx, mixer_rx) = bounded::<Result<Mixer, String>>(1);
        let (close_tx, close_rx) = bounded::<()>(0);

        let thread = thread::Builder::new()
            .name(format!("jukebot-audio-{}", guild.0))
            .spawn(move || match OutputStreamBuilder::open_default_stream() {
                Ok(stream) => {
                    let _ = mixer_tx.send(Ok(stream.mixer().clone()));
                    events.connection_ready(guild, id);
                    // Hold the stream open until the connection is destroyed
                    let _ = close_rx.recv();
                    log::debug!("Closing speaker output for {}", guild);
                }
                Err(e) => {
                    let _ = mixer_tx.send(Err(e.to_string()));
                }
            })
            .map_err(|e| VoiceError::Join {
                channel,
                reason: e.to_string(),
            })?;

        let mixer = mixer_rx
            .recv()
            .map_err(|e| e.to_string())
            .and_then(|opened| opened)
            .map_err(|reason| VoiceError::Join { channel, reason })?;

        log::info!("Speaker output opened for {} ({})", guild, channel);
        Ok(Box::new(SpeakerConnection {
            guild,
            mixer,
            close: Some(close_tx),
            thread: Some(thread),
        }))
    }
}

struct SpeakerConnection {
    guild: GuildId,
    mixer: Mixer,
    close: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl VoiceConnection for SpeakerConnection {
    fn create_sink(&mut self, id: PlaybackId, events: EventSender) -> VoiceResult<Box<dyn PlaybackSink>> {
        if self.close.is_none() {
            return Err(VoiceError::Closed);
        }
        Ok(Box::new(SpeakerSink {
            guild: self.guild,
            id,
            events,
            sink: Arc::new(Sink::connect_new(&self.mixer)),
            spool: None,
        }))
    }

    fn destroy(&mut self) {
        // Dropping the sender wakes the stream thread
        self.close.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::warn!("Speaker thread for {} panicked", self.guild);
            }
        }
    }
}

struct SpeakerSink {
    guild: GuildId,
    id: PlaybackId,
    events: EventSender,
    sink: Arc<Sink>,
    spool: Option<SpoolState>,
}

impl PlaybackSink for SpeakerSink {
    fn play(&mut self, stream: AudioStream) -> VoiceResult<()> {
        let spool = Spool::new().map_err(|e| VoiceError::Sink(format!("cannot create spool: {}", e)))?;
        let writer = spool.writer().map_err(|e| VoiceError::Sink(e.to_string()))?;
        let state = spool.state();
        self.spool = Some(state.clone());

        let guild = self.guild;
        let id = self.id;
        let events = self.events.clone();
        let sink = self.sink.clone();

        let fetch_state = state.clone();
        let spawn_state = state.clone();
        thread::Builder::new()
            .name(format!("jukebot-fetch-{}", id.0))
            .spawn(move || fill(writer, stream.into_reader(), &fetch_state))
            .map_err(|e| VoiceError::Sink(e.to_string()))?;

        thread::Builder::new()
            .name(format!("jukebot-sink-{}", id.0))
            .spawn(move || {
                let status = match start(&sink, &spool, &state) {
                    Ok(()) => {
                        sink.sleep_until_end();
                        SinkStatus::Idle
                    }
                    Err(reason) if state.is_cancelled() => {
                        log::debug!("Sink {} stopped while loading: {}", id, reason);
                        SinkStatus::Idle
                    }
                    Err(reason) => SinkStatus::Error(state.failure().unwrap_or(reason)),
                };
                // the spool file lives until playback is over
                drop(spool);
                events.sink_status(guild, id, status);
            })
            .map(|_| ())
            .map_err(|e| {
                spawn_state.cancel();
                VoiceError::Sink(e.to_string())
            })
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn unpause(&mut self) {
        self.sink.play();
    }

    fn stop(&mut self) {
        if let Some(spool) = &self.spool {
            spool.cancel();
        }
        self.sink.stop();
    }
}

/// Decode from the spool once the container format is recognised and queue
/// the track on the sink.
fn start(sink: &Sink, spool: &Spool, state: &SpoolState) -> Result<(), String> {
    let reader = spool.reader().map_err(|e| e.to_string())?;
    let source = Decoder::new(reader).map_err(|e| format!("decoding failed: {}", e))?;
    if state.is_cancelled() {
        return Ok(());
    }
    sink.append(source);
    if state.is_cancelled() {
        sink.stop();
    }
    Ok(())
}
