//! Queue and playback state machine for a voice-channel music bot.
//!
//! Chat input, the streaming catalogue and the voice transport are traits;
//! this crate owns what sits between them: resolving queries into tracks,
//! the per-guild queue and history, and the controller loop that advances
//! playback as sinks report completion.

pub mod commands;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod locator;
pub mod queue;
pub mod reply;
pub mod resolver;
pub mod session;
pub mod source;
pub mod track;
pub mod voice;
pub mod worker;
pub mod ytdl;

pub use commands::{Command, CommandRequest};
pub use config::BotConfig;
pub use controller::{ControllerHandle, PlaybackController};
pub use error::{ControllerError, Result};
pub use events::{Event, EventSender, SinkStatus};
pub use reply::{Reply, ReplySink};
pub use resolver::{Resolution, Resolver};
pub use session::PlayerState;
pub use source::{AudioStream, SourceError, StreamingSource};
pub use track::{ChannelId, ConnectionId, GuildId, PlaybackId, Track};
pub use voice::{PlaybackSink, VoiceConnection, VoiceError, VoiceService};
