use std::str::FromStr;

use strum::{EnumIter, IntoEnumIterator};

use crate::track::{ChannelId, GuildId};

/// Command names understood in chat, without the prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CommandName {
    Play,
    Pause,
    Resume,
    Stop,
    Skip,
    Queue,
    Back,
    Playlist,
}

impl CommandName {
    pub fn usage(&self) -> &'static str {
        match self {
            CommandName::Play => "play <url or search terms>",
            CommandName::Pause => "pause",
            CommandName::Resume => "resume",
            CommandName::Stop => "stop",
            CommandName::Skip => "skip",
            CommandName::Queue => "queue",
            CommandName::Back => "back",
            CommandName::Playlist => "playlist <url>",
        }
    }
}

/// Commands sent from the chat front-end to the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Resolve a query and queue the result
    Play(String),
    /// Pause the current track
    Pause,
    /// Resume a paused track
    Resume,
    /// Clear everything and leave the voice channel
    Stop,
    /// End the current track early
    Skip,
    /// Show what is coming up
    Queue,
    /// Play the previous track again
    Back,
    /// List a playlist without queueing it
    Playlist(String),
}

impl Command {
    /// Parse a chat message such as `!play never gonna give you up`.
    ///
    /// Returns `None` for messages without the prefix or with an unknown name.
    pub fn parse(prefix: &str, text: &str) -> Option<Command> {
        let body = text.trim().strip_prefix(prefix)?;
        let (name, argument) = match body.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (body, ""),
        };

        let command = match CommandName::from_str(name).ok()? {
            CommandName::Play => Command::Play(argument.to_string()),
            CommandName::Pause => Command::Pause,
            CommandName::Resume => Command::Resume,
            CommandName::Stop => Command::Stop,
            CommandName::Skip => Command::Skip,
            CommandName::Queue => Command::Queue,
            CommandName::Back => Command::Back,
            CommandName::Playlist => Command::Playlist(argument.to_string()),
        };
        Some(command)
    }

    pub fn name(&self) -> CommandName {
        match self {
            Command::Play(_) => CommandName::Play,
            Command::Pause => CommandName::Pause,
            Command::Resume => CommandName::Resume,
            Command::Stop => CommandName::Stop,
            Command::Skip => CommandName::Skip,
            Command::Queue => CommandName::Queue,
            Command::Back => CommandName::Back,
            Command::Playlist(_) => CommandName::Playlist,
        }
    }
}

/// One line per command, for help output
pub fn help_text(prefix: &str) -> String {
    CommandName::iter()
        .map(|name| format!("{}{}", prefix, name.usage()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A command together with where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub command: Command,
    pub guild: GuildId,
    /// Voice channel the issuer is in, if any
    pub voice_channel: Option<ChannelId>,
    /// Where replies go
    pub text_channel: ChannelId,
}
