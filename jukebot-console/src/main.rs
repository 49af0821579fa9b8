use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::Context;
use jukebot_core::commands::help_text;
use jukebot_core::ytdl::YtDlpSource;
use jukebot_core::{BotConfig, ChannelId, Command, CommandRequest, ControllerHandle, GuildId, PlaybackController};

mod logger;
mod replies;
mod speaker;
mod spool;

use replies::ConsoleReplies;
use speaker::SpeakerVoice;

/// Terminal-only inputs that never reach the controller
enum ConsoleInput {
    Quit,
    Help,
    /// `/voice <id>` or `/voice none`
    SetVoice(Option<ChannelId>),
    Chat(String),
}

fn parse_input(line: &str) -> Option<ConsoleInput> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let input = match line {
        "quit" | "exit" => ConsoleInput::Quit,
        "help" => ConsoleInput::Help,
        _ => match line.strip_prefix("/voice") {
            Some(arg) => match arg.trim() {
                "none" | "" => ConsoleInput::SetVoice(None),
                id => match id.parse::<u64>() {
                    Ok(id) => ConsoleInput::SetVoice(Some(ChannelId(id))),
                    Err(_) => ConsoleInput::Chat(line.to_string()),
                },
            },
            None => ConsoleInput::Chat(line.to_string()),
        },
    };
    Some(input)
}

fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = BotConfig::load(config_path.as_deref()).context("Cannot load configuration")?;

    logger::setup_logger(&config.log_level);
    log::info!("Starting jukebot console");

    let source = Arc::new(YtDlpSource::new(&config));
    let (controller, handle) = PlaybackController::new(
        &config,
        source,
        Box::new(SpeakerVoice),
        Box::new(ConsoleReplies),
    )?;
    let controller_thread = controller.spawn().context("Cannot start playback controller")?;

    let result = run_console(&config, &handle);
    finish(&handle, controller_thread, result)
}

/// Stop the controller and wait for it, keeping the console's own outcome
fn finish(
    handle: &ControllerHandle,
    controller_thread: JoinHandle<()>,
    result: anyhow::Result<()>,
) -> anyhow::Result<()> {
    // The loop may already be gone if the console failed with Disconnected
    if let Err(e) = handle.shutdown() {
        log::warn!("Could not signal shutdown: {}", e);
    }
    if controller_thread.join().is_err() {
        log::error!("Playback controller panicked");
    }
    result
}

fn run_console(config: &BotConfig, handle: &ControllerHandle) -> anyhow::Result<()> {
    let prefix = config.command_prefix.as_str();
    let guild = GuildId(config.console.guild);
    let text_channel = ChannelId(config.console.text_channel);
    let mut voice_channel = config.console.voice_channel.map(ChannelId);

    println!("{}", help_text(prefix));
    println!("/voice <id|none>\nhelp\nquit");

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        match parse_input(&line) {
            None => {}
            Some(ConsoleInput::Quit) => break,
            Some(ConsoleInput::Help) => println!("{}", help_text(prefix)),
            Some(ConsoleInput::SetVoice(channel)) => {
                voice_channel = channel;
                match channel {
                    Some(channel) => println!("Now in voice channel {}", channel),
                    None => println!("Left voice"),
                }
            }
            Some(ConsoleInput::Chat(text)) => match Command::parse(prefix, &text) {
                Some(command) => handle.submit(CommandRequest {
                    command,
                    guild,
                    voice_channel,
                    text_channel,
                })?,
                None => println!("Unknown command, try help"),
            },
        }
        io::stdout().flush()?;
    }

    Ok(())
}
