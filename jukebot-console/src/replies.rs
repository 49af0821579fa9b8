use jukebot_core::{ChannelId, Reply, ReplySink};

/// Prints replies to the terminal, tagged with the channel they were meant for
#[derive(Debug, Default)]
pub struct ConsoleReplies;

impl ReplySink for ConsoleReplies {
    fn send(&self, channel: ChannelId, reply: Reply) {
        if reply.is_error() {
            eprintln!("[{}] {}", channel, reply);
        } else {
            println!("[{}] {}", channel, reply);
        }
    }
}
