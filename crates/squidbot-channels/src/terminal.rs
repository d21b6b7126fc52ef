use std::io::Write as _;
use std::pin::Pin;
use std::sync::Mutex;

use async_trait::async_trait;
use squidbot_types::Session;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::LinesStream;
use tokio_stream::{Stream, StreamExt};

use crate::channel::Channel;
use crate::error::ChannelError;
use crate::types::InboundMessage;

/// The minimal zero-network channel: reads lines from stdin, writes
/// replies to stdout. Used by the `agent` CLI subcommand and as the
/// Channel Contract's conformance baseline.
pub struct TerminalChannel {
    session: Session,
    stdout: Mutex<std::io::Stdout>,
}

impl TerminalChannel {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            stdout: Mutex::new(std::io::stdout()),
        }
    }
}

#[async_trait]
impl Channel for TerminalChannel {
    fn name(&self) -> &str {
        "cli"
    }

    fn streaming(&self) -> bool {
        true
    }

    fn receive(&self) -> Pin<Box<dyn Stream<Item = InboundMessage> + Send + '_>> {
        let reader = BufReader::new(tokio::io::stdin());
        let lines = LinesStream::new(reader.lines());
        let session = self.session.clone();
        Box::pin(lines.filter_map(move |line| line.ok().map(|text| InboundMessage::new(session.clone(), text))))
    }

    async fn send(&self, _session: &Session, text: &str, final_chunk: bool) -> Result<(), ChannelError> {
        let mut stdout = self.stdout.lock().map_err(|_| ChannelError::SendFailed("stdout lock poisoned".into()))?;
        write!(stdout, "{text}").map_err(|e| ChannelError::SendFailed(e.to_string()))?;
        if final_chunk {
            writeln!(stdout).map_err(|e| ChannelError::SendFailed(e.to_string()))?;
        }
        stdout.flush().map_err(|e| ChannelError::SendFailed(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_does_not_error_on_plain_text() {
        let channel = TerminalChannel::new(Session::new("cli", "local"));
        let session = Session::new("cli", "local");
        channel.send(&session, "hello", false).await.unwrap();
        channel.send(&session, "", true).await.unwrap();
    }

    #[test]
    fn channel_reports_streaming_and_name() {
        let channel = TerminalChannel::new(Session::new("cli", "local"));
        assert!(channel.streaming());
        assert_eq!(channel.name(), "cli");
    }
}
