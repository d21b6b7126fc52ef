use std::pin::Pin;

use async_trait::async_trait;
use squidbot_types::Session;
use tokio_stream::Stream;

use crate::error::ChannelError;
use crate::types::InboundMessage;

/// A capability for sending to and receiving from one messaging surface
/// (terminal, chat room, email). Implementations must be safe to share
/// across tasks: `send` calls from the scheduler, the heartbeat, and the
/// inbound fan-in may interleave.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    /// If true, the Agent Loop calls `send` once per text chunk with
    /// `final=false`, then once more with `final=true`; if false, `send`
    /// is called exactly once with the fully-assembled text.
    fn streaming(&self) -> bool;

    /// Yields inbound messages until the channel is shut down.
    fn receive(&self) -> Pin<Box<dyn Stream<Item = InboundMessage> + Send + '_>>;

    async fn send(&self, session: &Session, text: &str, final_chunk: bool) -> Result<(), ChannelError>;
}
