pub mod channel;
pub mod error;
pub mod terminal;
pub mod types;

pub use channel::Channel;
pub use error::ChannelError;
pub use terminal::TerminalChannel;
pub use types::InboundMessage;
