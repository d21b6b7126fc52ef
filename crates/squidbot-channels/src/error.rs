use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel send failed: {0}")]
    SendFailed(String),
    #[error("channel is closed")]
    Closed,
    #[error("channel configuration error: {0}")]
    Config(String),
}
