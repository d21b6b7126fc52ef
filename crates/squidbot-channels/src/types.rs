use squidbot_types::Session;

/// A message yielded by a channel's inbound stream.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub session: Session,
    pub text: String,
    pub attachments: Vec<String>,
}

impl InboundMessage {
    pub fn new(session: Session, text: impl Into<String>) -> Self {
        Self {
            session,
            text: text.into(),
            attachments: Vec::new(),
        }
    }
}
