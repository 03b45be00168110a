/// Raw payload delivered by a transport
/// Can be Text or Binary data
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    Text(String),
    Binary(Vec<u8>),
}

impl FeedMessage {
    /// Get the message as text, if it is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FeedMessage::Text(s) => Some(s),
            FeedMessage::Binary(_) => None,
        }
    }

    /// Get the message as bytes, regardless of variant
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            FeedMessage::Text(s) => s.as_bytes(),
            FeedMessage::Binary(b) => b,
        }
    }

    /// Check if message is text
    pub fn is_text(&self) -> bool {
        matches!(self, FeedMessage::Text(_))
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for FeedMessage {
    fn from(value: String) -> Self {
        FeedMessage::Text(value)
    }
}

impl From<&str> for FeedMessage {
    fn from(value: &str) -> Self {
        FeedMessage::Text(value.to_string())
    }
}

impl From<serde_json::Value> for FeedMessage {
    fn from(value: serde_json::Value) -> Self {
        FeedMessage::Text(value.to_string())
    }
}
