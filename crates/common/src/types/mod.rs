use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
pub struct Health {
    pub status: &'static str,
}

/// Generic `{"message": ...}` body used by endpoints that only report an outcome.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}
