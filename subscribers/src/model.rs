use serde::{Deserialize, Serialize};

pub type SubscriberId = i64;

/// An addressable recipient of broadcasts: a chat or a user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: SubscriberId,
    pub display_name: String,
}

impl Subscriber {
    pub fn new(id: SubscriberId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }

    /// Store key: decimal id.
    pub fn key(&self) -> String {
        self.id.to_string()
    }
}
