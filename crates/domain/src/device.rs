use crate::shared::entity::{Entity, ID};

/// A registered mobile device able to receive push notifications
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub id: ID,
    pub user_id: ID,
    /// Push token issued by the messaging provider. Unique across devices.
    pub token: String,
    /// Free form platform tag, e.g. `android` or `ios`
    pub device_type: String,
}

impl Device {
    pub fn new(id: ID, user_id: ID, token: impl Into<String>) -> Self {
        Self {
            id,
            user_id,
            token: token.into(),
            device_type: String::new(),
        }
    }
}

impl Entity for Device {
    fn id(&self) -> &ID {
        &self.id
    }
}
