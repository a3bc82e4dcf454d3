use crate::shared::entity::{Entity, ID};

/// Timezone assigned to users whose stored timezone is missing
pub const DEFAULT_USER_TIMEZONE: &str = "Asia/Makassar";

/// The part of a user the reminder pipeline cares about: who they are
/// and which IANA timezone their reminders are computed in.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: ID,
    /// IANA timezone name, e.g. `Asia/Makassar`. It is not validated on
    /// write, so it may fail to resolve when read.
    pub timezone: String,
}

impl User {
    pub fn new(id: ID, timezone: impl Into<String>) -> Self {
        let timezone = timezone.into();
        let timezone = if timezone.trim().is_empty() {
            DEFAULT_USER_TIMEZONE.to_string()
        } else {
            timezone
        };
        Self { id, timezone }
    }
}

impl Entity for User {
    fn id(&self) -> &ID {
        &self.id
    }
}
