// EntUser - account fields the engagement core reads (identity, role, age)

use serde::{Deserialize, Serialize};

use crate::core::{Timestamp, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntUser {
    pub id: UserId,
    pub username: String,
    pub is_admin: bool,
    pub created_at: Timestamp,
}

impl EntUser {
    pub fn new(id: UserId, username: impl Into<String>, is_admin: bool, now: Timestamp) -> Self {
        Self {
            id,
            username: username.into(),
            is_admin,
            created_at: now,
        }
    }
}
