// EntPost - the slice of a post the engagement core consumes

use serde::{Deserialize, Serialize};

use crate::core::{PostId, Timestamp, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntPost {
    pub id: PostId,
    pub author_id: UserId,
    pub title: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl EntPost {
    pub fn new(id: PostId, author_id: UserId, title: impl Into<String>, now: Timestamp) -> Self {
        Self {
            id,
            author_id,
            title: title.into(),
            created_at: now,
            updated_at: now,
        }
    }
}
