// EntComment - the engagement record: content plus the set of users who liked it

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::core::{CommentId, PostId, Timestamp, UserId};

/// Persisted comment shape.
///
/// `liked_by` is a set, so an actor can appear at most once. The like count is
/// never stored; it is always `liked_by.len()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntComment {
    pub id: CommentId,
    pub post_id: PostId,
    pub author_id: UserId,
    pub content: String,
    pub liked_by: BTreeSet<UserId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl EntComment {
    pub fn new(
        id: CommentId,
        post_id: PostId,
        author_id: UserId,
        content: String,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            post_id,
            author_id,
            content,
            liked_by: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn number_of_likes(&self) -> usize {
        self.liked_by.len()
    }

    pub fn is_liked_by(&self, user_id: UserId) -> bool {
        self.liked_by.contains(&user_id)
    }
}

/// Comment as returned to clients, with the derived like count attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: EntComment,
    pub number_of_likes: usize,
}

impl From<EntComment> for CommentView {
    fn from(comment: EntComment) -> Self {
        let number_of_likes = comment.number_of_likes();
        Self {
            comment,
            number_of_likes,
        }
    }
}
