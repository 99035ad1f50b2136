use serde::Serialize;

use crate::core::UserId;
use crate::error::{AppError, AppResult};

/// An authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub user_id: UserId,
    pub is_admin: bool,
}

/// Request-scoped identity. Every engagement operation receives one of these
/// and never reads identity from anywhere else.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerContext {
    pub actor: Option<Actor>,
    pub request_id: String,
}

impl ViewerContext {
    pub fn authenticated_user(user_id: UserId, request_id: String) -> Self {
        Self {
            actor: Some(Actor {
                user_id,
                is_admin: false,
            }),
            request_id,
        }
    }

    pub fn admin(user_id: UserId, request_id: String) -> Self {
        Self {
            actor: Some(Actor {
                user_id,
                is_admin: true,
            }),
            request_id,
        }
    }

    pub fn anonymous(request_id: String) -> Self {
        Self {
            actor: None,
            request_id,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.actor.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.actor.map_or(false, |actor| actor.is_admin)
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.actor.map(|actor| actor.user_id)
    }

    /// The caller as an actor, or `Unauthorized` for anonymous requests.
    pub fn require_actor(&self) -> AppResult<Actor> {
        self.actor
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}
