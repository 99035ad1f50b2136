// Core types and primitives shared by every layer

pub mod strong_types;

pub use strong_types::{CommentId, EntityKind, PostId, Timestamp, UserId};
