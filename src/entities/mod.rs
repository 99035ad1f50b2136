// Entity records persisted by the record store

pub mod ent_comment;
pub mod ent_post;
pub mod ent_user;

pub use ent_comment::{CommentView, EntComment};
pub use ent_post::EntPost;
pub use ent_user::EntUser;
