// Ent Framework - privacy rules shared by every service

pub mod ent_privacy;

pub use ent_privacy::{
    create_blog_privacy_registry, PrivacyContext, PrivacyOperation, PrivacyRegistry,
    PrivacyResult, PrivacyRule,
};
