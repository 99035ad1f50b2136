// Blog engagement core - comments, likes, paginated listings and admin statistics

// Core types and primitives
pub mod core;

// Records the store persists
pub mod entities;

// Privacy rules
pub mod ent_framework;

// Record stores, ids, clock, viewer context and middleware
pub mod infrastructure;

// Engagement, listing, statistics and post services
pub mod services;

// HTTP surface
pub mod app_state;
pub mod blog_interface;
pub mod config;

// Common utilities
pub mod error;

pub use error::{AppError, AppResult};
