use serde::{Deserialize, Serialize};
use std::env;

use crate::error::{AppError, AppResult};
use crate::infrastructure::id_generator::MAX_NODE_ID;
use crate::services::listing_service::{DEFAULT_MAX_PAGE_SIZE, DEFAULT_PAGE_SIZE};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub engagement: EngagementConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementConfig {
    pub node_id: u16,
    pub page_size: u32,
    pub max_page_size: u32,
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unparsable numbers fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let config = Self {
            database: DatabaseConfig {
                url: lookup("DATABASE_URL")
                    .unwrap_or_else(|| "sqlite:blog_engagement.db".to_string()),
                max_connections: parse_or(lookup("DB_MAX_CONNECTIONS"), 5),
            },
            server: ServerConfig {
                host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(lookup("SERVER_PORT"), 3000),
            },
            engagement: EngagementConfig {
                node_id: parse_or(lookup("NODE_ID"), 0),
                page_size: parse_or(lookup("PAGE_SIZE"), DEFAULT_PAGE_SIZE),
                max_page_size: parse_or(lookup("MAX_PAGE_SIZE"), DEFAULT_MAX_PAGE_SIZE),
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        let engagement = &self.engagement;
        if engagement.node_id >= MAX_NODE_ID {
            return Err(AppError::ConfigurationError(format!(
                "NODE_ID must be less than {}, got {}",
                MAX_NODE_ID, engagement.node_id
            )));
        }
        if engagement.page_size == 0 || engagement.page_size > engagement.max_page_size {
            return Err(AppError::ConfigurationError(format!(
                "PAGE_SIZE must be between 1 and MAX_PAGE_SIZE ({}), got {}",
                engagement.max_page_size, engagement.page_size
            )));
        }
        Ok(())
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
