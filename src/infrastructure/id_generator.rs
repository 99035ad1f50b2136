// Record ID Generator - Snowflake-like IDs with embedded node information
// 64-bit ID format: [timestamp:42][node_id:10][sequence:12]

use std::sync::Mutex;

use chrono::Utc;

use crate::error::{AppError, AppResult};

pub const MAX_NODE_ID: u16 = 1024;
const MAX_SEQUENCE: u64 = 4096;

#[derive(Debug, Default)]
struct GeneratorState {
    last_timestamp: u64,
    sequence: u64,
}

/// Allocates record ids for comments (and seeded posts/users).
/// Supports 1024 nodes and 4096 IDs per millisecond per node.
#[derive(Debug)]
pub struct IdGenerator {
    node_id: u16,
    state: Mutex<GeneratorState>,
}

impl IdGenerator {
    pub fn new(node_id: u16) -> AppResult<Self> {
        if node_id >= MAX_NODE_ID {
            return Err(AppError::ConfigurationError(format!(
                "Node ID must be less than {}, got {}",
                MAX_NODE_ID, node_id
            )));
        }

        Ok(Self {
            node_id,
            state: Mutex::new(GeneratorState::default()),
        })
    }

    /// Generate next unique ID with embedded node information
    pub fn next_id(&self) -> i64 {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut now = current_millis();
        if now < state.last_timestamp {
            // Clock stepped backwards; keep issuing from the last seen millisecond
            now = state.last_timestamp;
        }

        if now == state.last_timestamp {
            state.sequence += 1;
            if state.sequence >= MAX_SEQUENCE {
                // Sequence overflow - borrow the next millisecond
                now += 1;
                state.sequence = 0;
            }
        } else {
            state.sequence = 0;
        }
        state.last_timestamp = now;

        let id = ((now & 0x3FF_FFFF_FFFF) << 22)
            | ((self.node_id as u64) << 12)
            | (state.sequence & 0xFFF);

        id as i64
    }

    pub fn extract_node_id(id: i64) -> u16 {
        (((id as u64) >> 12) & 0x3FF) as u16
    }

    pub fn extract_timestamp(id: i64) -> u64 {
        (id as u64) >> 22
    }

    pub fn extract_sequence(id: i64) -> u16 {
        ((id as u64) & 0xFFF) as u16
    }

    pub fn node_id(&self) -> u16 {
        self.node_id
    }
}

fn current_millis() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}
