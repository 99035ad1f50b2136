// Infrastructure - persistence, identity and ids

pub mod clock;               // Source of "now"
pub mod id_generator;        // Snowflake-style record ids
pub mod memory_store;        // RwLock-backed record store
pub mod middleware;          // ViewerContext middleware and extractor
pub mod record_store;        // Record store trait, filters and queries
pub mod sqlite_store;        // sqlx SQLite record store
pub mod viewer;              // Viewer context

pub use clock::{Clock, ManualClock, SystemClock};
pub use id_generator::IdGenerator;
pub use memory_store::MemoryStore;
pub use record_store::{LikeToggle, RecordFilter, RecordQuery, RecordStore, SortKey};
pub use sqlite_store::SqliteStore;
pub use viewer::{Actor, ViewerContext};
