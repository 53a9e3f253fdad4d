// Service exports
pub mod appwrite;
pub mod cache;
pub mod memory;
pub mod ports;
pub mod postgres;

pub use appwrite::{AppwriteClient, AppwriteCollections, AppwriteError};
pub use cache::{CacheError, CacheKey, CacheManager, CachedProfileDirectory};
pub use memory::MemoryStore;
pub use ports::{InterestStore, MatchLedger, ProfileDirectory, UserDirectory};
pub use postgres::{PostgresClient, PostgresError};
