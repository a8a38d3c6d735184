pub mod connection_pool;
mod rows;
pub mod sqlite_outbox_store;

pub use connection_pool::ConnectionPool;
pub use sqlite_outbox_store::SqliteOutboxStore;
