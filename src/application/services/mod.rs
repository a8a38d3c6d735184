pub mod enqueue_service;
pub mod history_service;
pub mod roster_service;
pub mod sync_service;

pub use enqueue_service::EnqueueService;
pub use history_service::HistoryService;
pub use roster_service::RosterService;
pub use sync_service::{SyncRunStatus, SyncService};
