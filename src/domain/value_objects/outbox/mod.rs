pub mod event_type;
pub mod identifiers;
pub mod payload;
pub mod sync_status;

pub use event_type::EventType;
pub use identifiers::{EntityRef, EventId, FileRef, OrgId, UserId};
pub use payload::OutboxPayload;
pub use sync_status::{ServerStage, SyncStatus};
