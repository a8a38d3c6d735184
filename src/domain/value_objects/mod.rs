pub mod clock_action;
pub mod outbox;

pub use clock_action::ClockAction;
pub use outbox::{
    EntityRef, EventId, EventType, FileRef, OrgId, OutboxPayload, ServerStage, SyncStatus, UserId,
};
