pub mod outbox;
pub mod roster;

pub use outbox::{
    ActorContext, EventPayload, NewOutboxEvent, OutboxEvent, StatusCounts, SyncSummary, TypeCount,
};
pub use roster::{Roster, RosterEntry};
