pub mod diagnostics;
pub mod event_payload;
pub mod event_record;

pub use diagnostics::{StatusCounts, SyncSummary, TypeCount};
pub use event_payload::{
    ActivityLogPayload, AssetRegisterPayload, BiometricEnrollPayload, ClockBatchPayload,
    DocumentAttachPayload, EventPayload, GeoPoint, ProjectUpdatePayload, TaskUpdatePayload,
    VehicleTripPayload,
};
pub use event_record::{ActorContext, NewOutboxEvent, OutboxEvent};
