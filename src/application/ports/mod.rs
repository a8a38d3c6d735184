pub mod ingest_gateway;
pub mod outbox_store;

pub use ingest_gateway::{IngestAck, IngestGateway, IngestSubmission};
pub use outbox_store::{OutboxStore, SchemaReport};
