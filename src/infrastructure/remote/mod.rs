pub mod http_ingest_gateway;

pub use http_ingest_gateway::HttpIngestGateway;
