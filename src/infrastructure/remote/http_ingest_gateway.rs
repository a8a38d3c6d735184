use crate::application::ports::ingest_gateway::{IngestAck, IngestGateway, IngestSubmission};
use crate::domain::value_objects::ServerStage;
use crate::shared::error::{AppError, SubmissionError};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

const MAX_ERROR_BODY_CHARS: usize = 512;

/// Posts outbox events to the remote ingest endpoint as JSON.
#[derive(Clone, Debug)]
pub struct HttpIngestGateway {
    endpoint: String,
    auth_token: Option<String>,
    http: reqwest::Client,
}

impl HttpIngestGateway {
    pub fn new(
        endpoint: String,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let trimmed = endpoint.trim();
        if trimmed.is_empty() {
            return Err(AppError::Configuration(
                "ingest endpoint is empty".to_string(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::Configuration(err.to_string()))?;

        Ok(Self {
            endpoint: trimmed.to_string(),
            auth_token: auth_token.filter(|token| !token.trim().is_empty()),
            http,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl IngestGateway for HttpIngestGateway {
    async fn submit(&self, submission: &IngestSubmission) -> Result<IngestAck, SubmissionError> {
        let mut request = self.http.post(&self.endpoint).json(submission);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SubmissionError::Rejected {
                status: status.as_u16(),
                body: truncate(&body),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|err| SubmissionError::InvalidAck(err.to_string()))?;
        Ok(parse_ack(&body))
    }
}

/// Reads `stage` (or `status`) from a success body. Anything unrecognised,
/// including an empty body, is a plain receipt.
pub fn parse_ack(body: &str) -> IngestAck {
    let Ok(value) = serde_json::from_str::<Value>(body.trim()) else {
        return IngestAck::received();
    };

    let stage = ["stage", "status"]
        .iter()
        .filter_map(|key| value.get(*key).and_then(Value::as_str))
        .find_map(|raw| raw.parse::<ServerStage>().ok());

    IngestAck {
        stage: Some(stage.unwrap_or(ServerStage::Received)),
    }
}

fn truncate(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_ERROR_BODY_CHARS {
        return trimmed.to_string();
    }
    let mut cut: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ack_reads_stage_then_status() {
        assert!(parse_ack(r#"{"stage":"applied"}"#).is_applied());
        assert!(parse_ack(r#"{"status":"APPLIED"}"#).is_applied());
        assert_eq!(
            parse_ack(r#"{"stage":"received","status":"applied"}"#).stage,
            Some(ServerStage::Received)
        );
    }

    #[test]
    fn parse_ack_defaults_to_received() {
        assert_eq!(parse_ack("").stage, Some(ServerStage::Received));
        assert_eq!(parse_ack("OK").stage, Some(ServerStage::Received));
        assert_eq!(parse_ack(r#"{"status":"ok"}"#).stage, Some(ServerStage::Received));
    }

    #[test]
    fn empty_endpoint_is_a_configuration_error() {
        let err = HttpIngestGateway::new("  ".into(), None, Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn truncate_caps_long_bodies() {
        let body = "x".repeat(MAX_ERROR_BODY_CHARS + 10);
        assert_eq!(truncate(&body).chars().count(), MAX_ERROR_BODY_CHARS + 1);
        assert_eq!(truncate("  short "), "short");
    }
}
