use crate::domain::value_objects::{ClockAction, EntityRef, EventType, FileRef, OutboxPayload};
use crate::shared::error::AppError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy_meters: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogPayload {
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<f64>,
    #[serde(default)]
    pub photo_refs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectUpdatePayload {
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_percent: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdatePayload {
    pub task_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_percent: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// One clock-in/out action applied to a group of workers at once.
/// `manual` marks an entry captured after biometric verification failed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClockBatchPayload {
    pub action: ClockAction,
    pub worker_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default)]
    pub manual: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VehicleTripPayload {
    pub registration: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub odometer_start: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub odometer_end: Option<f64>,
    #[serde(default)]
    pub photo_refs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssetRegisterPayload {
    pub asset_tag: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default)]
    pub photo_refs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentAttachPayload {
    pub entity_ref: String,
    pub title: String,
    pub file_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BiometricEnrollPayload {
    pub worker_id: String,
    pub template_refs: Vec<String>,
    pub consent: bool,
}

/// Typed payload of every event a producer can enqueue, tagged by event type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "eventType", content = "payload", rename_all = "kebab-case")]
pub enum EventPayload {
    ActivityLog(ActivityLogPayload),
    ProjectUpdate(ProjectUpdatePayload),
    TaskUpdate(TaskUpdatePayload),
    ClockBatch(ClockBatchPayload),
    VehicleTrip(VehicleTripPayload),
    AssetRegister(AssetRegisterPayload),
    DocumentAttach(DocumentAttachPayload),
    BiometricEnroll(BiometricEnrollPayload),
}

impl EventPayload {
    pub fn event_type(&self) -> EventType {
        match self {
            EventPayload::ActivityLog(_) => EventType::ActivityLog,
            EventPayload::ProjectUpdate(_) => EventType::ProjectUpdate,
            EventPayload::TaskUpdate(_) => EventType::TaskUpdate,
            EventPayload::ClockBatch(_) => EventType::ClockBatch,
            EventPayload::VehicleTrip(_) => EventType::VehicleTrip,
            EventPayload::AssetRegister(_) => EventType::AssetRegister,
            EventPayload::DocumentAttach(_) => EventType::DocumentAttach,
            EventPayload::BiometricEnroll(_) => EventType::BiometricEnroll,
        }
    }

    pub fn entity_ref(&self) -> Option<EntityRef> {
        let raw = match self {
            EventPayload::ActivityLog(p) => p.task_id.as_deref().or(Some(p.project_id.as_str())),
            EventPayload::ProjectUpdate(p) => Some(p.project_id.as_str()),
            EventPayload::TaskUpdate(p) => Some(p.task_id.as_str()),
            EventPayload::ClockBatch(p) => p.group_id.as_deref().or(p.project_id.as_deref()),
            EventPayload::VehicleTrip(p) => Some(p.registration.as_str()),
            EventPayload::AssetRegister(p) => Some(p.asset_tag.as_str()),
            EventPayload::DocumentAttach(p) => Some(p.entity_ref.as_str()),
            EventPayload::BiometricEnroll(p) => Some(p.worker_id.as_str()),
        };
        raw.and_then(|value| EntityRef::new(value.trim().to_string()).ok())
    }

    /// Files that must travel with the payload, in the order they were captured.
    pub fn file_refs(&self) -> Vec<FileRef> {
        let raw: Vec<&str> = match self {
            EventPayload::ActivityLog(p) => p.photo_refs.iter().map(String::as_str).collect(),
            EventPayload::ClockBatch(p) => p.photo_ref.as_deref().into_iter().collect(),
            EventPayload::VehicleTrip(p) => p.photo_refs.iter().map(String::as_str).collect(),
            EventPayload::AssetRegister(p) => p.photo_refs.iter().map(String::as_str).collect(),
            EventPayload::DocumentAttach(p) => vec![p.file_ref.as_str()],
            EventPayload::BiometricEnroll(p) => {
                p.template_refs.iter().map(String::as_str).collect()
            }
            EventPayload::ProjectUpdate(_) | EventPayload::TaskUpdate(_) => Vec::new(),
        };
        raw.into_iter()
            .filter_map(|value| FileRef::new(value.to_string()).ok())
            .collect()
    }

    pub fn validate(&self) -> Result<(), AppError> {
        match self {
            EventPayload::ActivityLog(p) => {
                require("projectId", &p.project_id)?;
                require("description", &p.description)?;
                if let Some(hours) = p.hours {
                    if !(0.0..=24.0).contains(&hours) {
                        return Err(AppError::validation("hours must be between 0 and 24"));
                    }
                }
                require_file_refs("photoRefs", &p.photo_refs)
            }
            EventPayload::ProjectUpdate(p) => {
                require("projectId", &p.project_id)?;
                require_some_change(&p.status, p.progress_percent, &p.notes)
            }
            EventPayload::TaskUpdate(p) => {
                require("taskId", &p.task_id)?;
                require_some_change(&p.status, p.progress_percent, &p.notes)
            }
            EventPayload::ClockBatch(p) => {
                if !p.worker_ids.iter().any(|id| !id.trim().is_empty()) {
                    return Err(AppError::validation(
                        "clock batch requires at least one worker",
                    ));
                }
                if p.worker_ids.iter().any(|id| id.trim().is_empty()) {
                    return Err(AppError::validation("workerIds must not contain blanks"));
                }
                if p.manual {
                    if p.note.as_deref().is_none_or(|note| note.trim().is_empty()) {
                        return Err(AppError::validation("manual clock entry requires a note"));
                    }
                    if p.photo_ref.as_deref().is_none_or(|r| r.trim().is_empty()) {
                        return Err(AppError::validation("manual clock entry requires a photo"));
                    }
                }
                if let Some(photo) = &p.photo_ref {
                    require("photoRef", photo)?;
                }
                Ok(())
            }
            EventPayload::VehicleTrip(p) => {
                require("registration", &p.registration)?;
                if let (Some(start), Some(end)) = (p.odometer_start, p.odometer_end) {
                    if end < start {
                        return Err(AppError::validation(
                            "odometerEnd must not be lower than odometerStart",
                        ));
                    }
                }
                require_file_refs("photoRefs", &p.photo_refs)
            }
            EventPayload::AssetRegister(p) => {
                require("assetTag", &p.asset_tag)?;
                require("name", &p.name)?;
                require_file_refs("photoRefs", &p.photo_refs)
            }
            EventPayload::DocumentAttach(p) => {
                require("entityRef", &p.entity_ref)?;
                require("title", &p.title)?;
                require("fileRef", &p.file_ref)
            }
            EventPayload::BiometricEnroll(p) => {
                require("workerId", &p.worker_id)?;
                if !p.consent {
                    return Err(AppError::validation("biometric enrollment requires consent"));
                }
                if p.template_refs.is_empty() {
                    return Err(AppError::validation(
                        "biometric enrollment requires at least one template",
                    ));
                }
                require_file_refs("templateRefs", &p.template_refs)
            }
        }
    }

    /// Splits into the stored tag and the payload document.
    pub fn into_document(self) -> Result<(EventType, OutboxPayload), AppError> {
        let event_type = self.event_type();
        let mut tagged = serde_json::to_value(&self)?;
        let document = tagged
            .get_mut("payload")
            .map(Value::take)
            .ok_or_else(|| AppError::Serialization("payload content missing".to_string()))?;
        let payload = OutboxPayload::new(document).map_err(AppError::Serialization)?;
        Ok((event_type, payload))
    }

    /// Rebuilds the typed payload from a stored tag and document.
    pub fn from_document(event_type: &EventType, document: &Value) -> Result<Self, AppError> {
        if let EventType::Other(tag) = event_type {
            return Err(AppError::Serialization(format!(
                "no payload schema for event type {tag}"
            )));
        }
        let tagged = json!({ "eventType": event_type.as_str(), "payload": document });
        Ok(serde_json::from_value(tagged)?)
    }
}

fn require(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(())
}

fn require_file_refs(field: &str, refs: &[String]) -> Result<(), AppError> {
    if refs.iter().any(|value| value.trim().is_empty()) {
        return Err(AppError::Validation(format!(
            "{field} must not contain blank file references"
        )));
    }
    Ok(())
}

fn require_some_change(
    status: &Option<String>,
    progress_percent: Option<u8>,
    notes: &Option<String>,
) -> Result<(), AppError> {
    let has_status = status.as_deref().is_some_and(|s| !s.trim().is_empty());
    let has_notes = notes.as_deref().is_some_and(|n| !n.trim().is_empty());
    if !has_status && progress_percent.is_none() && !has_notes {
        return Err(AppError::validation(
            "update requires a status, progress or notes",
        ));
    }
    if let Some(progress) = progress_percent {
        if progress > 100 {
            return Err(AppError::validation("progressPercent must be between 0 and 100"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock_batch(manual: bool) -> ClockBatchPayload {
        ClockBatchPayload {
            action: ClockAction::In,
            worker_ids: vec!["w-1".into(), "w-2".into()],
            group_id: Some("G7".into()),
            project_id: Some("P1".into()),
            manual,
            note: None,
            photo_ref: None,
            location: None,
        }
    }

    #[test]
    fn clock_batch_requires_workers() {
        let mut payload = clock_batch(false);
        payload.worker_ids.clear();
        let err = EventPayload::ClockBatch(payload).validate().unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn manual_clock_batch_requires_note_and_photo() {
        let mut payload = clock_batch(true);
        payload.photo_ref = Some("file://photo-1".into());
        assert!(EventPayload::ClockBatch(payload.clone()).validate().is_err());

        payload.note = Some("fingerprint reader wet".into());
        payload.photo_ref = None;
        assert!(EventPayload::ClockBatch(payload.clone()).validate().is_err());

        payload.photo_ref = Some("file://photo-1".into());
        assert!(EventPayload::ClockBatch(payload).validate().is_ok());
    }

    #[test]
    fn clock_batch_prefers_group_as_entity_ref_and_ships_photo() {
        let mut payload = clock_batch(false);
        payload.photo_ref = Some("file://photo-9".into());
        let event = EventPayload::ClockBatch(payload);
        assert_eq!(event.entity_ref().unwrap().as_str(), "G7");
        let refs = event.file_refs();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].as_str(), "file://photo-9");
    }

    #[test]
    fn task_update_needs_a_change() {
        let update = TaskUpdatePayload {
            task_id: "T1".into(),
            project_id: None,
            status: Some("  ".into()),
            progress_percent: None,
            notes: None,
        };
        assert!(EventPayload::TaskUpdate(update.clone()).validate().is_err());

        let update = TaskUpdatePayload {
            progress_percent: Some(101),
            ..update
        };
        assert!(EventPayload::TaskUpdate(update.clone()).validate().is_err());

        let update = TaskUpdatePayload {
            progress_percent: Some(40),
            ..update
        };
        assert!(EventPayload::TaskUpdate(update).validate().is_ok());
    }

    #[test]
    fn vehicle_trip_rejects_backwards_odometer() {
        let trip = VehicleTripPayload {
            registration: "CA 123-456".into(),
            driver_id: None,
            purpose: None,
            odometer_start: Some(1200.0),
            odometer_end: Some(1100.0),
            photo_refs: vec![],
        };
        assert!(EventPayload::VehicleTrip(trip).validate().is_err());
    }

    #[test]
    fn biometric_enroll_requires_consent() {
        let enroll = BiometricEnrollPayload {
            worker_id: "w-1".into(),
            template_refs: vec!["tpl-1".into()],
            consent: false,
        };
        assert!(EventPayload::BiometricEnroll(enroll).validate().is_err());
    }

    #[test]
    fn document_splits_into_tag_and_camel_case_body() {
        let payload = EventPayload::DocumentAttach(DocumentAttachPayload {
            entity_ref: "P1".into(),
            title: "Site plan".into(),
            file_ref: "file://plan.pdf".into(),
            mime_type: None,
        });
        let (event_type, document) = payload.clone().into_document().unwrap();
        assert_eq!(event_type, EventType::DocumentAttach);
        assert_eq!(document.as_json()["fileRef"], "file://plan.pdf");
        assert!(document.as_json().get("mimeType").is_none());

        let rebuilt = EventPayload::from_document(&event_type, document.as_json()).unwrap();
        assert_eq!(rebuilt, payload);
    }

    #[test]
    fn from_document_refuses_unknown_tags() {
        let result = EventPayload::from_document(&EventType::from("fuel-log"), &json!({}));
        assert!(result.is_err());
    }
}
