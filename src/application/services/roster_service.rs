use crate::application::ports::outbox_store::OutboxStore;
use crate::domain::entities::{OutboxEvent, Roster, RosterEntry};
use crate::domain::value_objects::{ClockAction, EventType, OrgId};
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Answers "who is currently in" from the local outbox alone, so the answer
/// stays available while offline.
pub struct RosterService {
    store: Arc<dyn OutboxStore>,
    window: u32,
}

impl RosterService {
    pub fn new(store: Arc<dyn OutboxStore>, window: u32) -> Self {
        Self { store, window }
    }

    pub async fn currently_in(&self, org: Option<&OrgId>) -> Result<Roster, AppError> {
        let types: Vec<EventType> = EventType::KNOWN
            .into_iter()
            .filter(EventType::is_actor_transition)
            .collect();
        let events = self.store.list_recent_of_types(&types, self.window).await?;
        Ok(fold_clock_events(&events, org))
    }
}

/// Replays clock events in creation order and keeps each worker's latest tag.
/// Workers whose latest tag is `out` are dropped. Events outside `org`, or
/// whose payload lacks a usable action or worker list, are skipped.
pub fn fold_clock_events(events: &[OutboxEvent], org: Option<&OrgId>) -> Roster {
    let mut ordered: Vec<&OutboxEvent> = events
        .iter()
        .filter(|event| event.event_type.is_actor_transition())
        .filter(|event| org.is_none_or(|scope| &event.org_id == scope))
        .collect();
    ordered.sort_by_key(|event| (event.created_at, event.id));

    let mut latest: BTreeMap<String, (ClockAction, DateTime<Utc>)> = BTreeMap::new();
    for event in ordered {
        let Some((action, workers)) = read_transition(event.payload.as_json()) else {
            debug!(event_id = %event.id, "skipping malformed clock event");
            continue;
        };
        for worker in workers {
            latest.insert(worker, (action.clone(), event.created_at));
        }
    }

    let entries = latest
        .into_iter()
        .filter(|(_, (action, _))| !action.is_out())
        .map(|(worker_id, (action, since))| RosterEntry {
            worker_id,
            action,
            since,
        })
        .collect();
    Roster { entries }
}

fn read_transition(payload: &Value) -> Option<(ClockAction, Vec<String>)> {
    let action = payload.get("action")?.as_str()?.trim();
    if action.is_empty() {
        return None;
    }
    let workers: Vec<String> = payload
        .get("workerIds")?
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();
    Some((ClockAction::from(action), workers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::outbox::ClockBatchPayload;
    use crate::domain::entities::{ActorContext, EventPayload, NewOutboxEvent};
    use crate::domain::value_objects::{EventId, OutboxPayload, SyncStatus, UserId};
    use crate::infrastructure::database::{ConnectionPool, SqliteOutboxStore};
    use chrono::TimeZone;
    use serde_json::json;

    fn clock_event(id: i64, org: &str, at_secs: i64, payload: Value) -> OutboxEvent {
        let at = Utc.timestamp_opt(1_750_000_000 + at_secs, 0).unwrap();
        OutboxEvent {
            id: EventId::new(id).unwrap(),
            event_type: EventType::ClockBatch,
            org_id: OrgId::new(org.into()).unwrap(),
            user_id: UserId::new("supervisor".into()).unwrap(),
            entity_ref: None,
            payload: OutboxPayload::new(payload).unwrap(),
            file_refs: Vec::new(),
            sync_status: SyncStatus::Pending,
            server_stage: None,
            error_text: None,
            created_at: at,
            updated_at: at,
        }
    }

    fn batch(action: &str, workers: &[&str]) -> Value {
        json!({ "action": action, "workerIds": workers })
    }

    #[test]
    fn latest_tag_wins_per_worker() {
        let events = vec![
            clock_event(1, "org-1", 0, batch("in", &["w1", "w2"])),
            clock_event(2, "org-1", 10, batch("out", &["w1", "w2"])),
            clock_event(3, "org-1", 20, batch("in", &["w1"])),
        ];

        let roster = fold_clock_events(&events, None);
        assert_eq!(roster.worker_ids(), vec!["w1"]);
        assert_eq!(roster.entries[0].since, events[2].created_at);
    }

    #[test]
    fn replay_follows_creation_time_not_slice_order() {
        let events = vec![
            clock_event(2, "org-1", 10, batch("out", &["w1"])),
            clock_event(1, "org-1", 0, batch("in", &["w1"])),
        ];
        assert!(fold_clock_events(&events, None).is_empty());
    }

    #[test]
    fn non_out_tags_count_as_present() {
        let events = vec![
            clock_event(1, "org-1", 0, batch("sick", &["w1"])),
            clock_event(2, "org-1", 1, batch("site-visit", &["w2"])),
        ];

        let roster = fold_clock_events(&events, None);
        assert_eq!(roster.worker_ids(), vec!["w1", "w2"]);
        assert_eq!(roster.entries[0].action, ClockAction::Sick);
        assert_eq!(
            roster.entries[1].action,
            ClockAction::Other("site-visit".into())
        );
    }

    #[test]
    fn other_orgs_are_ignored_when_scoped() {
        let events = vec![
            clock_event(1, "org-1", 0, batch("in", &["w1"])),
            clock_event(2, "org-2", 5, batch("in", &["w9"])),
            clock_event(3, "org-2", 6, batch("out", &["w1"])),
        ];

        let scope = OrgId::new("org-1".into()).unwrap();
        assert_eq!(fold_clock_events(&events, Some(&scope)).worker_ids(), vec!["w1"]);
        assert_eq!(fold_clock_events(&events, None).worker_ids(), vec!["w9"]);
    }

    #[test]
    fn malformed_payloads_are_skipped() {
        let events = vec![
            clock_event(1, "org-1", 0, batch("in", &["w1"])),
            clock_event(2, "org-1", 1, json!({ "workerIds": ["w1"] })),
            clock_event(3, "org-1", 2, json!({ "action": "out", "workerIds": "w1" })),
            clock_event(4, "org-1", 3, json!({ "action": "in", "workerIds": [7, " ", "w2"] })),
        ];

        assert_eq!(fold_clock_events(&events, None).worker_ids(), vec!["w1", "w2"]);
    }

    #[tokio::test]
    async fn test_currently_in_reads_from_store() {
        let pool = ConnectionPool::from_memory().await.unwrap();
        let store: Arc<dyn OutboxStore> = Arc::new(SqliteOutboxStore::new(pool));
        store.initialize().await.unwrap();
        let actor = ActorContext::new("org-1", "supervisor").unwrap();

        for (action, workers) in [
            (ClockAction::In, vec!["w1", "w2"]),
            (ClockAction::Out, vec!["w2"]),
        ] {
            let payload = EventPayload::ClockBatch(ClockBatchPayload {
                action,
                worker_ids: workers.into_iter().map(String::from).collect(),
                group_id: None,
                project_id: None,
                manual: false,
                note: None,
                photo_ref: None,
                location: None,
            });
            store
                .append(NewOutboxEvent::from_payload(&actor, payload).unwrap())
                .await
                .unwrap();
        }

        let service = RosterService::new(store, 500);
        let roster = service.currently_in(Some(&actor.org_id)).await.unwrap();
        assert_eq!(roster.worker_ids(), vec!["w1"]);
    }
}
