use crate::error::{GateError, Result, SessionError};
use crate::store::{ChatRecord, SessionStore};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::sync::Arc;

/// Inclusive time window for session queries.
///
/// A window only exists when both bounds were supplied; a lone bound is
/// treated as no filter at all.
#[derive(Debug, Clone, Copy)]
pub struct SessionWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl SessionWindow {
    /// Build a window from optional query bounds. Returns `Ok(None)` when
    /// either bound is absent, and a validation error when a supplied bound
    /// does not parse.
    pub fn from_bounds(start: Option<&str>, end: Option<&str>) -> Result<Option<Self>> {
        let (Some(start), Some(end)) = (start, end) else {
            return Ok(None);
        };
        let start = parse_iso8601(start)
            .ok_or_else(|| GateError::Validation(format!("invalid startDate '{start}'")))?;
        let end = parse_iso8601(end)
            .ok_or_else(|| GateError::Validation(format!("invalid endDate '{end}'")))?;
        Ok(Some(Self { start, end }))
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

/// Parse an ISO-8601 timestamp. Accepts full RFC 3339 as well as the naive
/// `YYYY-MM-DDTHH:MM:SS[.fff]` form, which is read as UTC.
fn parse_iso8601(input: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(input) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Read side of the session store: list every stored exchange, optionally
/// narrowed to a time window.
pub struct SessionQueryService {
    store: Arc<dyn SessionStore>,
}

impl SessionQueryService {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// List stored sessions as `{sessionId: {field: value}}` objects.
    ///
    /// Every record's timestamp is parsed whether or not a window was given;
    /// a record without a parsable timestamp is corrupt and fails the whole
    /// query rather than being silently skipped.
    pub async fn query(&self, window: Option<SessionWindow>) -> Result<Vec<serde_json::Value>> {
        let mut sessions = Vec::new();
        for (session_id, fields) in self.store.get_all().await? {
            let raw = fields.get(ChatRecord::FIELD_TIMESTAMP).ok_or_else(|| {
                SessionError::MalformedRecord {
                    session_id: session_id.clone(),
                    value: "<missing timestamp>".to_string(),
                }
            })?;
            let stamp = parse_iso8601(raw).ok_or_else(|| SessionError::MalformedRecord {
                session_id: session_id.clone(),
                value: raw.clone(),
            })?;
            if let Some(window) = window {
                if !window.contains(stamp) {
                    continue;
                }
            }

            let mut entry = serde_json::Map::new();
            entry.insert(
                session_id,
                serde_json::Value::Object(
                    fields
                        .into_iter()
                        .map(|(k, v)| (k, serde_json::Value::String(v)))
                        .collect(),
                ),
            );
            sessions.push(serde_json::Value::Object(entry));
        }
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FieldMap, InMemoryStore};

    fn record_fields(timestamp: &str) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert("system_message".into(), "persona".into());
        fields.insert("prompt".into(), "hi".into());
        fields.insert("response".into(), "hello".into());
        fields.insert("temperature".into(), "0.1".into());
        fields.insert("timestamp".into(), timestamp.into());
        fields
    }

    async fn seeded_service(entries: &[(&str, &str)]) -> SessionQueryService {
        let store = Arc::new(InMemoryStore::new());
        for (id, timestamp) in entries {
            store.put(id, record_fields(timestamp)).await.unwrap();
        }
        SessionQueryService::new(store)
    }

    #[test]
    fn parses_rfc3339_with_offset() {
        let parsed = parse_iso8601("2026-03-01T12:00:00+02:00").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-03-01T10:00:00+00:00");
    }

    #[test]
    fn parses_naive_as_utc() {
        let parsed = parse_iso8601("2026-03-01T12:00:00").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-03-01T12:00:00+00:00");
    }

    #[test]
    fn parses_fractional_seconds() {
        assert!(parse_iso8601("2026-03-01T12:00:00.123456").is_some());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_iso8601("yesterday").is_none());
        assert!(parse_iso8601("2026-03-01").is_none());
    }

    #[test]
    fn window_requires_both_bounds() {
        assert!(
            SessionWindow::from_bounds(Some("2026-03-01T00:00:00"), None)
                .unwrap()
                .is_none()
        );
        assert!(
            SessionWindow::from_bounds(None, Some("2026-03-01T00:00:00"))
                .unwrap()
                .is_none()
        );
        assert!(SessionWindow::from_bounds(None, None).unwrap().is_none());
    }

    #[test]
    fn window_rejects_unparsable_bounds() {
        let err = SessionWindow::from_bounds(Some("not-a-date"), Some("2026-03-01T00:00:00"))
            .unwrap_err();
        assert!(matches!(err, GateError::Validation(_)));
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let window = SessionWindow::from_bounds(
            Some("2026-03-01T00:00:00"),
            Some("2026-03-02T00:00:00"),
        )
        .unwrap()
        .unwrap();
        assert!(window.contains(parse_iso8601("2026-03-01T00:00:00").unwrap()));
        assert!(window.contains(parse_iso8601("2026-03-02T00:00:00").unwrap()));
        assert!(window.contains(parse_iso8601("2026-03-01T12:00:00").unwrap()));
        assert!(!window.contains(parse_iso8601("2026-02-28T23:59:59").unwrap()));
        assert!(!window.contains(parse_iso8601("2026-03-02T00:00:01").unwrap()));
    }

    #[tokio::test]
    async fn query_without_window_returns_everything() {
        let service = seeded_service(&[
            ("s-1", "2026-03-01T10:00:00+00:00"),
            ("s-2", "2026-03-05T10:00:00+00:00"),
        ])
        .await;

        let sessions = service.query(None).await.unwrap();
        assert_eq!(sessions.len(), 2);
    }

    #[tokio::test]
    async fn query_filters_to_window() {
        let service = seeded_service(&[
            ("early", "2026-03-01T10:00:00+00:00"),
            ("inside", "2026-03-03T10:00:00+00:00"),
            ("late", "2026-03-09T10:00:00+00:00"),
        ])
        .await;

        let window = SessionWindow::from_bounds(
            Some("2026-03-02T00:00:00"),
            Some("2026-03-04T00:00:00"),
        )
        .unwrap();
        let sessions = service.query(window).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert!(sessions[0].get("inside").is_some());
    }

    #[tokio::test]
    async fn query_entries_keep_string_field_values() {
        let service = seeded_service(&[("s-1", "2026-03-01T10:00:00+00:00")]).await;

        let sessions = service.query(None).await.unwrap();
        let fields = sessions[0].get("s-1").unwrap();
        assert_eq!(fields.get("temperature").unwrap(), "0.1");
        assert_eq!(fields.get("prompt").unwrap(), "hi");
    }

    #[tokio::test]
    async fn malformed_timestamp_fails_filtered_query() {
        let service = seeded_service(&[("broken", "not-a-timestamp")]).await;

        let window = SessionWindow::from_bounds(
            Some("2026-03-01T00:00:00"),
            Some("2026-03-02T00:00:00"),
        )
        .unwrap();
        let err = service.query(window).await.unwrap_err();
        assert!(matches!(
            err,
            GateError::Session(SessionError::MalformedRecord { .. })
        ));
    }

    #[tokio::test]
    async fn malformed_timestamp_fails_unfiltered_query() {
        let service = seeded_service(&[("broken", "not-a-timestamp")]).await;
        let err = service.query(None).await.unwrap_err();
        assert!(matches!(
            err,
            GateError::Session(SessionError::MalformedRecord { .. })
        ));
    }
}
