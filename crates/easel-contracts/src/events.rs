use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

pub type EventPayload = Map<String, Value>;

/// Append-only `events.jsonl` trail of the interpretation pipeline.
///
/// One compact JSON object per line, always correlated to the request that
/// produced it: `type`, `request_id`, and `ts` are filled in first, then the
/// caller payload is merged and may override them. One writer serves every
/// in-flight request, so lines from concurrent requests interleave but never
/// tear.
#[derive(Debug, Clone)]
pub struct EventWriter {
    inner: Arc<EventSink>,
}

#[derive(Debug)]
struct EventSink {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl EventWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(EventSink {
                path: path.into(),
                file: Mutex::new(None),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Record one event for a request. The file is opened lazily on the
    /// first emit and stays open for the writer's lifetime.
    pub fn emit(
        &self,
        request_id: Uuid,
        event_type: &str,
        payload: EventPayload,
    ) -> anyhow::Result<Value> {
        let mut event = Map::new();
        event.insert("type".to_string(), Value::String(event_type.to_string()));
        event.insert(
            "request_id".to_string(),
            Value::String(request_id.to_string()),
        );
        event.insert("ts".to_string(), Value::String(now_utc_iso()));
        for (key, value) in payload {
            event.insert(key, value);
        }

        let line = serde_json::to_string(&event)?;
        let mut guard = self
            .inner
            .file
            .lock()
            .map_err(|_| anyhow::anyhow!("event writer lock poisoned"))?;
        if guard.is_none() {
            if let Some(parent) = self.inner.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            *guard = Some(
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.inner.path)?,
            );
        }
        if let Some(file) = guard.as_mut() {
            file.write_all(line.as_bytes())?;
            file.write_all(b"\n")?;
        }

        Ok(Value::Object(event))
    }
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::DateTime;

    use super::*;

    #[test]
    fn events_carry_type_request_id_and_timestamp() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("events.jsonl");
        let writer = EventWriter::new(&path);
        let request_id = Uuid::new_v4();

        let mut payload = EventPayload::new();
        payload.insert("tier".to_string(), Value::String("llm".to_string()));
        let emitted = writer.emit(request_id, "tier_attempted", payload)?;

        let content = fs::read_to_string(&path)?;
        let parsed: Value = serde_json::from_str(content.lines().next().unwrap_or(""))?;

        assert_eq!(parsed, emitted);
        assert_eq!(parsed["type"], Value::String("tier_attempted".to_string()));
        assert_eq!(
            parsed["request_id"],
            Value::String(request_id.to_string())
        );
        assert_eq!(parsed["tier"], Value::String("llm".to_string()));
        DateTime::parse_from_rfc3339(parsed["ts"].as_str().unwrap_or(""))?;
        Ok(())
    }

    #[test]
    fn payload_overrides_the_default_fields() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let writer = EventWriter::new(temp.path().join("events.jsonl"));

        let mut payload = EventPayload::new();
        payload.insert("ts".to_string(), Value::String("override".to_string()));
        let emitted = writer.emit(Uuid::nil(), "probe", payload)?;
        assert_eq!(emitted["ts"], Value::String("override".to_string()));
        Ok(())
    }

    #[test]
    fn requests_interleave_into_one_file() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("events.jsonl");
        let writer = EventWriter::new(&path);
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        writer.emit(first, "tier_attempted", EventPayload::new())?;
        writer.emit(second, "tier_attempted", EventPayload::new())?;
        writer.emit(first, "interpretation_resolved", EventPayload::new())?;

        let content = fs::read_to_string(&path)?;
        let rows: Vec<Value> = content
            .lines()
            .map(serde_json::from_str)
            .collect::<Result<_, _>>()?;
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["request_id"], rows[2]["request_id"]);
        assert_ne!(rows[0]["request_id"], rows[1]["request_id"]);
        Ok(())
    }
}
