//! Decoding of raw push frames into [`PushEvent`]s.
//!
//! The backend's payloads are loose: percentages arrive as numbers or
//! numeric strings, task-end frames carry either a bare section name or
//! an object, and field names vary between snake_case and camelCase.
//! Everything tolerant lives here so the rest of the crate only sees
//! well-typed events.

use std::str::FromStr;

use esusync_domain::{PushEvent, Section};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::sse::SseFrame;

/// Sub-channel name used for address-fix progress frames.
const ADDRESS_FIX_CHANNEL: &str = "cep";

#[derive(Debug, Deserialize)]
struct RawStart {
    task: String,
}

#[derive(Debug, Deserialize)]
struct RawProgress {
    #[serde(alias = "type")]
    tipo: String,
    #[serde(default, alias = "progress")]
    percentual: Option<Value>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default, alias = "totalRecords")]
    total: Option<u64>,
    #[serde(default, alias = "updated")]
    atualizados: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawEnd {
    tipo: String,
}

/// Coerce a JSON value into a 0..=100 percentage. Accepts numbers and
/// numeric strings; anything else is `None`.
pub(crate) fn lenient_percent(value: &Value) -> Option<u8> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    if !number.is_finite() {
        return None;
    }
    Some(number.clamp(0.0, 100.0) as u8)
}

fn parse_section(raw: &str, event: &str) -> Option<Section> {
    match Section::from_str(raw) {
        Ok(section) => Some(section),
        Err(_) => {
            warn!(section = raw, event, "push frame for unknown section dropped");
            None
        }
    }
}

/// Decode one SSE frame into a typed event. Returns `None` for frames
/// that carry no state change (unknown events, unknown sections,
/// malformed payloads); each drop is logged.
pub fn normalize(frame: &SseFrame) -> Option<PushEvent> {
    match frame.event.as_str() {
        "start-task" => {
            let raw: RawStart = decode(&frame.data, &frame.event)?;
            let section = parse_section(&raw.task, &frame.event)?;
            Some(PushEvent::TaskStarted { section })
        }
        "progress_update" => {
            let raw: RawProgress = decode(&frame.data, &frame.event)?;
            if raw.tipo == ADDRESS_FIX_CHANNEL {
                return Some(PushEvent::AddressFix {
                    total: raw.total.unwrap_or(0),
                    updated: raw.atualizados.unwrap_or(0),
                });
            }
            let section = parse_section(&raw.tipo, &frame.event)?;
            let percent = raw.percentual.as_ref().and_then(lenient_percent).unwrap_or(0);
            Some(PushEvent::Progress { section, percent, error: raw.error })
        }
        "end_task" | "end-task" => {
            // Either a bare section name or `{"tipo": "..."}`.
            let name = match serde_json::from_str::<Value>(&frame.data) {
                Ok(Value::String(name)) => name,
                Ok(value) => {
                    serde_json::from_value::<RawEnd>(value)
                        .map_err(|err| {
                            warn!(event = %frame.event, %err, "undecodable push payload");
                        })
                        .ok()?
                        .tipo
                }
                Err(_) => frame.data.trim().to_string(),
            };
            let section = parse_section(&name, &frame.event)?;
            Some(PushEvent::TaskEnded { section })
        }
        other => {
            warn!(event = other, "unrecognized push event dropped");
            None
        }
    }
}

fn decode<'a, T: Deserialize<'a>>(data: &'a str, event: &str) -> Option<T> {
    serde_json::from_str(data)
        .map_err(|err| warn!(event, %err, "undecodable push payload"))
        .ok()
}
