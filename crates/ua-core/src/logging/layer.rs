//! JSONL output layer.
//!
//! One JSON object per event on a single line:
//!
//! ```text
//! {"ts":"…","level":"debug","event":"match.resolved","run_id":"run-…","stage":"match",
//!  "message":"lookup resolved","fields":{"device_id":"nokia_3220_ver1","handler":"nokia"}}
//! ```
//!
//! `event` is the tracing target, so events emitted with a target from
//! [`event_names`](super::event_names) can be filtered by name. Span fields
//! are inherited by events, inner spans overriding outer ones; `run_id` and
//! `stage` are lifted to the top level.

use std::io::{self, Write};
use std::sync::Mutex;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use super::events::Level;

/// Longest string value written verbatim. User agents are attacker
/// controlled and can be arbitrarily long.
const MAX_FIELD_LEN: usize = 512;

/// Span fields lifted out of `fields` to the top level.
const CONTEXT_KEYS: &[&str] = &["run_id", "stage"];

/// Collects tracing fields into a JSON map.
#[derive(Default)]
struct Fields {
    values: Map<String, Value>,
    message: Option<String>,
}

impl Fields {
    fn put(&mut self, field: &Field, value: Value) {
        self.values.insert(field.name().to_string(), value);
    }

    fn put_text(&mut self, field: &Field, text: String) {
        if field.name() == "message" {
            self.message = Some(text);
        } else {
            self.put(field, Value::String(truncate(text)));
        }
    }
}

impl Visit for Fields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.put_text(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.put_text(field, format!("{:?}", value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, value.into());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, value.into());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        if let Some(n) = serde_json::Number::from_f64(value) {
            self.put(field, Value::Number(n));
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, value.into());
    }
}

/// Fields recorded on a span, stored in the span's extensions.
struct SpanFields(Map<String, Value>);

fn truncate(mut value: String) -> String {
    if value.len() > MAX_FIELD_LEN {
        let mut cut = MAX_FIELD_LEN;
        while !value.is_char_boundary(cut) {
            cut -= 1;
        }
        value.truncate(cut);
        value.push_str("...(truncated)");
    }
    value
}

/// JSONL tracing layer.
pub struct JsonlLayer<W = io::Stderr> {
    writer: Mutex<W>,
}

impl JsonlLayer<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write> JsonlLayer<W> {
    pub fn new(writer: W) -> Self {
        JsonlLayer {
            writer: Mutex::new(writer),
        }
    }
}

impl<S, W> Layer<S> for JsonlLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: Write + 'static,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut fields = Fields::default();
        attrs.record(&mut fields);
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(SpanFields(fields.values));
        }
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut fields = Fields::default();
        values.record(&mut fields);
        let mut extensions = span.extensions_mut();
        match extensions.get_mut::<SpanFields>() {
            Some(existing) => existing.0.extend(fields.values),
            None => extensions.insert(SpanFields(fields.values)),
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut inherited = Map::new();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                if let Some(SpanFields(values)) = span.extensions().get::<SpanFields>() {
                    inherited.extend(values.clone());
                }
            }
        }

        let mut fields = Fields::default();
        event.record(&mut fields);

        let mut line = Map::new();
        line.insert("ts".into(), Value::String(Utc::now().to_rfc3339()));
        let level: Level = (*event.metadata().level()).into();
        line.insert("level".into(), serde_json::json!(level));
        line.insert("event".into(), Value::String(event.metadata().target().into()));
        for key in CONTEXT_KEYS {
            if let Some(value) = inherited.remove(*key) {
                line.insert((*key).to_string(), value);
            }
        }
        if let Some(message) = fields.message {
            line.insert("message".into(), Value::String(message));
        }

        // Event fields win over inherited span fields.
        inherited.extend(fields.values);
        if !inherited.is_empty() {
            line.insert("fields".into(), Value::Object(inherited));
        }

        if let Ok(mut writer) = self.writer.lock() {
            if serde_json::to_writer(&mut *writer, &Value::Object(line)).is_ok() {
                let _ = writer.write_all(b"\n");
            }
        }
    }
}
