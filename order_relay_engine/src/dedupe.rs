//! Dedupe-key derivation for boundary events.
//!
//! The inbox guarantees at-most-once storage per dedupe key, so the key must
//! be stable across upstream retransmits. When the upstream supplies a retry
//! identifier we use it directly; otherwise the key is a content hash over a
//! canonical rendering of the event, so logically equal resubmissions collapse
//! to the same key.

use sha2::{Digest, Sha256};

use crate::db_types::NewEvent;

/// Returns the dedupe key for an event.
///
/// Preferred path: `"{source}:{upstream_id}"` when the upstream provided a
/// stable identifier. Fallback: hex SHA-256 over
/// `source|order_id|event_type|event_ts|stable_hash(payload)`.
pub fn dedupe_key(event: &NewEvent) -> String {
    match &event.upstream_id {
        Some(id) => format!("{}:{id}", event.source),
        None => {
            let canonical = format!(
                "{}|{}|{}|{}|{}",
                event.source,
                event.order_id.as_str(),
                event.event_type,
                event.event_ts.to_rfc3339(),
                stable_hash(&event.payload),
            );
            hex_sha256(canonical.as_bytes())
        },
    }
}

/// Hex SHA-256 of the canonical JSON serialization of `value`. Object keys are
/// sorted lexicographically at every depth, so logically equal payloads hash
/// to the same digest regardless of key order on the wire.
pub fn stable_hash(value: &serde_json::Value) -> String {
    let mut canonical = String::new();
    write_canonical(value, &mut canonical);
    hex_sha256(canonical.as_bytes())
}

fn write_canonical(value: &serde_json::Value, out: &mut String) {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        },
        serde_json::Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        },
        v => out.push_str(&v.to_string()),
    }
}

fn hex_sha256(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
