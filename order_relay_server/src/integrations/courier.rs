//! Conversion of courier status callbacks into pipeline events.

use chrono::{DateTime, Utc};
use order_relay_engine::db_types::{EventSource, NewEvent, OrderId};
use serde_json::Value;

use crate::errors::EventConversionError;

/// Builds a pipeline event from a courier status-update body. `orderId`,
/// `eventType` and `eventTs` are required; the body is retained verbatim as
/// the event payload. Couriers send no retry identifier, so deduplication
/// always runs on the content hash.
pub fn new_event_from_status_update(body: Value) -> Result<NewEvent, EventConversionError> {
    let order_id = body["orderId"]
        .as_str()
        .filter(|s| !s.is_empty())
        .map(OrderId::from)
        .ok_or_else(|| EventConversionError("The status update has no orderId".to_string()))?;
    let event_type = body["eventType"]
        .as_str()
        .filter(|s| !s.is_empty())
        .map(String::from)
        .ok_or_else(|| EventConversionError("The status update has no eventType".to_string()))?;
    let event_ts = body["eventTs"]
        .as_str()
        .and_then(|s| s.parse::<DateTime<Utc>>().ok())
        .ok_or_else(|| EventConversionError("The status update has no valid eventTs".to_string()))?;
    Ok(NewEvent::new(EventSource::Courier, order_id, event_type, event_ts, body))
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn all_required_fields_must_be_present() {
        let full = json!({
            "orderId": "o1",
            "eventType": "COURIER_STATUS_UPDATE",
            "eventTs": "2026-01-01T00:02:00Z",
            "trackingNumber": "T1",
            "status": "SHIPPED",
        });
        assert!(new_event_from_status_update(full).is_ok());
        for missing in ["orderId", "eventType", "eventTs"] {
            let mut body = json!({
                "orderId": "o1",
                "eventType": "COURIER_STATUS_UPDATE",
                "eventTs": "2026-01-01T00:02:00Z",
            });
            body.as_object_mut().unwrap().remove(missing);
            assert!(new_event_from_status_update(body).is_err(), "{missing} should be required");
        }
    }

    #[test]
    fn unparseable_timestamps_are_rejected() {
        let body = json!({"orderId": "o1", "eventType": "COURIER_STATUS_UPDATE", "eventTs": "yesterday"});
        assert!(new_event_from_status_update(body).is_err());
    }
}
