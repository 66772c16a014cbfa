//! Field bundles extracted from boundary payloads, plus the merchant update
//! request applied to the canonical order row.

use serde_json::Value;

use crate::db_types::Cents;

/// The six shipping-address components. On merchant events all six overwrite
/// the stored values, including to null when absent from the payload; the
/// payload replaces state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShippingAddress {
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
}

impl ShippingAddress {
    pub fn from_payload(payload: &Value) -> Self {
        let addr = &payload["shipping_address"];
        let field = |name: &str| addr[name].as_str().map(String::from);
        Self {
            address1: field("address1"),
            address2: field("address2"),
            city: field("city"),
            province: field("province"),
            zip: field("zip"),
            country: field("country"),
        }
    }
}

/// The merchant-side mutation derived from a `SHOPIFY_CREATED` /
/// `SHOPIFY_UPDATED` payload. Address fields always overwrite; the remaining
/// fields only apply when the payload carries them.
#[derive(Debug, Clone, Default)]
pub struct MerchantOrderUpdate {
    pub address: ShippingAddress,
    pub customer_id: Option<String>,
    pub status: Option<String>,
    pub total_amount: Option<Cents>,
    pub shipping_fee_cents: Option<Cents>,
}

impl MerchantOrderUpdate {
    pub fn from_payload(payload: &Value) -> Self {
        let customer_id = payload["customer"]["id"]
            .as_str()
            .map(String::from)
            .or_else(|| payload["customer"]["id"].as_i64().map(|id| id.to_string()));
        let status = payload["financial_status"].as_str().map(String::from);
        let total_amount = money_field(&payload["total_price"]);
        let shipping_fee_cents = payload["shipping_fee_cents"].as_i64().map(Cents::from);
        Self { address: ShippingAddress::from_payload(payload), customer_id, status, total_amount, shipping_fee_cents }
    }
}

/// The courier-side fields of a `COURIER_STATUS_UPDATE` payload.
#[derive(Debug, Clone, Default)]
pub struct CourierUpdate {
    pub tracking_number: Option<String>,
    pub courier_status: Option<String>,
}

impl CourierUpdate {
    pub fn from_payload(payload: &Value) -> Self {
        Self {
            tracking_number: payload["trackingNumber"].as_str().map(String::from),
            courier_status: payload["status"].as_str().map(String::from),
        }
    }
}

/// Merchant platforms express money as decimal strings ("12.34"); accept
/// those as well as plain integer cents.
fn money_field(value: &Value) -> Option<Cents> {
    match value {
        Value::Number(n) => n.as_i64().map(Cents::from),
        Value::String(s) => parse_money_string(s),
        _ => None,
    }
}

fn parse_money_string(price: &str) -> Option<Cents> {
    let mut parts = price.split('.');
    let whole_units = parts.next()?.parse::<i64>().ok()?;
    let cents = match parts.next() {
        Some(frac) => {
            // Normalise "5", "50" and "500" to two decimal places.
            let frac: String = frac.chars().chain(std::iter::repeat('0')).take(2).collect();
            frac.parse::<i64>().ok()?
        },
        None => 0,
    };
    Some(Cents::from(100 * whole_units + cents))
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn absent_address_fields_map_to_none() {
        let payload = json!({"shipping_address": {"address1": "A", "city": "X"}});
        let addr = ShippingAddress::from_payload(&payload);
        assert_eq!(addr.address1.as_deref(), Some("A"));
        assert_eq!(addr.city.as_deref(), Some("X"));
        assert!(addr.zip.is_none());
        assert!(addr.country.is_none());
    }

    #[test]
    fn merchant_update_from_scenario_payload() {
        let payload = json!({
            "id": "o1",
            "customer": {"id": "c1"},
            "shipping_address": {"address1": "A", "city": "X", "province": "NY", "zip": "10001", "country": "US"},
            "financial_status": "paid",
            "total_price": "19.90",
        });
        let update = MerchantOrderUpdate::from_payload(&payload);
        assert_eq!(update.customer_id.as_deref(), Some("c1"));
        assert_eq!(update.status.as_deref(), Some("paid"));
        assert_eq!(update.total_amount, Some(Cents::from(1990)));
        assert!(update.shipping_fee_cents.is_none());
    }

    #[test]
    fn numeric_customer_ids_are_accepted() {
        let update = MerchantOrderUpdate::from_payload(&json!({"customer": {"id": 42}}));
        assert_eq!(update.customer_id.as_deref(), Some("42"));
    }

    #[test]
    fn money_strings_parse_to_cents() {
        assert_eq!(parse_money_string("12.34"), Some(Cents::from(1234)));
        assert_eq!(parse_money_string("12.5"), Some(Cents::from(1250)));
        assert_eq!(parse_money_string("12"), Some(Cents::from(1200)));
        assert_eq!(parse_money_string("not-a-price"), None);
    }

    #[test]
    fn courier_update_reads_camel_case_fields() {
        let update = CourierUpdate::from_payload(&json!({"trackingNumber": "T1", "status": "SHIPPED"}));
        assert_eq!(update.tracking_number.as_deref(), Some("T1"));
        assert_eq!(update.courier_status.as_deref(), Some("SHIPPED"));
    }
}
