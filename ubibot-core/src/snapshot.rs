use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};

/// Latest observation of one channel field, e.g. `field1`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldValue {
    /// Raw value as sent by the API; see [`FieldValue::number`].
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl FieldValue {
    /// Numeric reading, accepting JSON numbers and numeric strings.
    pub fn number(&self) -> Option<f64> {
        match &self.value {
            serde_json::Value::Number(number) => number.as_f64(),
            serde_json::Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Decoded latest values of a channel, produced by a single successful fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub channel_name: Option<String>,
    pub fields: HashMap<String, FieldValue>,
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    /// Decode a `GET /channels/{id}` response body.
    ///
    /// Entries of `last_values` that are not field objects are dropped rather
    /// than failing the whole snapshot.
    pub fn from_body(body: &[u8], fetched_at: DateTime<Utc>) -> Result<Self, serde_json::Error> {
        let response: ChannelResponse = serde_json::from_slice(body)?;
        let fields = response
            .channel
            .last_values
            .into_iter()
            .filter_map(|(key, raw)| {
                serde_json::from_value::<FieldValue>(raw)
                    .ok()
                    .map(|field| (key, field))
            })
            .collect();
        Ok(Self {
            channel_name: response.channel.name,
            fields,
            fetched_at,
        })
    }

    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }
}

#[derive(Debug, Deserialize)]
struct ChannelResponse {
    channel: ChannelBody,
}

#[derive(Debug, Deserialize)]
struct ChannelBody {
    #[serde(default)]
    name: Option<String>,
    // The API ships this map as a JSON document inside a string.
    #[serde(deserialize_with = "embedded_json")]
    last_values: HashMap<String, serde_json::Value>,
}

fn embedded_json<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = String::deserialize(deserializer)?;
    serde_json::from_str(&raw).map_err(D::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_with(last_values: serde_json::Value) -> Vec<u8> {
        let body = serde_json::json!({
            "result": "success",
            "channel": {
                "channel_id": "1234",
                "name": "Greenhouse",
                "last_values": last_values.to_string(),
            }
        });
        serde_json::to_vec(&body).unwrap()
    }

    #[test]
    fn decodes_embedded_last_values() {
        let bytes = body_with(serde_json::json!({
            "field1": { "value": 21.5, "created_at": "2024-10-21T07:28:00Z" },
            "field2": { "value": 48, "net": 1 },
        }));
        let now = Utc::now();

        let snapshot = Snapshot::from_body(&bytes, now).unwrap();
        assert_eq!(snapshot.channel_name.as_deref(), Some("Greenhouse"));
        assert_eq!(snapshot.fetched_at, now);
        assert_eq!(snapshot.field("field1").unwrap().number(), Some(21.5));
        assert_eq!(
            snapshot.field("field1").unwrap().created_at.as_deref(),
            Some("2024-10-21T07:28:00Z")
        );
        let humidity = snapshot.field("field2").unwrap();
        assert_eq!(humidity.number(), Some(48.0));
        assert_eq!(humidity.extra.get("net"), Some(&serde_json::json!(1)));
        assert!(snapshot.field("field3").is_none());
    }

    #[test]
    fn odd_values_in_unread_fields_do_not_fail_decoding() {
        let bytes = body_with(serde_json::json!({
            "field1": { "value": 21.5 },
            "field4": { "value": "3.02" },
            "field5": { "value": null },
            "field6": null,
            "field7": "offline",
        }));

        let snapshot = Snapshot::from_body(&bytes, Utc::now()).unwrap();
        assert_eq!(snapshot.field("field1").unwrap().number(), Some(21.5));
        assert_eq!(snapshot.field("field4").unwrap().number(), Some(3.02));
        assert_eq!(snapshot.field("field5").unwrap().number(), None);
        assert!(snapshot.field("field6").is_none());
        assert!(snapshot.field("field7").is_none());
    }

    #[test]
    fn rejects_last_values_that_are_not_a_string() {
        let body = br#"{"channel":{"last_values":{"field1":{"value":1.0}}}}"#;
        assert!(Snapshot::from_body(body, Utc::now()).is_err());
    }

    #[test]
    fn rejects_garbage_inside_last_values() {
        let body = br#"{"channel":{"last_values":"not json"}}"#;
        assert!(Snapshot::from_body(body, Utc::now()).is_err());
    }

    #[test]
    fn rejects_missing_channel_object() {
        let body = br#"{"result":"error","desc":"permission denied"}"#;
        assert!(Snapshot::from_body(body, Utc::now()).is_err());
    }
}
