#![allow(dead_code)]

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use ubibot_core::{Clock, SensorConfig};

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 10, 21, 7, 0, 0).unwrap()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += chrono::Duration::from_std(by).unwrap();
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub fn channel_body(temperature: f64, humidity: f64, lux: f64) -> serde_json::Value {
    let last_values = serde_json::json!({
        "field1": { "value": temperature, "created_at": "2024-10-21T07:28:00Z" },
        "field2": { "value": humidity, "created_at": "2024-10-21T07:28:00Z" },
        "field3": { "value": lux, "created_at": "2024-10-21T07:28:00Z" },
    });
    serde_json::json!({
        "result": "success",
        "channel": {
            "channel_id": "1234",
            "name": "Greenhouse",
            "last_values": last_values.to_string(),
        }
    })
}

pub fn config_for(endpoint: &str) -> SensorConfig {
    let mut config = SensorConfig::new("test-key", "1234");
    config.endpoint = endpoint.to_owned();
    config.request_timeout_seconds = 5;
    config
}
