use std::fmt;

/// Measurements exposed for every channel, each backed by one snapshot field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeasurementKind {
    Temperature,
    Humidity,
    Lux,
}

struct KindInfo {
    name: &'static str,
    unit: &'static str,
    icon: &'static str,
    device_class: &'static str,
    field_key: &'static str,
}

impl MeasurementKind {
    pub const ALL: [MeasurementKind; 3] = [
        MeasurementKind::Temperature,
        MeasurementKind::Humidity,
        MeasurementKind::Lux,
    ];

    fn info(self) -> KindInfo {
        match self {
            MeasurementKind::Temperature => KindInfo {
                name: "temperature",
                unit: "°C",
                icon: "thermometer",
                device_class: "temperature",
                field_key: "field1",
            },
            MeasurementKind::Humidity => KindInfo {
                name: "humidity",
                unit: "%",
                icon: "water-percent",
                device_class: "humidity",
                field_key: "field2",
            },
            MeasurementKind::Lux => KindInfo {
                name: "lux",
                unit: "lx",
                icon: "lightbulb-on-outline",
                device_class: "illuminance",
                field_key: "field3",
            },
        }
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    pub fn unit(self) -> &'static str {
        self.info().unit
    }

    pub fn icon(self) -> &'static str {
        self.info().icon
    }

    pub fn device_class(self) -> &'static str {
        self.info().device_class
    }

    /// Key of the channel field this measurement is read from.
    pub fn field_key(self) -> &'static str {
        self.info().field_key
    }
}

impl fmt::Display for MeasurementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
