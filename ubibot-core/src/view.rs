use std::fmt;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::config::SensorConfig;
use crate::error::SetupError;
use crate::kind::MeasurementKind;
use crate::resource::SharedPolledResource;
use crate::snapshot::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Available(f64),
    Unavailable(UnavailableReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableReason {
    /// No fetch has succeeded yet.
    NoSnapshot,
    /// The snapshot does not carry this field.
    MissingField(&'static str),
    /// The field is present but its value is not numeric.
    InvalidValue(&'static str),
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnavailableReason::NoSnapshot => f.write_str("no data fetched yet"),
            UnavailableReason::MissingField(key) => {
                write!(f, "field `{key}` missing from channel data")
            }
            UnavailableReason::InvalidValue(key) => write!(f, "field `{key}` is not numeric"),
        }
    }
}

impl Reading {
    pub fn value(&self) -> Option<f64> {
        match self {
            Reading::Available(value) => Some(*value),
            Reading::Unavailable(_) => None,
        }
    }

    pub fn project(snapshot: Option<&Snapshot>, kind: MeasurementKind) -> Self {
        let Some(snapshot) = snapshot else {
            return Reading::Unavailable(UnavailableReason::NoSnapshot);
        };
        let key = kind.field_key();
        match snapshot.field(key).map(|field| field.number()) {
            Some(Some(value)) => Reading::Available(value),
            Some(None) => Reading::Unavailable(UnavailableReason::InvalidValue(key)),
            None => Reading::Unavailable(UnavailableReason::MissingField(key)),
        }
    }
}

/// One measurement of a channel, read from the shared resource's snapshot.
pub struct ReadingView {
    kind: MeasurementKind,
    resource: Arc<SharedPolledResource>,
    last: RwLock<Reading>,
}

impl ReadingView {
    /// Create a view seeded from whatever the resource already holds. Does not
    /// refresh and never fails, even when nothing has been fetched.
    pub async fn new(kind: MeasurementKind, resource: Arc<SharedPolledResource>) -> Self {
        let snapshot = resource.current_snapshot().await;
        let initial = Reading::project(snapshot.as_deref(), kind);
        Self {
            kind,
            resource,
            last: RwLock::new(initial),
        }
    }

    pub fn kind(&self) -> MeasurementKind {
        self.kind
    }

    pub fn display_name(&self) -> String {
        format!("Ubibot - {} - {}", self.resource.channel(), self.kind)
    }

    pub fn unit(&self) -> &'static str {
        self.kind.unit()
    }

    pub fn icon(&self) -> &'static str {
        self.kind.icon()
    }

    pub fn device_class(&self) -> &'static str {
        self.kind.device_class()
    }

    pub fn field_key(&self) -> &'static str {
        self.kind.field_key()
    }

    /// Refresh the shared resource if due, then read this view's field.
    pub async fn current_value(&self) -> Reading {
        let outcome = self.resource.refresh().await;
        let snapshot = self.resource.current_snapshot().await;
        let reading = Reading::project(snapshot.as_deref(), self.kind);
        debug!(kind = %self.kind, ?outcome, ?reading, "reading projected");
        *self.last.write().await = reading;
        reading
    }

    /// Last reading produced, without touching the network.
    pub async fn last_reading(&self) -> Reading {
        *self.last.read().await
    }
}

/// Connect to the configured channel and return one view per measurement kind,
/// all sharing a single resource.
pub async fn setup(config: &SensorConfig) -> Result<Vec<ReadingView>, SetupError> {
    let resource = SharedPolledResource::connect(config).await?;
    Ok(views_for(resource).await)
}

pub async fn views_for(resource: Arc<SharedPolledResource>) -> Vec<ReadingView> {
    let mut views = Vec::with_capacity(MeasurementKind::ALL.len());
    for kind in MeasurementKind::ALL {
        views.push(ReadingView::new(kind, Arc::clone(&resource)).await);
    }
    views
}
