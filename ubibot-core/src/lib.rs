pub mod clock;
pub mod config;
pub mod error;
pub mod kind;
pub mod resource;
pub mod snapshot;
pub mod view;

pub use clock::{Clock, SystemClock};
pub use config::SensorConfig;
pub use error::{ConfigError, FetchError, SetupError};
pub use kind::MeasurementKind;
pub use resource::{build_client, RefreshOutcome, SharedPolledResource};
pub use snapshot::{FieldValue, Snapshot};
pub use view::{setup, views_for, Reading, ReadingView, UnavailableReason};
