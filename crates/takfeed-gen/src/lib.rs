//! Event producers for takfeed
//!
//! - [`incident`]: converts CAD incident records into marker events
//! - [`drone`]: simulates a Remote ID broadcasting aircraft
//! - [`scheduler`]: runs a producer once over a batch or at a fixed interval
//! - [`queue`]: the bounded FIFO handing serialized events to the transport
//!
//! Producers are synchronous. The only suspension points are the scheduler's
//! interval wait and a full queue.
//!
//! ```
//! use std::sync::Arc;
//! use takfeed_core::config::IncidentConfig;
//! use takfeed_gen::incident::{IncidentConverter, IncidentFeed};
//!
//! let feed = IncidentFeed::from_json(
//!     r#"{"Incidents": [{"incident_number": "123", "incident_status": " ACTIVE "}]}"#,
//! ).unwrap();
//!
//! let converter = IncidentConverter::with_config(IncidentConfig::default());
//! let event = converter.convert(&feed.incidents[0]);
//! assert_eq!(event.uid, "GeoSafety-123");
//! assert_eq!(event.group_name(), Some("Orange"));
//! ```

pub mod clock;
pub mod drone;
pub mod id;
pub mod incident;
pub mod queue;
pub mod scheduler;

pub use clock::{Clock, FixedClock, SystemClock};
pub use drone::{advance, meters_to_deg_lon, DroneSimulator, TrackState};
pub use id::{IdSource, SequentialIdSource, UuidIdSource};
pub use incident::{Comment, IncidentConverter, IncidentFeed, IncidentRecord};
pub use queue::{tx_queue, QueueError, QueuedEvent, TxQueue, TxReceiver};
pub use scheduler::{Producer, RunSummary, Scheduler, SchedulerState, SchedulerStatus, StopReason};
