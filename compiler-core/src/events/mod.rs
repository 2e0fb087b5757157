//! Session event stream
//!
//! Alongside the snapshot channel, the session publishes a discrete event
//! for every submission milestone so observers (logs, the CLI, tests) can
//! follow what happened without diffing snapshots.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │   Session    │────▶│  Event Bus   │────▶│  Subscribers │
//! │  (publish)   │     │  (broadcast) │     │   (recv)     │
//! └──────────────┘     └──────────────┘     └──────────────┘
//! ```

pub mod bus;
pub mod types;

pub use bus::{EventBusExt, EventFilter, FilteredReceiver, SessionEventBus};
pub use types::SessionEvent;
