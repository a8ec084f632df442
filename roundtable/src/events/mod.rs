//! Pub/sub event bus for session observers.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │   Driver     │────▶│  Event Bus   │────▶│  Subscribers │
//! │  (publish)   │     │  (broadcast) │     │   (recv)     │
//! └──────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! There is deliberately no replay/history component here: a client
//! that reconnects mid-session is expected to use the pull-based
//! status/artifact reads on `RoundtableHandle` instead of replaying
//! missed events (see SPEC_FULL.md §4.5 / §9).

pub mod bus;
pub mod types;

pub use bus::{EventBus, EventBusExt, EventFilter, FilteredReceiver, SharedEventBus};
pub use types::{LogLevel, RoundtableEvent};
