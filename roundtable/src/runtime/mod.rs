//! Session runtime: the driver loop, its internal state machine, the
//! per-process session registry, and the public handle API.

mod driver;
mod handle;
mod registry;
mod state_machine;

pub use driver::CancelToken;
pub use handle::{AgentSet, RoundtableHandle, SessionStatusView};
pub use registry::SessionRegistry;
pub use state_machine::{DriverState, DriverStateMachine, IllegalTransition};
