//! Download session orchestration: the controller state machine, the
//! event channel it writes to, and the pause/resume control surface.

mod controller;
mod emitter;
mod events;
mod pause;

pub use controller::{SessionConfig, SessionDeps, SessionError, run_session};
pub use emitter::{DEFAULT_EVENT_CAPACITY, EventSink};
pub use events::DownloadEvent;
pub use pause::{ControlAck, PauseControl, PauseListener, SessionRegistry};
