//! ---
//! meterlink_section: "01-core-functionality"
//! meterlink_subsection: "module"
//! meterlink_type: "source"
//! meterlink_scope: "code"
//! meterlink_description: "Telemetry emission loop and its collaborators."
//! meterlink_version: "v0.1.0"
//! meterlink_owner: "tbd"
//! ---
//! Telemetry emission core: on every cadence tick a reading is generated,
//! authorised through the [`SessionGate`], submitted to the collector, folded
//! into the [`SlidingWindow`], and the resulting aggregates are published to a
//! [`Presenter`].

pub mod aggregate;
pub mod cadence;
pub mod error;
pub mod presenter;
pub mod scheduler;
pub mod session;
pub mod window;

pub use aggregate::{average, ChannelAverages};
pub use error::{EmissionError, NoSessionError, Notification, NotificationKind};
pub use meterlink_net::{Credential, SubmissionClient, SubmitError};
pub use meterlink_sim::{Channel, Reading, SignalGenerator};
pub use presenter::{ChannelPresenter, Presenter, PresenterEvent, TracingPresenter, WindowUpdate};
pub use scheduler::{EmissionScheduler, EmissionSettings, SchedulerStats};
pub use session::{FileSessionStorage, MemorySessionStorage, SessionGate, SessionStorage};
pub use window::SlidingWindow;
