//! ---
//! meterlink_section: "05-networking-external-interfaces"
//! meterlink_subsection: "module"
//! meterlink_type: "source"
//! meterlink_scope: "code"
//! meterlink_description: "Remote collector connectivity."
//! meterlink_version: "v0.1.0"
//! meterlink_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Transport to the remote collector: the bearer [`Credential`], the
//! [`SubmissionClient`] seam used by the scheduler, and its HTTP implementation.

pub mod client;
pub mod credential;

pub use client::{DeviceEnvelope, HttpCollectorClient, SubmissionClient, SubmitError};
pub use credential::Credential;
