//! ---
//! meterlink_section: "01-core-functionality"
//! meterlink_subsection: "module"
//! meterlink_type: "source"
//! meterlink_scope: "code"
//! meterlink_description: "Presentation boundary for window updates and failures."
//! meterlink_version: "v0.1.0"
//! meterlink_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use meterlink_sim::Reading;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::aggregate::ChannelAverages;
use crate::error::Notification;

/// Published after every accepted reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowUpdate {
    pub session: u64,
    pub published_at: DateTime<Utc>,
    pub readings: Vec<Reading>,
    pub averages: ChannelAverages,
}

/// Receives structured output from the scheduler. Rendering is entirely the
/// implementor's business.
///
/// Calls are made from the scheduler's tasks and must not block.
pub trait Presenter: Send + Sync + 'static {
    fn publish(&self, update: WindowUpdate);

    fn notify(&self, notification: Notification);

    fn session_started(&self, _session: u64) {}

    fn session_stopped(&self, _session: u64) {}

    /// The collector rejected the credential; whoever owns the login flow
    /// should prompt for a new one.
    fn session_expired(&self) {}
}

/// Everything a [`ChannelPresenter`] forwards.
#[derive(Debug, Clone, PartialEq)]
pub enum PresenterEvent {
    Started(u64),
    Stopped(u64),
    Update(WindowUpdate),
    Failure(Notification),
    SessionExpired,
}

/// Forwards every call into an unbounded channel so a UI task can render at
/// its own pace.
#[derive(Debug, Clone)]
pub struct ChannelPresenter {
    tx: mpsc::UnboundedSender<PresenterEvent>,
}

impl ChannelPresenter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PresenterEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, event: PresenterEvent) {
        // A dropped receiver only means nobody is watching any more.
        let _ = self.tx.send(event);
    }
}

impl Presenter for ChannelPresenter {
    fn publish(&self, update: WindowUpdate) {
        self.forward(PresenterEvent::Update(update));
    }

    fn notify(&self, notification: Notification) {
        self.forward(PresenterEvent::Failure(notification));
    }

    fn session_started(&self, session: u64) {
        self.forward(PresenterEvent::Started(session));
    }

    fn session_stopped(&self, session: u64) {
        self.forward(PresenterEvent::Stopped(session));
    }

    fn session_expired(&self) {
        self.forward(PresenterEvent::SessionExpired);
    }
}

/// Presenter that only logs; useful headless.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPresenter;

impl Presenter for TracingPresenter {
    fn publish(&self, update: WindowUpdate) {
        info!(
            session = update.session,
            window = update.readings.len(),
            averages = ?update.averages,
            "window updated"
        );
    }

    fn notify(&self, notification: Notification) {
        warn!(kind = ?notification.kind, status = ?notification.status, message = %notification.message, "emission failure");
    }

    fn session_expired(&self) {
        warn!("collector rejected the credential; log in again");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EmissionError, NoSessionError, NotificationKind};

    #[test]
    fn channel_presenter_forwards_in_order() {
        let (presenter, mut rx) = ChannelPresenter::new();
        presenter.session_started(1);
        presenter.notify(EmissionError::from(NoSessionError).to_notification());
        presenter.session_expired();
        presenter.session_stopped(1);

        assert_eq!(rx.try_recv().unwrap(), PresenterEvent::Started(1));
        match rx.try_recv().unwrap() {
            PresenterEvent::Failure(notice) => assert_eq!(notice.kind, NotificationKind::NoSession),
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(rx.try_recv().unwrap(), PresenterEvent::SessionExpired);
        assert_eq!(rx.try_recv().unwrap(), PresenterEvent::Stopped(1));
    }

    #[test]
    fn dropped_receiver_is_tolerated() {
        let (presenter, rx) = ChannelPresenter::new();
        drop(rx);
        presenter.session_started(3);
    }
}
