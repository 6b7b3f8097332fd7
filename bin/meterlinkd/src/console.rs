//! ---
//! meterlink_section: "01-core-functionality"
//! meterlink_subsection: "binary"
//! meterlink_type: "source"
//! meterlink_scope: "code"
//! meterlink_description: "Terminal rendering of window updates and notifications."
//! meterlink_version: "v0.1.0"
//! meterlink_owner: "tbd"
//! ---
use std::fmt::Write as _;

use meterlink_core::{Channel, Notification, NotificationKind, PresenterEvent, WindowUpdate};
use strum::IntoEnumIterator;
use tokio::sync::mpsc::UnboundedReceiver;

/// Why [`render`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderExit {
    /// The collector rejected the credential.
    SessionExpired,
    /// The session ended, by `stop()` or by a missing credential.
    Stopped(u64),
    /// The scheduler side hung up.
    Closed,
}

/// Print presenter events until the running session ends.
pub async fn render(mut events: UnboundedReceiver<PresenterEvent>) -> RenderExit {
    while let Some(event) = events.recv().await {
        match event {
            PresenterEvent::Started(session) => println!("generation started (session {session})"),
            PresenterEvent::Stopped(session) => {
                println!("generation stopped (session {session})");
                return RenderExit::Stopped(session);
            }
            PresenterEvent::Update(update) => println!("{}", window_table(&update)),
            PresenterEvent::Failure(notice) => eprintln!("{}", notice_line(&notice)),
            PresenterEvent::SessionExpired => {
                eprintln!("session expired; run `meterlinkd login` and start again");
                return RenderExit::SessionExpired;
            }
        }
    }
    RenderExit::Closed
}

fn header(channel: Channel) -> String {
    match channel.unit() {
        "" => channel.to_string(),
        unit => format!("{channel} ({unit})"),
    }
}

pub fn window_table(update: &WindowUpdate) -> String {
    let mut out = String::new();
    let _ = write!(out, "{:>3}", "#");
    for channel in Channel::CHARTED {
        let _ = write!(out, " {:>14}", header(channel));
    }
    out.push('\n');
    for (index, reading) in update.readings.iter().enumerate() {
        let _ = write!(out, "{:>3}", index + 1);
        for channel in Channel::CHARTED {
            let _ = write!(out, " {:>14.2}", reading.value(channel));
        }
        out.push('\n');
    }
    let _ = write!(out, "avg");
    for (channel, value) in Channel::iter().map(|c| (c, update.averages.get(c))) {
        let _ = write!(out, " {channel}={value:.3}");
    }
    out
}

pub fn notice_line(notice: &Notification) -> String {
    let label = match notice.kind {
        NotificationKind::NoSession => "no session",
        NotificationKind::AuthRejected => "session rejected",
        NotificationKind::Transport => "submission failed",
    };
    format!("{label}: {}", notice.message)
}
