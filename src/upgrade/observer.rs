//! Callbacks through which the update core reports to its caller.
//!
//! The download runs on a background task; observer methods are invoked on
//! that task. Moving results onto whatever thread owns UI state is the
//! observer's job. [`ChannelObserver`] does exactly that by forwarding every
//! callback as an [`UpdateEvent`] over a tokio channel.

use tokio::sync::mpsc;

/// Receives progress, completion and error notifications for one update.
///
/// For a single attempt, `on_error` is never followed by `on_complete`. If the
/// updater cannot be launched after `on_complete`, `on_error` follows it.
/// `on_progress` values are non-decreasing and never exceed `1.0`.
pub trait UpdateObserver: Send + Sync {
    /// Fraction of the download written so far, `0.0..=1.0`.
    ///
    /// Only called when the server advertised a content length.
    fn on_progress(&self, fraction: f64);

    /// The new binary is staged and verified; handoff follows.
    fn on_complete(&self);

    /// The attempt failed; no staging file is left behind.
    fn on_error(&self, message: &str);
}

/// One observer callback, as a value.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateEvent {
    /// See [`UpdateObserver::on_progress`].
    Progress(f64),
    /// See [`UpdateObserver::on_complete`].
    Complete,
    /// See [`UpdateObserver::on_error`].
    Error(String),
}

impl UpdateEvent {
    /// Replay this event on another observer.
    pub fn dispatch(&self, observer: &dyn UpdateObserver) {
        match self {
            Self::Progress(fraction) => observer.on_progress(*fraction),
            Self::Complete => observer.on_complete(),
            Self::Error(message) => observer.on_error(message),
        }
    }
}

/// Forwards callbacks to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<UpdateEvent>,
}

impl ChannelObserver {
    /// Create an observer and the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UpdateEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: UpdateEvent) {
        // Receiver gone means nobody is listening anymore.
        let _ = self.tx.send(event);
    }
}

impl UpdateObserver for ChannelObserver {
    fn on_progress(&self, fraction: f64) {
        self.send(UpdateEvent::Progress(fraction));
    }

    fn on_complete(&self) {
        self.send(UpdateEvent::Complete);
    }

    fn on_error(&self, message: &str) {
        self.send(UpdateEvent::Error(message.to_string()));
    }
}

/// Ignores every callback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl UpdateObserver for NoopObserver {
    fn on_progress(&self, _fraction: f64) {}

    fn on_complete(&self) {}

    fn on_error(&self, _message: &str) {}
}
