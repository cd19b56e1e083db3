//! User-facing notices and navigation requests emitted by the workflows.
//!
//! A UI drains the receiver returned by [`Feedback::channel`] and renders
//! notices as transient toasts.

use tokio::sync::mpsc;
use tracing::{error, info};

use crate::error::StorefrontError;
use crate::routes::Route;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: Level,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Notice(Notice),
    Navigate(Route),
}

#[derive(Debug, Clone)]
pub struct Feedback {
    sender: mpsc::UnboundedSender<UiEvent>,
}

impl Feedback {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn notice(&self, level: Level, message: impl Into<String>) {
        let _ = self.sender.send(UiEvent::Notice(Notice { level, message: message.into() }));
    }

    pub fn success(&self, message: impl Into<String>) {
        self.notice(Level::Success, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.notice(Level::Info, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.notice(Level::Error, message);
    }

    pub fn navigate(&self, route: Route) {
        info!(route = %route, "Navigation requested");
        let _ = self.sender.send(UiEvent::Navigate(route));
    }

    /// Surfaces a failed operation; lost sessions also go back to the login view.
    pub fn report(&self, context: &str, err: &StorefrontError) {
        error!(error = %err, "{context}");
        self.error(format!("{context}: {err}"));
        if err.requires_login() {
            self.info("Session expired, please sign in again.");
            self.navigate(Route::Login);
        }
    }
}

/// Drains everything currently queued, for tests and the demo binary.
pub fn drain(receiver: &mut mpsc::UnboundedReceiver<UiEvent>) -> Vec<UiEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}
