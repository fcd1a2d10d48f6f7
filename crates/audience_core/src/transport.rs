//! # Outbound Operations and Transports
//!
//! An [`Operation`] is the presentational event an audience forwards to each
//! of its members: a chat message, a title, a sound, and so on. The content it
//! carries is opaque to this crate; it is only cloned and forwarded.
//!
//! A [`Transport`] is the per-viewer delivery handle. It owns its own queueing
//! and backpressure; the audience layer calls it once per recipient and never
//! retries.

use crate::types::Recipient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

/// Opaque content payload (rendered text, sound descriptor, book, ...).
///
/// Cloning is a reference-count bump, so a payload fanned out to thousands of
/// recipients is allocated once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content(Arc<serde_json::Value>);

impl Content {
    pub fn new(value: serde_json::Value) -> Self {
        Self(Arc::new(value))
    }

    /// Plain text content.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(serde_json::Value::String(text.into()))
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

impl From<serde_json::Value> for Content {
    fn from(value: serde_json::Value) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

/// How a chat message should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Player-originated chat
    #[default]
    Chat,
    /// Server/system notice
    System,
}

/// Fade timings for a title, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleTimes {
    pub fade_in_ms: u64,
    pub stay_ms: u64,
    pub fade_out_ms: u64,
}

impl Default for TitleTimes {
    fn default() -> Self {
        Self {
            fade_in_ms: 500,
            stay_ms: 3500,
            fade_out_ms: 1000,
        }
    }
}

/// A presentational event delivered to every member of an audience.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    Message { content: Content, kind: MessageKind },
    ActionBar { content: Content },
    Title {
        title: Content,
        subtitle: Option<Content>,
        times: Option<TitleTimes>,
    },
    ClearTitle,
    ResetTitle,
    PlaySound { sound: Content },
    /// Stops the given sound, or every sound when `None`
    StopSound { sound: Option<Content> },
    ShowBossBar { bar: Content },
    HideBossBar { bar: Content },
    OpenBook { book: Content },
}

impl Operation {
    /// Short name used in log fields.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Message { .. } => "message",
            Operation::ActionBar { .. } => "action_bar",
            Operation::Title { .. } => "title",
            Operation::ClearTitle => "clear_title",
            Operation::ResetTitle => "reset_title",
            Operation::PlaySound { .. } => "play_sound",
            Operation::StopSound { .. } => "stop_sound",
            Operation::ShowBossBar { .. } => "show_boss_bar",
            Operation::HideBossBar { .. } => "hide_boss_bar",
            Operation::OpenBook { .. } => "open_book",
        }
    }
}

/// Per-recipient delivery failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The recipient's connection is gone
    #[error("recipient disconnected")]
    Disconnected,

    /// The recipient's outbound queue is full
    #[error("outbound queue full")]
    Backpressure,

    /// The send did not complete within the configured timeout
    #[error("send timed out after {0:?}")]
    Timeout(Duration),

    /// Any other transport-specific failure
    #[error("transport error: {0}")]
    Other(String),
}

/// Delivers a rendered operation to one connected recipient.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, recipient: Recipient, operation: &Operation) -> Result<(), TransportError>;
}

/// Transport backed by a bounded per-viewer queue.
///
/// The receiving half is drained by whatever writes to the viewer's socket.
/// A full queue is reported as [`TransportError::Backpressure`] instead of
/// waiting, so one slow client never stalls a broadcast.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    sender: mpsc::Sender<(Recipient, Operation)>,
}

impl ChannelTransport {
    /// Creates a transport and the receiver its consumer should drain.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<(Recipient, Operation)>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(
        &self,
        recipient: Recipient,
        operation: &Operation,
    ) -> Result<(), TransportError> {
        self.sender
            .try_send((recipient, operation.clone()))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => TransportError::Backpressure,
                mpsc::error::TrySendError::Closed(_) => TransportError::Disconnected,
            })
    }
}

/// Default console transport: renders every operation as a log line.
#[derive(Debug, Clone, Default)]
pub struct TracingConsole;

impl TracingConsole {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for TracingConsole {
    async fn send(
        &self,
        recipient: Recipient,
        operation: &Operation,
    ) -> Result<(), TransportError> {
        match operation {
            Operation::Message { content, kind } => {
                info!(target: "audience::console", %recipient, ?kind, "{}", render(content));
            }
            Operation::ActionBar { content } => {
                info!(target: "audience::console", %recipient, "[action bar] {}", render(content));
            }
            Operation::Title { title, subtitle, .. } => {
                let subtitle = subtitle.as_ref().map(render).unwrap_or_default();
                info!(
                    target: "audience::console",
                    %recipient,
                    "[title] {} {}",
                    render(title),
                    subtitle
                );
            }
            other => {
                info!(
                    target: "audience::console",
                    %recipient,
                    operation = other.name(),
                    "console ignored non-text operation"
                );
            }
        }
        Ok(())
    }
}

fn render(content: &Content) -> String {
    match content.as_value() {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
