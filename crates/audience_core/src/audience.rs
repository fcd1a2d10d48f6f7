//! # Live Audiences
//!
//! An [`Audience`] is a handle on a [`SelectionCriterion`]. It never stores a
//! member list: every dispatch resolves the criterion against the directory
//! as it is at that moment, so a handle obtained once stays correct as
//! players join, leave, move or gain permissions.
//!
//! ## Delivery semantics
//!
//! * Fan-out is per recipient: each member's transport is called
//!   independently and a failure, timeout or panic for one never affects
//!   the others
//! * Nothing is retried; failures are logged and listed in the
//!   [`DispatchReport`]
//! * No directory lock is held while transports run
//!
//! The handle only holds a weak reference to its platform. Once the platform
//! is dropped or shut down, every dispatch reaches nobody.

use crate::criterion::SelectionCriterion;
use crate::platform::PlatformShared;
use crate::transport::{Content, MessageKind, Operation, TitleTimes, TransportError};
use crate::types::Recipient;
use futures::future::join_all;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};
use tracing::{trace, warn};

/// Outcome of one dispatch, in snapshot order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Recipients whose transport accepted the operation
    pub delivered: Vec<Recipient>,
    /// Recipients whose transport failed, with the reason
    pub failed: Vec<(Recipient, TransportError)>,
}

impl DispatchReport {
    /// Every recipient the dispatch was attempted for.
    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }

    /// True when the audience matched nobody.
    pub fn is_empty(&self) -> bool {
        self.attempted() == 0
    }

    pub fn was_delivered_to(&self, recipient: Recipient) -> bool {
        self.delivered.contains(&recipient)
    }
}

pub(crate) struct AudienceInner {
    criterion: SelectionCriterion,
    platform: Weak<PlatformShared>,
}

impl AudienceInner {
    pub(crate) fn new(criterion: SelectionCriterion, platform: Weak<PlatformShared>) -> Arc<Self> {
        Arc::new(Self { criterion, platform })
    }
}

/// A live, reusable audience handle.
///
/// Cloning is cheap and clones share identity with the original.
#[derive(Clone)]
pub struct Audience {
    inner: Arc<AudienceInner>,
}

impl Audience {
    pub(crate) fn from_inner(inner: Arc<AudienceInner>) -> Self {
        Self { inner }
    }

    /// The membership rule of this audience.
    pub fn criterion(&self) -> &SelectionCriterion {
        &self.inner.criterion
    }

    /// Whether both handles refer to the same cached audience.
    pub fn ptr_eq(&self, other: &Audience) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// The recipients a dispatch issued now would reach.
    pub async fn members(&self) -> Vec<Recipient> {
        let Some(platform) = self.live_platform() else {
            return Vec::new();
        };
        platform
            .resolve(&self.inner.criterion)
            .await
            .into_iter()
            .map(|member| member.recipient)
            .collect()
    }

    /// Sends `operation` to every current member.
    pub async fn dispatch(&self, operation: Operation) -> DispatchReport {
        let Some(platform) = self.live_platform() else {
            trace!(audience = %self.inner.criterion, "Dispatch to released platform dropped");
            return DispatchReport::default();
        };

        let members = platform.resolve(&self.inner.criterion).await;
        let timeout = platform.send_timeout;
        let operation = &operation;

        let sends = members.iter().map(|member| async move {
            let send = AssertUnwindSafe(member.transport.send(member.recipient, operation))
                .catch_unwind();
            let outcome = match timeout {
                Some(limit) => tokio::time::timeout(limit, send)
                    .await
                    .unwrap_or(Ok(Err(TransportError::Timeout(limit)))),
                None => send.await,
            };
            let result = outcome
                .unwrap_or_else(|_| Err(TransportError::Other("transport panicked".to_string())));
            (member.recipient, result)
        });

        let mut report = DispatchReport::default();
        let mut timed_out = 0;
        for (recipient, result) in join_all(sends).await {
            match result {
                Ok(()) => report.delivered.push(recipient),
                Err(error) => {
                    warn!(
                        %recipient,
                        %error,
                        audience = %self.inner.criterion,
                        operation = operation.name(),
                        "⚠️ Delivery failed"
                    );
                    if matches!(error, TransportError::Timeout(_)) {
                        timed_out += 1;
                    }
                    report.failed.push((recipient, error));
                }
            }
        }

        platform
            .counters
            .record_dispatch(report.delivered.len(), report.failed.len(), timed_out);
        trace!(
            audience = %self.inner.criterion,
            operation = operation.name(),
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            "📡 Dispatched"
        );
        report
    }

    pub async fn send_message(&self, content: impl Into<Content>) -> DispatchReport {
        self.dispatch(Operation::Message {
            content: content.into(),
            kind: MessageKind::Chat,
        })
        .await
    }

    pub async fn send_system_message(&self, content: impl Into<Content>) -> DispatchReport {
        self.dispatch(Operation::Message {
            content: content.into(),
            kind: MessageKind::System,
        })
        .await
    }

    pub async fn send_action_bar(&self, content: impl Into<Content>) -> DispatchReport {
        self.dispatch(Operation::ActionBar {
            content: content.into(),
        })
        .await
    }

    pub async fn show_title(
        &self,
        title: impl Into<Content>,
        subtitle: Option<Content>,
        times: Option<TitleTimes>,
    ) -> DispatchReport {
        self.dispatch(Operation::Title {
            title: title.into(),
            subtitle,
            times,
        })
        .await
    }

    pub async fn clear_title(&self) -> DispatchReport {
        self.dispatch(Operation::ClearTitle).await
    }

    pub async fn reset_title(&self) -> DispatchReport {
        self.dispatch(Operation::ResetTitle).await
    }

    pub async fn play_sound(&self, sound: impl Into<Content>) -> DispatchReport {
        self.dispatch(Operation::PlaySound { sound: sound.into() }).await
    }

    /// Stops `sound`, or every sound when `None`.
    pub async fn stop_sound(&self, sound: Option<Content>) -> DispatchReport {
        self.dispatch(Operation::StopSound { sound }).await
    }

    pub async fn show_boss_bar(&self, bar: impl Into<Content>) -> DispatchReport {
        self.dispatch(Operation::ShowBossBar { bar: bar.into() }).await
    }

    pub async fn hide_boss_bar(&self, bar: impl Into<Content>) -> DispatchReport {
        self.dispatch(Operation::HideBossBar { bar: bar.into() }).await
    }

    pub async fn open_book(&self, book: impl Into<Content>) -> DispatchReport {
        self.dispatch(Operation::OpenBook { book: book.into() }).await
    }

    fn live_platform(&self) -> Option<Arc<PlatformShared>> {
        self.inner
            .platform
            .upgrade()
            .filter(|platform| !platform.shutdown.is_shutdown_initiated())
    }
}

impl std::fmt::Debug for Audience {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Audience")
            .field("criterion", &self.inner.criterion)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_helpers() {
        let mut report = DispatchReport::default();
        assert!(report.is_empty());

        report.delivered.push(Recipient::Console);
        report.failed.push((Recipient::Console, TransportError::Backpressure));
        assert_eq!(report.attempted(), 2);
        assert!(report.was_delivered_to(Recipient::Console));
    }

    #[tokio::test]
    async fn test_orphaned_handle_reaches_nobody() {
        let audience =
            Audience::from_inner(AudienceInner::new(SelectionCriterion::All, Weak::new()));
        assert!(audience.members().await.is_empty());
        assert!(audience.send_message("hello").await.is_empty());
    }
}
