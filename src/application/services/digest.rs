use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::handle::{spawn_periodic, LoopHandle};
use crate::domain::entities::alert::AlertGroups;
use crate::domain::entities::subscription::EmailSubscription;
use crate::domain::ports::clock::Clock;
use crate::domain::ports::mailer::{MailError, MailMessage, Mailer};
use crate::domain::ports::store::{AlertStore, StoreError, SubscriptionStore};
use crate::domain::value_objects::delivery_policy::DeliveryPolicy;
use crate::domain::value_objects::window::AlertWindow;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Tunables for the digest job.
#[derive(Debug, Clone, Copy)]
pub struct DigestSettings {
    pub period: Duration,
    pub send_timeout: Duration,
    pub policy: DeliveryPolicy,
}

impl Default for DigestSettings {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(3600),
            send_timeout: Duration::from_secs(10),
            policy: DeliveryPolicy::default(),
        }
    }
}

/// What one firing did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestOutcome {
    /// A previous firing was still running.
    Skipped,
    /// Nothing unsent in the window.
    Empty,
    /// Alerts were found but nobody is subscribed; they stay unsent.
    NoSubscribers { alerts: usize },
    Delivered {
        alerts: usize,
        recipients_ok: usize,
        recipients_failed: usize,
    },
}

#[derive(Debug, Default)]
struct DigestState {
    /// Start of the oldest window whose alerts are still waiting for delivery.
    backlog_start: Option<DateTime<Utc>>,
}

/// Periodically emails unsent alerts to every subscriber and marks them sent.
pub struct DigestScheduler {
    alerts: Arc<dyn AlertStore>,
    subscribers: Arc<dyn SubscriptionStore>,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
    settings: DigestSettings,
    state: Mutex<DigestState>,
}

impl DigestScheduler {
    #[must_use]
    pub fn new(
        alerts: Arc<dyn AlertStore>,
        subscribers: Arc<dyn SubscriptionStore>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
        settings: DigestSettings,
    ) -> Self {
        Self {
            alerts,
            subscribers,
            mailer,
            clock,
            settings,
            state: Mutex::new(DigestState::default()),
        }
    }

    /// Run one digest now.
    ///
    /// Returns [`DigestOutcome::Skipped`] without touching the store if
    /// another firing holds the scheduler.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the alert or subscription store fails. Mail
    /// failures are not errors; they are logged and counted in the outcome.
    pub async fn fire(&self) -> Result<DigestOutcome, StoreError> {
        let Ok(mut state) = self.state.try_lock() else {
            tracing::info!("Previous digest still running, firing skipped");
            return Ok(DigestOutcome::Skipped);
        };

        let window = self.window(state.backlog_start);
        let result = self.fire_window(&mut *state, window).await;
        if result.is_err() {
            // Nothing in the window was marked, so it is retried whole.
            state.backlog_start = Some(window.start);
        }
        result
    }

    async fn fire_window(
        &self,
        state: &mut DigestState,
        window: AlertWindow,
    ) -> Result<DigestOutcome, StoreError> {
        let groups = self.alerts.grouped_unsent(&window)?;
        let Some(through) = groups.high_water_mark() else {
            tracing::debug!("No unsent alerts in digest window");
            state.backlog_start = None;
            return Ok(DigestOutcome::Empty);
        };
        let window = window.through(through);
        let alerts = groups.alert_count();

        let recipients = self.subscribers.subscriptions()?;
        if recipients.is_empty() {
            tracing::warn!(alerts, "No digest subscribers, alerts left unsent");
            state.backlog_start = Some(window.start);
            return Ok(DigestOutcome::NoSubscribers { alerts });
        }

        let subject = digest_subject(&groups);
        let body = render_digest(&groups);

        let (recipients_ok, recipients_failed) = match self.settings.policy {
            DeliveryPolicy::MarkThenSend => {
                self.alerts.mark_sent_in_window(&window)?;
                state.backlog_start = None;
                let (ok, failed) = self.deliver(&recipients, &subject, &body).await;
                if failed > 0 {
                    tracing::error!(
                        alerts,
                        failed,
                        "Digest not delivered to every subscriber; alerts already marked sent are lost for them"
                    );
                }
                (ok, failed)
            }
            DeliveryPolicy::SendThenMark => {
                let (ok, failed) = self.deliver(&recipients, &subject, &body).await;
                if ok == 0 {
                    tracing::error!(
                        alerts,
                        failed,
                        "Digest delivery failed for every subscriber, will retry next firing"
                    );
                    state.backlog_start = Some(window.start);
                } else {
                    self.alerts.mark_sent_in_window(&window)?;
                    state.backlog_start = None;
                }
                (ok, failed)
            }
        };

        tracing::info!(alerts, recipients_ok, recipients_failed, "Digest fired");
        Ok(DigestOutcome::Delivered {
            alerts,
            recipients_ok,
            recipients_failed,
        })
    }

    /// Fire after one full period, then once per period.
    #[must_use]
    pub fn start(self: Arc<Self>) -> LoopHandle {
        let period = self.settings.period;
        spawn_periodic("digest", Instant::now() + period, period, move || {
            let digest = Arc::clone(&self);
            async move {
                if let Err(e) = digest.fire().await {
                    tracing::warn!("Digest firing failed: {e}");
                }
            }
        })
    }

    fn window(&self, backlog_start: Option<DateTime<Utc>>) -> AlertWindow {
        let period = TimeDelta::from_std(self.settings.period).unwrap_or(TimeDelta::hours(1));
        let mut window = AlertWindow::trailing(self.clock.now(), period);
        if let Some(start) = backlog_start {
            window.start = window.start.min(start);
        }
        window
    }

    async fn deliver(
        &self,
        recipients: &[EmailSubscription],
        subject: &str,
        body: &str,
    ) -> (usize, usize) {
        let relay = match self.subscribers.relay() {
            Ok(Some(relay)) => relay,
            Ok(None) => {
                tracing::error!("{}", MailError::NoRelay);
                return (0, recipients.len());
            }
            Err(e) => {
                tracing::error!("Mail relay unavailable: {e}");
                return (0, recipients.len());
            }
        };

        let mut ok = 0;
        let mut failed = 0;
        for recipient in recipients {
            let message = MailMessage {
                to: recipient.email.clone(),
                subject: subject.to_string(),
                body: body.to_string(),
            };
            let result = tokio::time::timeout(
                self.settings.send_timeout,
                self.mailer.send(&relay, &message),
            )
            .await
            .unwrap_or_else(|_| Err(MailError::Timeout(self.settings.send_timeout.as_secs())));

            match result {
                Ok(()) => ok += 1,
                Err(e) => {
                    tracing::error!(to = %recipient.email, "Digest send failed: {e}");
                    failed += 1;
                }
            }
        }
        (ok, failed)
    }
}

#[must_use]
pub fn digest_subject(groups: &AlertGroups) -> String {
    format!(
        "[webspecs] {} alert(s) on {} component(s)",
        groups.alert_count(),
        groups.component_count()
    )
}

/// Plain-text digest body: a section per component, newest entry first.
#[must_use]
pub fn render_digest(groups: &AlertGroups) -> String {
    let mut body = String::new();
    for (index, (component, entries)) in groups.iter().enumerate() {
        if index > 0 {
            body.push('\n');
        }
        body.push_str(component);
        body.push('\n');
        for entry in entries {
            // Writing to a String cannot fail.
            let _ = writeln!(
                body,
                "{}, {}, {}",
                entry.timestamp.format(TIMESTAMP_FORMAT),
                entry.value,
                entry.threshold
            );
        }
    }
    body
}
