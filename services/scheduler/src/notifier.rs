//! Lifecycle event emission toward the platform's notification service
//!
//! The scheduling core's responsibility ends at producing the event
//! with a meeting snapshot; delivery to email/push/in-app channels is
//! the notification service's job. Emission failures are logged and
//! never propagated: the state change has already committed.

use serde::Serialize;
use serde_json::json;
use std::env;
use tracing::{error, info};

use crate::models::meeting::Meeting;

/// Meeting lifecycle events consumed by the notification service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    MeetingRequested,
    MeetingAccepted,
    MeetingDeclined,
    MeetingCancelled,
    MeetingReminder,
}

impl LifecycleEvent {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleEvent::MeetingRequested => "meeting_requested",
            LifecycleEvent::MeetingAccepted => "meeting_accepted",
            LifecycleEvent::MeetingDeclined => "meeting_declined",
            LifecycleEvent::MeetingCancelled => "meeting_cancelled",
            LifecycleEvent::MeetingReminder => "meeting_reminder",
        }
    }
}

/// Webhook-based notification emitter
#[derive(Clone)]
pub struct Notifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl Notifier {
    /// Build from `NOTIFY_WEBHOOK_URL`; without it, events are only
    /// logged
    pub fn from_env() -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url: env::var("NOTIFY_WEBHOOK_URL").ok(),
        }
    }

    /// Emit one lifecycle event with the meeting snapshot
    pub async fn emit(&self, event: LifecycleEvent, meeting: &Meeting) {
        let Some(url) = &self.webhook_url else {
            info!(event = event.as_str(), meeting_id = %meeting.id, "notification webhook not configured, event logged only");
            return;
        };

        let payload = json!({
            "event": event,
            "meeting": meeting,
        });

        let result = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .and_then(|response| response.error_for_status());

        match result {
            Ok(_) => info!(event = event.as_str(), meeting_id = %meeting.id, "lifecycle event delivered"),
            Err(e) => error!(event = event.as_str(), meeting_id = %meeting.id, "failed to deliver lifecycle event: {e}"),
        }
    }
}
