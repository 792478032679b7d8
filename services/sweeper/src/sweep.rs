//! The periodic sweep job

use anyhow::Result;
use serde_json::json;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::database::Database;
use crate::models::MeetingSnapshot;

/// Flips elapsed meetings to completed and emits reminders
#[derive(Clone)]
pub struct MeetingSweeper {
    database: Database,
    client: reqwest::Client,
    webhook_url: Option<String>,
    reminder_window_minutes: i32,
}

impl MeetingSweeper {
    pub fn new(
        database: Database,
        webhook_url: Option<String>,
        reminder_window_minutes: i32,
    ) -> Self {
        Self {
            database,
            client: reqwest::Client::new(),
            webhook_url,
            reminder_window_minutes,
        }
    }

    /// One sweep pass. Safe to re-run: completion only matches still-
    /// accepted elapsed meetings, and reminders are claimed exactly
    /// once per meeting.
    pub async fn run_once(&self) -> Result<()> {
        let completed = self.database.complete_elapsed().await?;
        if !completed.is_empty() {
            info!("Marked {} meetings completed", completed.len());
        }

        let due = self
            .database
            .claim_due_reminders(self.reminder_window_minutes)
            .await?;
        for meeting in &due {
            self.emit_reminder(meeting).await;
        }

        Ok(())
    }

    async fn emit_reminder(&self, meeting: &MeetingSnapshot) {
        let Some(url) = &self.webhook_url else {
            info!(meeting_id = %meeting.id, "reminder due, webhook not configured");
            return;
        };

        let payload = json!({
            "event": "meeting_reminder",
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
            Ok(_) => info!(meeting_id = %meeting.id, "meeting reminder delivered"),
            Err(e) => error!(meeting_id = %meeting.id, "failed to deliver reminder: {e}"),
        }
    }

    /// Run the sweep on a cron schedule until the process exits
    pub async fn start(&self, schedule: &str) -> Result<()> {
        let sweeper = self.clone();

        let scheduler = JobScheduler::new().await?;

        let job = Job::new_async(schedule, move |_, _| {
            let sweeper = sweeper.clone();
            Box::pin(async move {
                if let Err(e) = sweeper.run_once().await {
                    error!("Sweep pass failed: {e}");
                }
            })
        })?;

        scheduler.add(job).await?;
        scheduler.start().await?;

        info!("Started meeting sweeper with schedule: {schedule}");
        Ok(())
    }
}
