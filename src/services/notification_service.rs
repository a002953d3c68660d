use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::database::store::{
    collections, encode, get_typed, query_typed, DocumentStore, Query, Stored,
};
use crate::error::Result;
use crate::models::candidate::Candidate;
use crate::models::company::Company;
use crate::models::job::Job;
use crate::models::matches::{Match, TimelineEntry};
use crate::models::notification::{DeliveryStatus, NotificationJob, ProgressMessage};
use crate::models::user::User;
use crate::services::slack_service::Notifier;
use crate::utils::time::Clock;

const MAX_BACKOFF_SECS: i64 = 3600;
const BASE_BACKOFF_SECS: i64 = 30;
/// How long a claimed job stays `sending` before another worker may take it.
pub const LEASE_SECS: i64 = 300;

/// Progress notifications go through an outbox in the `notifications`
/// collection and are delivered by [`NotificationService::run_once`].
#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn DocumentStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    app_base_url: String,
    max_attempts: u32,
}

impl NotificationService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        app_base_url: &str,
        max_attempts: u32,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
            app_base_url: app_base_url.trim_end_matches('/').to_string(),
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn detail_url(&self, match_id: &str) -> String {
        format!("{}/progress/{}", self.app_base_url, match_id)
    }

    /// Queues one message per distinct owner of the match's candidate and
    /// company. Owners without a Slack id are skipped. Lookup and enqueue
    /// failures are logged and only affect the owner they concern. Returns
    /// the number of queued messages.
    pub async fn notify_progress(&self, m: &Match, entry: &TimelineEntry) -> usize {
        if !entry.status.is_notifiable() {
            return 0;
        }

        let candidate: Option<Candidate> = self.lookup(collections::CANDIDATES, &m.candidate_id).await;
        let company: Option<Company> = self.lookup(collections::COMPANIES, &m.company_id).await;
        let job: Option<Job> = self.lookup(collections::JOBS, &m.job_id).await;

        let mut owners: Vec<String> = Vec::new();
        let candidate_owner = candidate.as_ref().and_then(|c| c.assigned_user_id.clone());
        let company_owner = company.as_ref().and_then(|c| c.assigned_user_id.clone());
        for owner in [candidate_owner, company_owner].into_iter().flatten() {
            if !owner.is_empty() && !owners.contains(&owner) {
                owners.push(owner);
            }
        }

        if owners.is_empty() {
            tracing::debug!(match_id = %m.id, "no assigned owners to notify");
            return 0;
        }

        let message = ProgressMessage {
            match_id: m.id.clone(),
            candidate_name: candidate
                .as_ref()
                .map(Candidate::display_name)
                .unwrap_or_else(|| "Unknown candidate".to_string()),
            company_name: company
                .as_ref()
                .map(|c| c.name.clone())
                .unwrap_or_else(|| "Unknown company".to_string()),
            job_title: job.map(|j| j.title),
            status: entry.status,
            status_label: entry.status.round_label(m.interview_round),
            detail_url: self.detail_url(&m.id),
            event_date: entry.event_date,
            notes: entry.notes.clone(),
        };

        let mut queued = 0;
        for owner in owners {
            let user: Option<User> = self.lookup(collections::USERS, &owner).await;
            let Some(channel) = user
                .as_ref()
                .and_then(User::notification_channel)
                .map(str::to_string)
            else {
                tracing::debug!(user_id = %owner, "user has no slack id, skipping");
                continue;
            };
            match self.enqueue(&channel, message.clone()).await {
                Ok(_) => queued += 1,
                Err(err) => {
                    tracing::warn!(user_id = %owner, match_id = %m.id, error = %err, "failed to queue notification");
                }
            }
        }
        queued
    }

    async fn lookup<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Option<T> {
        match get_typed::<T>(self.store.as_ref(), collection, id).await {
            Ok(found) => found.map(|s| s.value),
            Err(err) => {
                tracing::warn!(collection, id, error = %err, "unreadable document, ignoring");
                None
            }
        }
    }

    pub async fn enqueue(&self, recipient: &str, message: ProgressMessage) -> Result<NotificationJob> {
        let now = self.clock.now();
        let job = NotificationJob {
            id: Uuid::new_v4().to_string(),
            recipient: recipient.to_string(),
            message,
            status: DeliveryStatus::Pending,
            attempts: 0,
            max_attempts: self.max_attempts,
            next_retry_at: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        };
        self.store
            .create(collections::NOTIFICATIONS, &job.id, &encode(&job)?)
            .await?;
        tracing::debug!(job_id = %job.id, recipient, "notification queued");
        Ok(job)
    }

    /// Claims and delivers the oldest due message. A claim holds a lease of
    /// [`LEASE_SECS`]; a job still `sending` after its lease ran out counts
    /// as a failed attempt and is rescheduled or dead-lettered. Returns
    /// `false` when nothing was due.
    pub async fn run_once(&self) -> Result<bool> {
        let now = self.clock.now();
        let mut candidates = Vec::new();
        for status in [DeliveryStatus::Pending, DeliveryStatus::Sending] {
            candidates.extend(
                query_typed::<NotificationJob>(
                    self.store.as_ref(),
                    collections::NOTIFICATIONS,
                    &Query::new().eq("status", status.as_str()),
                )
                .await?,
            );
        }

        let Some(next) = candidates
            .into_iter()
            .filter(|s| s.value.is_due(now))
            .min_by_key(|s| s.value.created_at)
        else {
            return Ok(false);
        };

        if next.value.status == DeliveryStatus::Sending {
            self.reclaim(next, now).await?;
            return Ok(true);
        }

        let mut job = next.value;
        job.status = DeliveryStatus::Sending;
        job.next_retry_at = Some(now + Duration::seconds(LEASE_SECS));
        job.updated_at = now;
        let Some(claimed) = self
            .store
            .replace(collections::NOTIFICATIONS, &next.id, &encode(&job)?, next.version)
            .await?
        else {
            // Another worker got there first.
            return Ok(true);
        };

        let outcome = self.notifier.send(&job.recipient, &job.message).await;
        let finished_at = self.clock.now();
        job.attempts += 1;
        job.updated_at = finished_at;

        match outcome {
            Ok(()) => {
                job.status = DeliveryStatus::Delivered;
                job.last_error = None;
                job.next_retry_at = None;
            }
            Err(err) => self.record_failure(&mut job, err.to_string(), finished_at),
        }

        let saved = self
            .store
            .replace(collections::NOTIFICATIONS, &job.id, &encode(&job)?, claimed.version)
            .await?;
        if saved.is_none() {
            tracing::warn!(job_id = %job.id, "notification changed while sending");
        }
        Ok(true)
    }

    async fn reclaim(&self, stale: Stored<NotificationJob>, now: DateTime<Utc>) -> Result<()> {
        let mut job = stale.value;
        tracing::warn!(job_id = %job.id, attempts = job.attempts, "delivery lease expired");
        job.attempts += 1;
        job.updated_at = now;
        self.record_failure(&mut job, "delivery lease expired".to_string(), now);

        let saved = self
            .store
            .replace(collections::NOTIFICATIONS, &stale.id, &encode(&job)?, stale.version)
            .await?;
        if saved.is_none() {
            tracing::debug!(job_id = %job.id, "stale notification already reclaimed");
        }
        Ok(())
    }

    fn record_failure(&self, job: &mut NotificationJob, error: String, at: DateTime<Utc>) {
        if job.attempts >= job.max_attempts {
            job.status = DeliveryStatus::Dead;
            job.next_retry_at = None;
            tracing::error!(
                target: "dead_letter",
                job_id = %job.id,
                match_id = %job.message.match_id,
                recipient = %job.recipient,
                attempts = job.attempts,
                error = %error,
                "notification abandoned"
            );
        } else {
            job.status = DeliveryStatus::Pending;
            job.next_retry_at = Some(next_retry_at(at, job.attempts));
            tracing::warn!(
                job_id = %job.id,
                attempts = job.attempts,
                error = %error,
                "notification delivery failed, will retry"
            );
        }
        job.last_error = Some(error);
    }
}

/// `min(3600, 30 * 2^(attempts - 1))` seconds.
pub fn backoff_secs(attempts: u32) -> i64 {
    let exp = attempts.saturating_sub(1).min(16);
    (BASE_BACKOFF_SECS << exp).min(MAX_BACKOFF_SECS)
}

fn next_retry_at(now: DateTime<Utc>, attempts: u32) -> DateTime<Utc> {
    now + Duration::seconds(backoff_secs(attempts))
}
