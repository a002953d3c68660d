use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::status::MatchStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Sending,
    Delivered,
    Dead,
}

impl DeliveryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Sending => "sending",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Dead => "dead",
        }
    }
}

/// Rendered content of a pipeline progress message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressMessage {
    pub match_id: String,
    pub candidate_name: String,
    pub company_name: String,
    #[serde(default)]
    pub job_title: Option<String>,
    pub status: MatchStatus,
    pub status_label: String,
    pub detail_url: String,
    #[serde(default)]
    pub event_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Outbox record for one recipient of one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationJob {
    pub id: String,
    pub recipient: String,
    pub message: ProgressMessage,
    pub status: DeliveryStatus,
    pub attempts: u32,
    pub max_attempts: u32,
    #[serde(default)]
    pub next_retry_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NotificationJob {
    /// Pending jobs are due once their backoff has elapsed. Sending jobs
    /// become due again when their delivery lease runs out, which is how a
    /// job claimed by a worker that never finished gets picked up again.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            DeliveryStatus::Pending | DeliveryStatus::Sending => {
                self.next_retry_at.map(|at| at <= now).unwrap_or(true)
            }
            DeliveryStatus::Delivered | DeliveryStatus::Dead => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn job(status: DeliveryStatus, next_retry_at: Option<DateTime<Utc>>) -> NotificationJob {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        NotificationJob {
            id: "n1".into(),
            recipient: "U1".into(),
            message: ProgressMessage {
                match_id: "m1".into(),
                candidate_name: "Yui Tanaka".into(),
                company_name: "Acme".into(),
                job_title: None,
                status: MatchStatus::Applied,
                status_label: "Applied".into(),
                detail_url: "http://localhost/progress/m1".into(),
                event_date: None,
                notes: None,
            },
            status,
            attempts: 0,
            max_attempts: 3,
            next_retry_at,
            last_error: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn leases_and_backoff_gate_due_jobs() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let later = Some(now + Duration::minutes(5));
        let earlier = Some(now - Duration::minutes(5));

        assert!(job(DeliveryStatus::Pending, None).is_due(now));
        assert!(!job(DeliveryStatus::Pending, later).is_due(now));
        assert!(job(DeliveryStatus::Sending, earlier).is_due(now));
        assert!(job(DeliveryStatus::Sending, None).is_due(now));
        assert!(!job(DeliveryStatus::Sending, later).is_due(now));
        assert!(!job(DeliveryStatus::Delivered, None).is_due(now));
        assert!(!job(DeliveryStatus::Dead, earlier).is_due(now));
    }
}
