use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::status::MatchStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub id: String,
    pub status: MatchStatus,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub created_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: String,
    pub candidate_id: String,
    pub job_id: String,
    pub company_id: String,
    pub status: MatchStatus,
    pub timeline: Vec<TimelineEntry>,
    pub score: f64,
    #[serde(default)]
    pub interview_round: u32,
    #[serde(default)]
    pub applied_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub interview_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub offer_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub accepted_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rejected_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMatch {
    pub candidate_id: String,
    pub job_id: String,
    pub company_id: String,
    pub score: f64,
    pub initial_status: MatchStatus,
    pub notes: Option<String>,
}

/// A requested move of a match to a new status.
#[derive(Debug, Clone)]
pub struct Transition {
    pub target: MatchStatus,
    pub actor: String,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub event_date: Option<DateTime<Utc>>,
}

impl Match {
    pub fn create(new: NewMatch, actor: &str, now: DateTime<Utc>) -> Result<Self> {
        if !new.initial_status.is_initial() {
            return Err(Error::BadRequest(format!(
                "a match cannot start in status `{}`",
                new.initial_status
            )));
        }

        let entry = TimelineEntry {
            id: new_entry_id(),
            status: new.initial_status,
            timestamp: now,
            description: format!("Match created ({})", new.initial_status.label()),
            created_by: actor.to_string(),
            event_date: None,
            notes: new.notes.clone(),
        };

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            candidate_id: new.candidate_id,
            job_id: new.job_id,
            company_id: new.company_id,
            status: new.initial_status,
            timeline: vec![entry],
            score: new.score,
            interview_round: 0,
            applied_date: None,
            interview_date: None,
            offer_date: None,
            accepted_date: None,
            rejected_date: None,
            notes: new.notes,
            created_by: actor.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Validates `transition` against the pipeline table and applies it in
    /// place, returning the appended timeline entry. On error `self` is left
    /// untouched.
    pub fn apply_transition(
        &mut self,
        transition: &Transition,
        now: DateTime<Utc>,
    ) -> Result<TimelineEntry> {
        let target = transition.target;
        if !self.status.can_transition_to(target) {
            return Err(Error::InvalidTransition {
                from: self.status,
                to: target,
            });
        }
        if target.requires_event_date() && transition.event_date.is_none() {
            return Err(Error::BadRequest(format!(
                "event_date is required when moving a match to `{}`",
                target
            )));
        }

        let timestamp = self.next_timestamp(now);
        if target == MatchStatus::Interview {
            self.interview_round += 1;
        }

        let description = transition
            .description
            .clone()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| {
                format!("Status changed to {}", target.round_label(self.interview_round))
            });

        let entry = TimelineEntry {
            id: new_entry_id(),
            status: target,
            timestamp,
            description,
            created_by: transition.actor.clone(),
            event_date: transition.event_date,
            notes: transition.notes.clone(),
        };

        if let Some(date) = transition.event_date {
            match target {
                MatchStatus::Applied => self.applied_date = Some(date),
                MatchStatus::Interview => self.interview_date = Some(date),
                MatchStatus::Offer => self.offer_date = Some(date),
                MatchStatus::OfferAccepted => self.accepted_date = Some(date),
                MatchStatus::Rejected => self.rejected_date = Some(date),
                _ => {}
            }
        }

        self.timeline.push(entry.clone());
        self.status = target;
        self.updated_at = timestamp;
        Ok(entry)
    }

    /// A timestamp strictly after the last timeline entry, even when the
    /// clock ties or runs backwards.
    fn next_timestamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.timeline.last() {
            Some(last) if now <= last.timestamp => last.timestamp + Duration::milliseconds(1),
            _ => now,
        }
    }

    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        let Some(last) = self.timeline.last() else {
            return Err("timeline is empty".to_string());
        };
        if last.status != self.status {
            return Err(format!(
                "status `{}` does not match last timeline entry `{}`",
                self.status, last.status
            ));
        }
        if self
            .timeline
            .windows(2)
            .any(|pair| pair[1].timestamp <= pair[0].timestamp)
        {
            return Err("timeline timestamps are not strictly increasing".to_string());
        }
        Ok(())
    }
}

fn new_entry_id() -> String {
    format!("timeline_{}", Uuid::new_v4().simple())
}
