use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::matches::{Match, NewMatch, TimelineEntry};
use crate::models::status::MatchStatus;
use crate::services::match_service::{MatchFilter, MatchStats};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateMatchPayload {
    #[validate(length(min = 1))]
    pub candidate_id: String,
    #[validate(length(min = 1))]
    pub job_id: String,
    #[validate(length(min = 1))]
    pub company_id: String,
    #[validate(range(min = 0.0, max = 100.0))]
    #[serde(default)]
    pub score: f64,
    pub initial_status: Option<MatchStatus>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

impl From<CreateMatchPayload> for NewMatch {
    fn from(p: CreateMatchPayload) -> Self {
        Self {
            candidate_id: p.candidate_id,
            job_id: p.job_id,
            company_id: p.company_id,
            score: p.score,
            initial_status: p.initial_status.unwrap_or(MatchStatus::Suggested),
            notes: p.notes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct TransitionPayload {
    pub status: MatchStatus,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    pub event_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchListQuery {
    pub candidate_id: Option<String>,
    pub job_id: Option<String>,
    pub company_id: Option<String>,
    pub status: Option<MatchStatus>,
}

impl From<MatchListQuery> for MatchFilter {
    fn from(q: MatchListQuery) -> Self {
        Self {
            candidate_id: q.candidate_id.filter(|s| !s.is_empty()),
            job_id: q.job_id.filter(|s| !s.is_empty()),
            company_id: q.company_id.filter(|s| !s.is_empty()),
            status: q.status,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TimelineEntryResponse {
    pub id: String,
    pub status: MatchStatus,
    pub status_label: String,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub created_by: String,
    pub event_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl From<TimelineEntry> for TimelineEntryResponse {
    fn from(e: TimelineEntry) -> Self {
        Self {
            id: e.id,
            status_label: e.status.label().to_string(),
            status: e.status,
            timestamp: e.timestamp,
            description: e.description,
            created_by: e.created_by,
            event_date: e.event_date,
            notes: e.notes,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MatchResponse {
    pub id: String,
    pub candidate_id: String,
    pub job_id: String,
    pub company_id: String,
    pub status: MatchStatus,
    pub status_label: String,
    pub allowed_transitions: Vec<MatchStatus>,
    pub score: f64,
    pub interview_round: u32,
    pub applied_date: Option<DateTime<Utc>>,
    pub interview_date: Option<DateTime<Utc>>,
    pub offer_date: Option<DateTime<Utc>>,
    pub accepted_date: Option<DateTime<Utc>>,
    pub rejected_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub timeline: Vec<TimelineEntryResponse>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Match> for MatchResponse {
    fn from(m: Match) -> Self {
        Self {
            status_label: m.status.round_label(m.interview_round),
            allowed_transitions: m.status.allowed_transitions().to_vec(),
            id: m.id,
            candidate_id: m.candidate_id,
            job_id: m.job_id,
            company_id: m.company_id,
            status: m.status,
            score: m.score,
            interview_round: m.interview_round,
            applied_date: m.applied_date,
            interview_date: m.interview_date,
            offer_date: m.offer_date,
            accepted_date: m.accepted_date,
            rejected_date: m.rejected_date,
            notes: m.notes,
            timeline: m.timeline.into_iter().map(TimelineEntryResponse::from).collect(),
            created_by: m.created_by,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransitionResponse {
    #[serde(rename = "match")]
    pub match_: MatchResponse,
    pub entry: TimelineEntryResponse,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MatchListResponse {
    pub items: Vec<MatchResponse>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MatchStatsResponse {
    pub total: u64,
    pub by_status: BTreeMap<String, u64>,
    pub average_score: f64,
}

impl From<MatchStats> for MatchStatsResponse {
    fn from(s: MatchStats) -> Self {
        Self {
            total: s.total,
            by_status: s.by_status,
            average_score: s.average_score,
        }
    }
}

/// One row of the pipeline dictionary.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PipelineStatusResponse {
    pub value: MatchStatus,
    pub label: String,
    pub emoji: String,
    pub terminal: bool,
    pub notifiable: bool,
    pub requires_event_date: bool,
    pub allowed_transitions: Vec<MatchStatus>,
}

impl From<MatchStatus> for PipelineStatusResponse {
    fn from(s: MatchStatus) -> Self {
        Self {
            value: s,
            label: s.label().to_string(),
            emoji: s.emoji().to_string(),
            terminal: s.is_terminal(),
            notifiable: s.is_notifiable(),
            requires_event_date: s.requires_event_date(),
            allowed_transitions: s.allowed_transitions().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_payload_validates_ids_and_score() {
        let payload: CreateMatchPayload = serde_json::from_value(serde_json::json!({
            "candidate_id": "",
            "job_id": "j1",
            "company_id": "c1",
            "score": 120.0
        }))
        .unwrap();
        let errors = payload.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("candidate_id"));
        assert!(fields.contains_key("score"));
    }

    #[test]
    fn initial_status_defaults_to_suggested() {
        let payload: CreateMatchPayload = serde_json::from_value(serde_json::json!({
            "candidate_id": "c",
            "job_id": "j",
            "company_id": "co"
        }))
        .unwrap();
        assert!(payload.validate().is_ok());
        assert_eq!(NewMatch::from(payload).initial_status, MatchStatus::Suggested);
    }
}
