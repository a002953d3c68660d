use std::collections::BTreeMap;
use std::sync::Arc;

use crate::database::store::{
    collections, decode, encode, query_typed, DocumentStore, Query, Stored, MAX_WRITE_ATTEMPTS,
};
use crate::error::{Error, Result};
use crate::models::matches::{Match, NewMatch, TimelineEntry, Transition};
use crate::models::status::MatchStatus;
use crate::services::notification_service::NotificationService;
use crate::utils::time::Clock;

#[derive(Debug, Clone, Default)]
pub struct MatchFilter {
    pub candidate_id: Option<String>,
    pub job_id: Option<String>,
    pub company_id: Option<String>,
    pub status: Option<MatchStatus>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchStats {
    pub total: u64,
    pub by_status: BTreeMap<String, u64>,
    pub average_score: f64,
}

#[derive(Clone)]
pub struct MatchService {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    notifications: NotificationService,
}

impl MatchService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
        notifications: NotificationService,
    ) -> Self {
        Self {
            store,
            clock,
            notifications,
        }
    }

    pub async fn create(&self, new: NewMatch, actor: &str) -> Result<Match> {
        for (field, value) in [
            ("candidate_id", &new.candidate_id),
            ("job_id", &new.job_id),
            ("company_id", &new.company_id),
        ] {
            if value.trim().is_empty() {
                return Err(Error::BadRequest(format!("{} must not be empty", field)));
            }
        }

        let m = Match::create(new, actor, self.clock.now())?;
        self.store
            .create(collections::MATCHES, &m.id, &encode(&m)?)
            .await?;
        tracing::info!(match_id = %m.id, status = %m.status, actor, "match created");
        Ok(m)
    }

    pub async fn get(&self, id: &str) -> Result<Match> {
        Ok(self.load(id).await?.value)
    }

    /// Matches for the filter, most recently updated first.
    pub async fn list(&self, filter: &MatchFilter) -> Result<Vec<Match>> {
        let mut query = Query::new();
        if let Some(id) = &filter.candidate_id {
            query = query.eq("candidate_id", id.as_str());
        }
        if let Some(id) = &filter.job_id {
            query = query.eq("job_id", id.as_str());
        }
        if let Some(id) = &filter.company_id {
            query = query.eq("company_id", id.as_str());
        }
        if let Some(status) = filter.status {
            query = query.eq("status", status.as_str());
        }

        let mut matches: Vec<Match> =
            query_typed::<Match>(self.store.as_ref(), collections::MATCHES, &query)
                .await?
                .into_iter()
                .map(|s| s.value)
                .collect();
        matches.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        Ok(matches)
    }

    pub async fn stats(&self) -> Result<MatchStats> {
        let all = self.list(&MatchFilter::default()).await?;

        let mut by_status: BTreeMap<String, u64> = MatchStatus::ALL
            .iter()
            .map(|s| (s.as_str().to_string(), 0))
            .collect();
        for m in &all {
            *by_status.entry(m.status.as_str().to_string()).or_default() += 1;
        }

        let average_score = if all.is_empty() {
            0.0
        } else {
            all.iter().map(|m| m.score).sum::<f64>() / all.len() as f64
        };

        Ok(MatchStats {
            total: all.len() as u64,
            by_status,
            average_score,
        })
    }

    /// Moves the match to `transition.target`, retrying against the fresh
    /// document when another writer got in between. Owners are notified
    /// after the write; notification failures are only logged.
    pub async fn apply_transition(
        &self,
        id: &str,
        transition: Transition,
    ) -> Result<(Match, TimelineEntry)> {
        if transition.target.requires_event_date() && transition.event_date.is_none() {
            return Err(Error::BadRequest(format!(
                "event_date is required when moving a match to `{}`",
                transition.target
            )));
        }

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let stored = self.load(id).await?;
            let from = stored.value.status;
            let mut m = stored.value;
            let entry = m.apply_transition(&transition, self.clock.now())?;

            let written = self
                .store
                .replace(collections::MATCHES, id, &encode(&m)?, stored.version)
                .await?;
            if written.is_none() {
                tracing::debug!(match_id = id, attempt, "match changed concurrently, retrying");
                continue;
            }

            tracing::info!(
                match_id = id,
                from = %from,
                to = %entry.status,
                actor = %transition.actor,
                "match status changed"
            );

            let queued = self.notifications.notify_progress(&m, &entry).await;
            tracing::debug!(match_id = id, queued, "progress notifications queued");
            return Ok((m, entry));
        }

        Err(Error::Conflict(format!(
            "match {} is being modified concurrently, try again",
            id
        )))
    }

    /// Hard delete, allowed only while the match is still a bare suggestion.
    pub async fn delete(&self, id: &str) -> Result<()> {
        for _ in 0..MAX_WRITE_ATTEMPTS {
            let stored = self.load(id).await?;
            if !stored.value.status.is_deletable() {
                return Err(Error::PreconditionFailed(format!(
                    "match in status `{}` cannot be deleted",
                    stored.value.status
                )));
            }
            if self
                .store
                .delete(collections::MATCHES, id, stored.version)
                .await?
            {
                tracing::info!(match_id = id, "match deleted");
                return Ok(());
            }
        }
        Err(Error::Conflict(format!(
            "match {} is being modified concurrently, try again",
            id
        )))
    }

    async fn load(&self, id: &str) -> Result<Stored<Match>> {
        let doc = self
            .store
            .get(collections::MATCHES, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Match {} not found", id)))?;
        let stored: Stored<Match> = decode(collections::MATCHES, doc)?;
        stored
            .value
            .check_invariants()
            .map_err(|reason| Error::MalformedDocument {
                collection: collections::MATCHES.to_string(),
                id: id.to_string(),
                reason,
            })?;
        Ok(stored)
    }
}
