use std::sync::Arc;

use crate::database::store::{
    collections, encode, get_typed, modify_typed, DocumentStore, Stored,
};
use crate::error::{Error, Result};
use crate::models::api_key::{ApiKey, ApiKeyPlan, ClientInfo};
use crate::utils::time::{seconds_until_midnight, Clock};
use crate::utils::token::generate_api_key;

#[derive(Debug, Clone)]
pub struct NewApiKey {
    pub name: String,
    pub client_name: String,
    pub plan: ApiKeyPlan,
    pub allowed_origins: Vec<String>,
    pub notes: Option<String>,
}

#[derive(Clone)]
pub struct ApiKeyService {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl ApiKeyService {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Resolves a presented key to its client. Unknown, inactive and empty
    /// keys yield `None` without touching anything; a known active key has
    /// its usage stamp and lifetime counter updated.
    pub async fn verify(&self, key: Option<&str>) -> Result<Option<ClientInfo>> {
        let Some(key) = key.map(str::trim).filter(|k| !k.is_empty()) else {
            return Ok(None);
        };

        let now = self.clock.now();
        let outcome = modify_typed(
            self.store.as_ref(),
            collections::API_KEYS,
            key,
            |api_key: &mut ApiKey| {
                if !api_key.is_active {
                    return false;
                }
                api_key.touch(now);
                true
            },
        )
        .await?;

        match outcome {
            Some((stored, true)) => Ok(Some(ClientInfo::from(&stored.value))),
            Some((stored, false)) => {
                tracing::debug!(client = %stored.value.client_name, "inactive api key presented");
                Ok(None)
            }
            None => {
                tracing::debug!("unknown api key presented");
                Ok(None)
            }
        }
    }

    /// Consumes one request from the client's quota for the current local
    /// day. The decision and the counter update happen under the store's
    /// per-document lock, so concurrent callers cannot overshoot the quota.
    pub async fn check_rate_limit(&self, client: &ClientInfo) -> Result<bool> {
        let today = self.clock.today();
        let now = self.clock.now();
        let outcome = modify_typed(
            self.store.as_ref(),
            collections::API_KEYS,
            &client.key,
            |api_key: &mut ApiKey| api_key.consume_quota(&today, now),
        )
        .await?;

        let Some((stored, allowed)) = outcome else {
            return Ok(false);
        };
        let api_key = stored.value;
        if allowed {
            tracing::debug!(
                client = %client.client_name,
                count = api_key.request_count,
                quota = api_key.quota(),
                "request counted"
            );
        } else {
            tracing::warn!(
                client = %client.client_name,
                plan = api_key.effective_plan().as_str(),
                count = api_key.request_count,
                "daily quota exhausted"
            );
        }
        Ok(allowed)
    }

    /// Seconds until the quota resets at the next local midnight.
    pub fn retry_after_secs(&self) -> u64 {
        seconds_until_midnight(self.clock.local_now())
    }

    pub async fn provision(&self, new: NewApiKey, actor: &str) -> Result<ApiKey> {
        if new.name.trim().is_empty() {
            return Err(Error::BadRequest("name must not be empty".to_string()));
        }

        let now = self.clock.now();
        let api_key = ApiKey {
            key: generate_api_key(),
            name: new.name,
            client_name: new.client_name,
            is_active: true,
            plan: new.plan.as_str().to_string(),
            daily_limit: new.plan.daily_quota(),
            request_count: 0,
            last_reset_date: self.clock.today(),
            allowed_origins: new.allowed_origins,
            total_requests: 0,
            created_at: now,
            last_used_at: None,
            created_by: Some(actor.to_string()),
            notes: new.notes,
        };
        self.store
            .create(collections::API_KEYS, &api_key.key, &encode(&api_key)?)
            .await?;
        tracing::info!(client = %api_key.client_name, plan = %api_key.plan, actor, "api key provisioned");
        Ok(api_key)
    }

    pub async fn get(&self, key: &str) -> Result<ApiKey> {
        self.load(key)
            .await?
            .map(|s| s.value)
            .ok_or_else(|| Error::NotFound("API key not found".to_string()))
    }

    pub async fn set_active(&self, key: &str, is_active: bool) -> Result<ApiKey> {
        let (stored, _) = modify_typed(
            self.store.as_ref(),
            collections::API_KEYS,
            key,
            |api_key: &mut ApiKey| {
                api_key.is_active = is_active;
                true
            },
        )
        .await?
        .ok_or_else(|| Error::NotFound("API key not found".to_string()))?;
        tracing::info!(client = %stored.value.client_name, is_active, "api key updated");
        Ok(stored.value)
    }

    async fn load(&self, key: &str) -> Result<Option<Stored<ApiKey>>> {
        get_typed::<ApiKey>(self.store.as_ref(), collections::API_KEYS, key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryDocumentStore;
    use crate::database::store::{Document, Modified, Mutator, Query};
    use crate::utils::time::ManualClock;
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::{json, Value as JsonValue};

    async fn setup(
        active: bool,
        count: u32,
    ) -> (ApiKeyService, Arc<MemoryDocumentStore>, Arc<ManualClock>) {
        let store = Arc::new(MemoryDocumentStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        ));
        store
            .create(
                collections::API_KEYS,
                "k1",
                &json!({
                    "key": "k1",
                    "name": "Partner feed",
                    "client_name": "Partner",
                    "is_active": active,
                    "plan": "free",
                    "daily_limit": 10,
                    "request_count": count,
                    "last_reset_date": "2024-01-01",
                    "created_at": "2023-12-01T00:00:00Z"
                }),
            )
            .await
            .unwrap();
        (ApiKeyService::new(store.clone(), clock.clone()), store, clock)
    }

    #[tokio::test]
    async fn inactive_or_unknown_keys_are_rejected_without_mutation() {
        let (svc, store, _) = setup(false, 0).await;
        let before = store.get(collections::API_KEYS, "k1").await.unwrap().unwrap();
        assert!(svc.verify(Some("k1")).await.unwrap().is_none());
        assert!(svc.verify(Some("missing")).await.unwrap().is_none());
        assert!(svc.verify(Some("   ")).await.unwrap().is_none());
        assert!(svc.verify(None).await.unwrap().is_none());
        let after = store.get(collections::API_KEYS, "k1").await.unwrap().unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn verify_touches_usage() {
        let (svc, _, _) = setup(true, 0).await;
        let client = svc.verify(Some("k1")).await.unwrap().unwrap();
        assert_eq!(client.plan, ApiKeyPlan::Free);
        svc.verify(Some("k1")).await.unwrap();
        let key = svc.get("k1").await.unwrap();
        assert_eq!(key.total_requests, 2);
        assert!(key.last_used_at.is_some());
        assert_eq!(key.request_count, 0);
    }

    #[tokio::test]
    async fn quota_follows_the_calendar_day() {
        let (svc, _, clock) = setup(true, 9).await;
        let client = svc.verify(Some("k1")).await.unwrap().unwrap();

        assert!(svc.check_rate_limit(&client).await.unwrap());
        assert_eq!(svc.get("k1").await.unwrap().request_count, 10);

        let before = svc.get("k1").await.unwrap();
        assert!(!svc.check_rate_limit(&client).await.unwrap());
        assert_eq!(svc.get("k1").await.unwrap(), before);

        clock.advance(Duration::days(1));
        assert!(svc.check_rate_limit(&client).await.unwrap());
        let key = svc.get("k1").await.unwrap();
        assert_eq!(key.request_count, 1);
        assert_eq!(key.last_reset_date, "2024-01-02");
    }

    #[tokio::test]
    async fn concurrent_callers_cannot_exceed_quota() {
        let (svc, _, _) = setup(true, 0).await;
        let client = svc.verify(Some("k1")).await.unwrap().unwrap();

        let mut handles = Vec::new();
        for _ in 0..25 {
            let svc = svc.clone();
            let client = client.clone();
            handles.push(tokio::spawn(async move {
                svc.check_rate_limit(&client).await
            }));
        }

        let mut allowed = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 10);
        assert_eq!(svc.get("k1").await.unwrap().request_count, 10);
    }

    /// Delegates to the in-memory store after a short pause, so concurrent
    /// callers interleave the way they do against a real database.
    struct SlowStore {
        inner: MemoryDocumentStore,
    }

    impl SlowStore {
        async fn pause(&self) {
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
    }

    #[async_trait::async_trait]
    impl DocumentStore for SlowStore {
        async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
            self.pause().await;
            self.inner.get(collection, id).await
        }

        async fn create(&self, collection: &str, id: &str, data: &JsonValue) -> Result<Document> {
            self.pause().await;
            self.inner.create(collection, id, data).await
        }

        async fn replace(
            &self,
            collection: &str,
            id: &str,
            data: &JsonValue,
            expected_version: i64,
        ) -> Result<Option<Document>> {
            self.pause().await;
            self.inner.replace(collection, id, data, expected_version).await
        }

        async fn delete(&self, collection: &str, id: &str, expected_version: i64) -> Result<bool> {
            self.pause().await;
            self.inner.delete(collection, id, expected_version).await
        }

        async fn modify(
            &self,
            collection: &str,
            id: &str,
            mutate: Mutator<'_>,
        ) -> Result<Option<Modified>> {
            self.pause().await;
            self.inner.modify(collection, id, mutate).await
        }

        async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>> {
            self.pause().await;
            self.inner.query(collection, query).await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_within_quota_all_succeed() {
        let store = Arc::new(SlowStore {
            inner: MemoryDocumentStore::new(),
        });
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        ));
        store
            .create(
                collections::API_KEYS,
                "k-premium",
                &json!({
                    "key": "k-premium",
                    "name": "Aggregator",
                    "client_name": "Aggregator",
                    "is_active": true,
                    "plan": "premium",
                    "daily_limit": 200,
                    "request_count": 0,
                    "last_reset_date": "2024-01-01",
                    "created_at": "2023-12-01T00:00:00Z"
                }),
            )
            .await
            .unwrap();
        let svc = ApiKeyService::new(store.clone(), clock);

        let mut handles = Vec::new();
        for _ in 0..40 {
            let svc = svc.clone();
            handles.push(tokio::spawn(async move {
                let client = svc.verify(Some("k-premium")).await.unwrap().unwrap();
                svc.check_rate_limit(&client).await.unwrap()
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }

        let key = svc.get("k-premium").await.unwrap();
        assert_eq!(key.total_requests, 40);
        assert_eq!(key.request_count, 40);
    }

    #[tokio::test]
    async fn retry_after_counts_to_local_midnight() {
        let (svc, _, _) = setup(true, 0).await;
        assert_eq!(svc.retry_after_secs(), 12 * 3600);
    }

    #[tokio::test]
    async fn provisioned_keys_start_fresh_and_can_be_disabled() {
        let (svc, _, _) = setup(true, 0).await;
        let key = svc
            .provision(
                NewApiKey {
                    name: "Job board".into(),
                    client_name: "Board Inc".into(),
                    plan: ApiKeyPlan::Premium,
                    allowed_origins: vec![],
                    notes: None,
                },
                "admin-1",
            )
            .await
            .unwrap();
        assert_eq!(key.daily_limit, 200);
        assert_eq!(key.request_count, 0);
        assert_eq!(key.last_reset_date, "2024-01-01");
        assert!(svc.verify(Some(&key.key)).await.unwrap().is_some());

        svc.set_active(&key.key, false).await.unwrap();
        assert!(svc.verify(Some(&key.key)).await.unwrap().is_none());
        assert!(matches!(
            svc.set_active("missing", true).await.unwrap_err(),
            Error::NotFound(_)
        ));
    }
}
