use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyPlan {
    Free,
    Standard,
    Premium,
}

impl ApiKeyPlan {
    pub fn daily_quota(self) -> u32 {
        match self {
            ApiKeyPlan::Free => 10,
            ApiKeyPlan::Standard => 50,
            ApiKeyPlan::Premium => 200,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "free" => Some(ApiKeyPlan::Free),
            "standard" => Some(ApiKeyPlan::Standard),
            "premium" => Some(ApiKeyPlan::Premium),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ApiKeyPlan::Free => "free",
            ApiKeyPlan::Standard => "standard",
            ApiKeyPlan::Premium => "premium",
        }
    }
}

/// A capability token for the public export API. The key string is also the
/// document id in the `apiKeys` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKey {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub client_name: String,
    pub is_active: bool,
    /// Kept as the raw stored string; unknown plans meter as `free`.
    pub plan: String,
    pub daily_limit: u32,
    pub request_count: u32,
    /// Calendar date `YYYY-MM-DD` that `request_count` belongs to.
    pub last_reset_date: String,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default)]
    pub total_requests: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ApiKey {
    pub fn effective_plan(&self) -> ApiKeyPlan {
        ApiKeyPlan::parse(&self.plan).unwrap_or(ApiKeyPlan::Free)
    }

    pub fn quota(&self) -> u32 {
        self.effective_plan().daily_quota()
    }

    /// Records one successful lookup. Independent of the daily quota.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.total_requests = self.total_requests.saturating_add(1);
        self.last_used_at = Some(now);
    }

    /// Consumes one request from today's quota. Returns `false` and leaves
    /// the record untouched when the quota is exhausted.
    pub fn consume_quota(&mut self, today: &str, now: DateTime<Utc>) -> bool {
        if self.last_reset_date != today {
            self.request_count = 1;
            self.last_reset_date = today.to_string();
            self.last_used_at = Some(now);
            return true;
        }

        if self.request_count >= self.quota() {
            return false;
        }

        self.request_count += 1;
        self.last_used_at = Some(now);
        true
    }
}

/// What a verified caller looks like to the rest of the request.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientInfo {
    pub key: String,
    pub client_name: String,
    pub plan: ApiKeyPlan,
}

impl From<&ApiKey> for ClientInfo {
    fn from(value: &ApiKey) -> Self {
        Self {
            key: value.key.clone(),
            client_name: value.client_name.clone(),
            plan: value.effective_plan(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(plan: &str, count: u32, date: &str) -> ApiKey {
        ApiKey {
            key: "k1".into(),
            name: "test".into(),
            client_name: "Client".into(),
            is_active: true,
            plan: plan.into(),
            daily_limit: 999,
            request_count: count,
            last_reset_date: date.into(),
            allowed_origins: vec![],
            total_requests: 0,
            created_at: Utc::now(),
            last_used_at: None,
            created_by: None,
            notes: None,
        }
    }

    #[test]
    fn free_plan_allows_ten_per_day() {
        let mut k = key("free", 0, "2024-01-01");
        for _ in 0..10 {
            assert!(k.consume_quota("2024-01-01", Utc::now()));
        }
        let before = k.clone();
        assert!(!k.consume_quota("2024-01-01", Utc::now()));
        assert_eq!(k, before);
        assert_eq!(k.request_count, 10);
    }

    #[test]
    fn new_day_resets_even_a_saturated_counter() {
        let mut k = key("free", 10, "2024-01-01");
        assert!(k.consume_quota("2024-01-02", Utc::now()));
        assert_eq!(k.request_count, 1);
        assert_eq!(k.last_reset_date, "2024-01-02");
    }

    #[test]
    fn daily_limit_field_does_not_override_plan() {
        let mut k = key("free", 10, "2024-01-01");
        k.daily_limit = 500;
        assert!(!k.consume_quota("2024-01-01", Utc::now()));
    }

    #[test]
    fn unknown_plan_meters_as_free() {
        let k = key("enterprise", 0, "2024-01-01");
        assert_eq!(k.effective_plan(), ApiKeyPlan::Free);
        assert_eq!(k.quota(), 10);
        assert_eq!(key("premium", 0, "x").quota(), 200);
        assert_eq!(key("standard", 0, "x").quota(), 50);
    }

    #[test]
    fn touch_counts_lifetime_requests() {
        let mut k = key("free", 0, "2024-01-01");
        k.touch(Utc::now());
        k.touch(Utc::now());
        assert_eq!(k.total_requests, 2);
        assert!(k.last_used_at.is_some());
        assert_eq!(k.request_count, 0);
    }
}
