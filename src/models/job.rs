use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Draft,
    Active,
    Closed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Draft => "draft",
            JobStatus::Active => "active",
            JobStatus::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub company_id: String,
    /// Legacy single-store reference, still written by older clients.
    #[serde(default)]
    pub store_id: Option<String>,
    #[serde(default)]
    pub store_ids: Vec<String>,
    pub title: String,
    #[serde(default)]
    pub job_description: Option<String>,
    #[serde(default)]
    pub employment_type: Option<String>,
    #[serde(default)]
    pub working_hours: Option<String>,
    #[serde(default)]
    pub holidays: Option<String>,
    #[serde(default)]
    pub salary_inexperienced: Option<String>,
    #[serde(default)]
    pub salary_experienced: Option<String>,
    #[serde(default)]
    pub required_skills: Option<String>,
    #[serde(default)]
    pub benefits: Option<String>,
    #[serde(default)]
    pub selection_process: Option<String>,
    #[serde(default)]
    pub recommended_points: Option<String>,
    pub status: JobStatus,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Every store the job references, legacy field first, without duplicates.
    pub fn all_store_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for id in self.store_id.iter().chain(self.store_ids.iter()) {
            if !id.is_empty() && !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_ids_merge_legacy_and_list_fields() {
        let job: Job = serde_json::from_value(serde_json::json!({
            "company_id": "c1",
            "store_id": "s1",
            "store_ids": ["s2", "s1", ""],
            "title": "Line cook",
            "status": "active"
        }))
        .unwrap();
        assert_eq!(job.all_store_ids(), vec!["s1".to_string(), "s2".to_string()]);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let result = serde_json::from_value::<Job>(serde_json::json!({
            "company_id": "c1",
            "title": "Line cook",
            "status": "archived"
        }));
        assert!(result.is_err());
    }
}
