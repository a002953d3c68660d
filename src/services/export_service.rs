use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::database::store::{collections, get_typed, query_typed, DocumentStore, Query, Stored};
use crate::dto::public_dto::{
    CompanySummary, ExportOptions, PublicJob, PublicJobCompany, PublicJobDetail, PublicJobStore,
    PublicJobsExport, PublicSalary, PublicWorkingHours, StoreSummary,
};
use crate::error::{Error, Result};
use crate::models::company::Company;
use crate::models::job::{Job, JobStatus};
use crate::models::store::{Store, StoreStatus};
use crate::utils::time::Clock;

/// Read-only projection of the active job catalogue for third parties.
#[derive(Clone)]
pub struct ExportService {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

/// Per-request lookup cache; a company or store is fetched at most once.
#[derive(Default)]
struct Lookups {
    companies: HashMap<String, Option<Company>>,
    stores: HashMap<String, Option<Store>>,
}

impl ExportService {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn export_public_jobs(&self, options: ExportOptions) -> Result<PublicJobsExport> {
        let active = query_typed::<Job>(
            self.store.as_ref(),
            collections::JOBS,
            &Query::new().eq("status", JobStatus::Active.as_str()),
        )
        .await?;

        let mut lookups = Lookups::default();
        let mut jobs = Vec::new();
        let mut company_ids: BTreeSet<String> = BTreeSet::new();
        let mut store_ids: BTreeSet<String> = BTreeSet::new();

        // Filtering happens before the limit so the feed is not starved by
        // unpublishable jobs at the front.
        for job in &active {
            if jobs.len() >= options.limit {
                break;
            }
            let Some(stores) = self.publishable_stores(&job.value, &mut lookups).await? else {
                continue;
            };
            company_ids.insert(job.value.company_id.clone());
            store_ids.extend(stores.iter().map(|(id, _)| id.clone()));
            jobs.push(self.project(job, &stores));
        }

        let companies = if options.include_companies {
            Some(self.company_summaries(&company_ids, &active, &mut lookups).await?)
        } else {
            None
        };
        let stores = if options.include_stores {
            Some(self.store_summaries(&store_ids, &active, &mut lookups).await?)
        } else {
            None
        };

        tracing::debug!(
            total = jobs.len(),
            scanned = active.len(),
            "public job export built"
        );

        Ok(PublicJobsExport {
            exported_at: self.clock.now().to_rfc3339(),
            total_count: jobs.len(),
            jobs,
            companies,
            stores,
        })
    }

    /// A single active job of a public company.
    pub async fn public_job(&self, id: &str) -> Result<PublicJobDetail> {
        let not_found = || Error::NotFound("Job not found".to_string());

        let job = get_typed::<Job>(self.store.as_ref(), collections::JOBS, id)
            .await?
            .ok_or_else(not_found)?;
        if job.value.status != JobStatus::Active {
            return Err(not_found());
        }

        let company = get_typed::<Company>(
            self.store.as_ref(),
            collections::COMPANIES,
            &job.value.company_id,
        )
        .await?;
        if !company.map(|c| c.value.is_publishable()).unwrap_or(false) {
            return Err(not_found());
        }

        let updated_at = self.updated_at(&job.value);
        Ok(PublicJobDetail {
            id: job.id,
            title: job.value.title,
            description: job.value.job_description,
            employment_type: job.value.employment_type,
            status: job.value.status.as_str().to_string(),
            updated_at,
        })
    }

    /// The job's stores if the job may be published, `None` otherwise. The
    /// company must be public and active, and every referenced store must
    /// exist and be active.
    async fn publishable_stores(
        &self,
        job: &Job,
        lookups: &mut Lookups,
    ) -> Result<Option<Vec<(String, Store)>>> {
        match self.company(&job.company_id, lookups).await? {
            Some(company) if company.is_publishable() => {}
            _ => return Ok(None),
        }

        let ids = job.all_store_ids();
        if ids.is_empty() {
            return Ok(None);
        }

        let mut stores = Vec::with_capacity(ids.len());
        for id in ids {
            match self.store_doc(&id, lookups).await? {
                Some(store) if store.status == StoreStatus::Active => stores.push((id, store)),
                _ => return Ok(None),
            }
        }
        Ok(Some(stores))
    }

    fn project(&self, job: &Stored<Job>, stores: &[(String, Store)]) -> PublicJob {
        let j = &job.value;
        let salary_note = j
            .salary_inexperienced
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| j.salary_experienced.clone().filter(|s| !s.is_empty()));

        PublicJob {
            id: job.id.clone(),
            title: j.title.clone(),
            description: j.job_description.clone().unwrap_or_default(),
            employment_type: j.employment_type.clone().unwrap_or_default(),
            salary: PublicSalary {
                kind: if salary_note.is_some() { "monthly" } else { "" }.to_string(),
                note: salary_note.unwrap_or_default(),
            },
            working_hours: j
                .working_hours
                .clone()
                .filter(|w| !w.is_empty())
                .map(|note| PublicWorkingHours { note }),
            holidays: j.holidays.clone(),
            welfare: j.benefits.clone(),
            selection_process: j.selection_process.clone(),
            company: PublicJobCompany {
                id: j.company_id.clone(),
            },
            stores: stores
                .iter()
                .map(|(id, s)| PublicJobStore {
                    id: id.clone(),
                    name: s.name.clone(),
                    address: s.address.clone(),
                    latitude: s.latitude,
                    longitude: s.longitude,
                })
                .collect(),
            qualifications: j
                .required_skills
                .clone()
                .filter(|s| !s.is_empty())
                .map(|s| vec![s]),
            benefits: j.benefits.clone().filter(|s| !s.is_empty()).map(|s| vec![s]),
            recommended_points: j.recommended_points.clone(),
            status: j.status.as_str().to_string(),
            updated_at: self.updated_at(j),
        }
    }

    async fn company_summaries(
        &self,
        ids: &BTreeSet<String>,
        active: &[Stored<Job>],
        lookups: &mut Lookups,
    ) -> Result<Vec<CompanySummary>> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(company) = self.company(id, lookups).await? else {
                continue;
            };
            let job_count = active.iter().filter(|j| &j.value.company_id == id).count();
            out.push(CompanySummary {
                id: id.clone(),
                name: company.name,
                website: company.website,
                job_count,
            });
        }
        Ok(out)
    }

    async fn store_summaries(
        &self,
        ids: &BTreeSet<String>,
        active: &[Stored<Job>],
        lookups: &mut Lookups,
    ) -> Result<Vec<StoreSummary>> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(store) = self.store_doc(id, lookups).await? else {
                continue;
            };
            let company_name = self
                .company(&store.company_id, lookups)
                .await?
                .map(|c| c.name)
                .unwrap_or_default();
            let job_count = active
                .iter()
                .filter(|j| j.value.all_store_ids().contains(id))
                .count();
            out.push(StoreSummary {
                id: id.clone(),
                name: store.name,
                company_id: store.company_id,
                company_name,
                address: store.address,
                latitude: store.latitude,
                longitude: store.longitude,
                job_count,
            });
        }
        Ok(out)
    }

    async fn company(&self, id: &str, lookups: &mut Lookups) -> Result<Option<Company>> {
        if let Some(cached) = lookups.companies.get(id) {
            return Ok(cached.clone());
        }
        let company = if id.is_empty() {
            None
        } else {
            get_typed::<Company>(self.store.as_ref(), collections::COMPANIES, id)
                .await?
                .map(|s| s.value)
        };
        lookups.companies.insert(id.to_string(), company.clone());
        Ok(company)
    }

    async fn store_doc(&self, id: &str, lookups: &mut Lookups) -> Result<Option<Store>> {
        if let Some(cached) = lookups.stores.get(id) {
            return Ok(cached.clone());
        }
        let store = get_typed::<Store>(self.store.as_ref(), collections::STORES, id)
            .await?
            .map(|s| s.value);
        lookups.stores.insert(id.to_string(), store.clone());
        Ok(store)
    }

    fn updated_at(&self, job: &Job) -> String {
        job.updated_at.unwrap_or_else(|| self.clock.now()).to_rfc3339()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryDocumentStore;
    use crate::utils::time::ManualClock;
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value as JsonValue};

    async fn put(store: &MemoryDocumentStore, collection: &str, id: &str, data: JsonValue) {
        store.create(collection, id, &data).await.unwrap();
    }

    async fn seeded() -> ExportService {
        let store = Arc::new(MemoryDocumentStore::new());
        put(&store, collections::COMPANIES, "c-pub", json!({"name": "Open Co", "website": "https://open.example", "status": "active", "is_public": true})).await;
        put(&store, collections::COMPANIES, "c-priv", json!({"name": "Hidden Co", "status": "active", "is_public": false})).await;
        put(&store, collections::COMPANIES, "c-off", json!({"name": "Closed Co", "status": "inactive", "is_public": true})).await;
        put(&store, collections::STORES, "s1", json!({"company_id": "c-pub", "name": "Shibuya", "address": "1-1", "latitude": 35.6, "longitude": 139.7, "status": "active"})).await;
        put(&store, collections::STORES, "s2", json!({"company_id": "c-pub", "name": "Ueno", "status": "inactive"})).await;

        put(&store, collections::JOBS, "j1", json!({"company_id": "c-pub", "store_id": "s1", "title": "Cook", "salary_experienced": "300k", "working_hours": "9-18", "required_skills": "Knife work", "status": "active", "updated_at": "2024-01-01T00:00:00Z"})).await;
        put(&store, collections::JOBS, "j2", json!({"company_id": "c-priv", "store_ids": ["s1"], "title": "Hidden", "status": "active"})).await;
        put(&store, collections::JOBS, "j3", json!({"company_id": "c-pub", "store_ids": ["s1", "s2"], "title": "Mixed stores", "status": "active"})).await;
        put(&store, collections::JOBS, "j4", json!({"company_id": "c-pub", "store_ids": ["s1"], "title": "Draft", "status": "draft"})).await;
        put(&store, collections::JOBS, "j5", json!({"company_id": "c-off", "store_ids": ["s1"], "title": "Inactive co", "status": "active"})).await;
        put(&store, collections::JOBS, "j6", json!({"company_id": "c-pub", "title": "No stores", "status": "active"})).await;
        put(&store, collections::JOBS, "j7", json!({"company_id": "c-pub", "store_ids": ["s1"], "title": "Server", "status": "active"})).await;

        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
        ));
        ExportService::new(store, clock)
    }

    #[tokio::test]
    async fn export_only_contains_publishable_jobs() {
        let svc = seeded().await;
        let export = svc.export_public_jobs(ExportOptions::default()).await.unwrap();
        let ids: Vec<_> = export.jobs.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["j1", "j7"]);
        assert_eq!(export.total_count, 2);

        let j1 = &export.jobs[0];
        assert_eq!(j1.salary.kind, "monthly");
        assert_eq!(j1.salary.note, "300k");
        assert_eq!(j1.qualifications.as_deref(), Some(&["Knife work".to_string()][..]));
        assert_eq!(j1.stores[0].name, "Shibuya");

        let companies = export.companies.unwrap();
        assert_eq!(companies.len(), 1);
        assert_eq!(companies[0].id, "c-pub");
        // counts every active job of the company, published or not
        assert_eq!(companies[0].job_count, 4);

        let stores = export.stores.unwrap();
        assert_eq!(stores.len(), 1);
        assert_eq!(stores[0].company_name, "Open Co");
    }

    #[tokio::test]
    async fn limit_applies_after_filtering_and_sections_can_be_skipped() {
        let svc = seeded().await;
        let export = svc
            .export_public_jobs(ExportOptions {
                include_companies: false,
                include_stores: false,
                limit: 1,
            })
            .await
            .unwrap();
        assert_eq!(export.jobs.len(), 1);
        assert_eq!(export.jobs[0].id, "j1");
        assert!(export.companies.is_none());
        assert!(export.stores.is_none());
    }

    #[tokio::test]
    async fn single_job_hides_private_and_inactive_jobs() {
        let svc = seeded().await;
        let job = svc.public_job("j1").await.unwrap();
        assert_eq!(job.title, "Cook");
        assert_eq!(job.updated_at, "2024-01-01T00:00:00+00:00");

        let undated = svc.public_job("j7").await.unwrap();
        assert_eq!(undated.title, "Server");
        assert_eq!(undated.updated_at, "2024-02-01T00:00:00+00:00");

        for id in ["j2", "j4", "missing"] {
            assert!(matches!(svc.public_job(id).await, Err(Error::NotFound(_))), "{}", id);
        }
    }
}
