use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;

use super::domain::{
    Applicant, ApplicantId, Application, ApplicationStatus, Fee, LicenseCategory, LicenseType,
};
use super::identifiers::{Clock, SystemClock};
use super::license::License;
use super::repository::{EntityStore, RepositoryError};

/// Read-only aggregations over the licensing tables.
pub struct ReportingService {
    applicants: Arc<dyn EntityStore<Applicant>>,
    categories: Arc<dyn EntityStore<LicenseCategory>>,
    license_types: Arc<dyn EntityStore<LicenseType>>,
    applications: Arc<dyn EntityStore<Application>>,
    licenses: Arc<dyn EntityStore<License>>,
    clock: Arc<dyn Clock>,
}

/// Applicant paired with how many licenses they hold.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicantLicenseCount {
    pub applicant_id: ApplicantId,
    pub name: String,
    pub licenses: usize,
}

/// Everything the reporting queries produce, in one serializable bundle.
#[derive(Debug, Clone, Serialize)]
pub struct LicensingSummary {
    pub applications_by_status: BTreeMap<ApplicationStatus, usize>,
    pub revenue_by_license_type: BTreeMap<String, Fee>,
    pub licenses_by_category: BTreeMap<String, usize>,
    pub top_applicants: Vec<ApplicantLicenseCount>,
    pub expiring_soon: Vec<License>,
}

impl ReportingService {
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: EntityStore<Applicant>
            + EntityStore<LicenseCategory>
            + EntityStore<LicenseType>
            + EntityStore<Application>
            + EntityStore<License>
            + 'static,
    {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock<S>(store: Arc<S>, clock: Arc<dyn Clock>) -> Self
    where
        S: EntityStore<Applicant>
            + EntityStore<LicenseCategory>
            + EntityStore<LicenseType>
            + EntityStore<Application>
            + EntityStore<License>
            + 'static,
    {
        Self {
            applicants: store.clone(),
            categories: store.clone(),
            license_types: store.clone(),
            applications: store.clone(),
            licenses: store,
            clock,
        }
    }

    /// Count of applications per status; every status appears, even at zero.
    pub async fn application_counts_by_status(
        &self,
    ) -> Result<BTreeMap<ApplicationStatus, usize>, RepositoryError> {
        let mut counts: BTreeMap<ApplicationStatus, usize> = ApplicationStatus::ALL
            .into_iter()
            .map(|status| (status, 0))
            .collect();

        for application in self.applications.get_all().await? {
            *counts.entry(application.status).or_default() += 1;
        }
        Ok(counts)
    }

    /// Sum of the fee snapshots of approved applications, keyed by license type name.
    /// Applications without a fee contribute zero.
    pub async fn revenue_by_license_type(&self) -> Result<BTreeMap<String, Fee>, RepositoryError> {
        let type_names: HashMap<_, _> = self
            .license_types
            .get_all()
            .await?
            .into_iter()
            .map(|license_type| (license_type.id, license_type.name))
            .collect();

        let mut revenue: BTreeMap<String, Fee> = BTreeMap::new();
        for application in self.applications.get_all().await? {
            if application.status != ApplicationStatus::Approved {
                continue;
            }
            let name = type_names
                .get(&application.license_type_id)
                .cloned()
                .unwrap_or_else(|| format!("license type {}", application.license_type_id));
            let total = revenue.entry(name).or_default();
            *total = total.saturating_add(application.fee.unwrap_or(Fee::ZERO));
        }
        Ok(revenue)
    }

    /// Applicants ordered by number of licenses held, most first; ties broken by id.
    pub async fn top_applicants_by_license_count(
        &self,
        count: usize,
    ) -> Result<Vec<ApplicantLicenseCount>, RepositoryError> {
        let mut held: HashMap<ApplicantId, usize> = HashMap::new();
        for license in self.licenses.get_all().await? {
            *held.entry(license.applicant_id).or_default() += 1;
        }

        let mut ranked: Vec<ApplicantLicenseCount> = self
            .applicants
            .get_all()
            .await?
            .into_iter()
            .map(|applicant| ApplicantLicenseCount {
                applicant_id: applicant.id,
                name: applicant.full_name(),
                licenses: held.get(&applicant.id).copied().unwrap_or(0),
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.licenses
                .cmp(&a.licenses)
                .then(a.applicant_id.cmp(&b.applicant_id))
        });
        ranked.truncate(count);
        Ok(ranked)
    }

    /// Valid licenses expiring between today and `days` from now, soonest first.
    pub async fn licenses_expiring_soon(&self, days: u32) -> Result<Vec<License>, RepositoryError> {
        let today = self.clock.today();
        let mut expiring: Vec<License> = self
            .licenses
            .get_all()
            .await?
            .into_iter()
            .filter(|license| license.is_expiring_soon(today, days))
            .collect();
        expiring.sort_by(|a, b| a.expiration_date.cmp(&b.expiration_date));
        Ok(expiring)
    }

    /// Issued licenses per category name. Licenses whose type or category no longer resolves
    /// are grouped under "uncategorized".
    pub async fn license_counts_by_category(
        &self,
    ) -> Result<BTreeMap<String, usize>, RepositoryError> {
        let category_names: HashMap<_, _> = self
            .categories
            .get_all()
            .await?
            .into_iter()
            .map(|category| (category.id, category.name))
            .collect();
        let type_categories: HashMap<_, _> = self
            .license_types
            .get_all()
            .await?
            .into_iter()
            .map(|license_type| (license_type.id, license_type.category_id))
            .collect();

        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for license in self.licenses.get_all().await? {
            let name = type_categories
                .get(&license.license_type_id)
                .and_then(|category_id| category_names.get(category_id))
                .cloned()
                .unwrap_or_else(|| "uncategorized".to_string());
            *counts.entry(name).or_default() += 1;
        }
        Ok(counts)
    }

    pub async fn summary(
        &self,
        expiring_within_days: u32,
        top_applicants: usize,
    ) -> Result<LicensingSummary, RepositoryError> {
        Ok(LicensingSummary {
            applications_by_status: self.application_counts_by_status().await?,
            revenue_by_license_type: self.revenue_by_license_type().await?,
            licenses_by_category: self.license_counts_by_category().await?,
            top_applicants: self.top_applicants_by_license_count(top_applicants).await?,
            expiring_soon: self.licenses_expiring_soon(expiring_within_days).await?,
        })
    }
}
