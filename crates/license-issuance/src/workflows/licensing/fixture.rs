use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{
    Applicant, ApplicantId, Application, Fee, LicenseCategory, LicenseCategoryId, LicenseType,
    LicenseTypeId,
};
use super::license::{License, LicenseClass};
use super::memory::InMemoryLicensingStore;
use super::repository::{Entity, EntityStore, RepositoryError};

/// Seed data for a store, as read from a JSON document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LicensingFixture {
    #[serde(default)]
    pub categories: Vec<LicenseCategory>,
    #[serde(default)]
    pub license_types: Vec<LicenseType>,
    #[serde(default)]
    pub applicants: Vec<Applicant>,
    #[serde(default)]
    pub applications: Vec<Application>,
    #[serde(default)]
    pub licenses: Vec<License>,
}

/// Counts of rows written by [`LicensingFixture::seed`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub categories: usize,
    pub license_types: usize,
    pub applicants: usize,
    pub applications: usize,
    pub licenses: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("failed to read fixture: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse fixture JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to seed {entity}: {source}")]
    Seed {
        entity: &'static str,
        source: RepositoryError,
    },
}

impl LicensingFixture {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, FixtureError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Insert every row into `store`, parents before children.
    ///
    /// Applications whose status and license link disagree are refused before anything is
    /// written.
    pub async fn seed(self, store: &InMemoryLicensingStore) -> Result<SeedReport, FixtureError> {
        if let Some(broken) = self
            .applications
            .iter()
            .find(|application| !application.license_link_consistent())
        {
            return Err(FixtureError::Seed {
                entity: Application::KIND,
                source: RepositoryError::Rejected(format!(
                    "application {} is {} but {} a license",
                    broken.id,
                    broken.status,
                    if broken.license_id.is_some() { "links" } else { "lacks" }
                )),
            });
        }

        let report = SeedReport {
            categories: self.categories.len(),
            license_types: self.license_types.len(),
            applicants: self.applicants.len(),
            applications: self.applications.len(),
            licenses: self.licenses.len(),
        };

        insert_all(store, self.categories).await?;
        insert_all(store, self.license_types).await?;
        insert_all(store, self.applicants).await?;
        insert_all(store, self.licenses).await?;
        insert_all(store, self.applications).await?;

        Ok(report)
    }

    /// Small built-in catalogue used by the CLI demo: two categories, three types, two people.
    pub fn demo() -> Self {
        let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN);

        Self {
            categories: vec![
                LicenseCategory {
                    id: LicenseCategoryId(1),
                    name: "Personal".to_string(),
                    description: Some("Licenses held by individuals".to_string()),
                    license_type_ids: Vec::new(),
                },
                LicenseCategory {
                    id: LicenseCategoryId(2),
                    name: "Commercial".to_string(),
                    description: None,
                    license_type_ids: Vec::new(),
                },
            ],
            license_types: vec![
                LicenseType {
                    id: LicenseTypeId(1),
                    name: "Fishing Permit".to_string(),
                    category_id: LicenseCategoryId(1),
                    license_class: LicenseClass::License,
                    expiration_months: None,
                    fee: Some(Fee(2_500)),
                    description: None,
                },
                LicenseType {
                    id: LicenseTypeId(2),
                    name: "Standard Driver's License".to_string(),
                    category_id: LicenseCategoryId(1),
                    license_class: LicenseClass::DriversLicense,
                    expiration_months: Some(12),
                    fee: Some(Fee(4_000)),
                    description: None,
                },
                LicenseType {
                    id: LicenseTypeId(3),
                    name: "Commercial Driver's License".to_string(),
                    category_id: LicenseCategoryId(2),
                    license_class: LicenseClass::CommercialDriversLicense,
                    expiration_months: Some(48),
                    fee: Some(Fee(12_000)),
                    description: None,
                },
            ],
            applicants: vec![
                Applicant {
                    id: ApplicantId(1),
                    first_name: "Ada".to_string(),
                    last_name: "Okafor".to_string(),
                    date_of_birth: date(1990, 4, 12),
                    date_joined: date(2023, 2, 1),
                    address: "123 Main St".to_string(),
                    email: "ada.okafor@example.com".to_string(),
                    phone_number: None,
                    application_ids: Vec::new(),
                    license_ids: Vec::new(),
                },
                Applicant {
                    id: ApplicantId(2),
                    first_name: "Lee".to_string(),
                    last_name: "Marsh".to_string(),
                    date_of_birth: date(1984, 11, 3),
                    date_joined: date(2024, 6, 18),
                    address: "9 Harbor Rd".to_string(),
                    email: "lee.marsh@example.com".to_string(),
                    phone_number: Some("555-0134".to_string()),
                    application_ids: Vec::new(),
                    license_ids: Vec::new(),
                },
            ],
            applications: Vec::new(),
            licenses: Vec::new(),
        }
    }
}

async fn insert_all<T>(
    store: &InMemoryLicensingStore,
    rows: Vec<T>,
) -> Result<(), FixtureError>
where
    T: Entity,
    InMemoryLicensingStore: EntityStore<T>,
{
    for row in rows {
        EntityStore::<T>::add(store, row)
            .await
            .map_err(|source| FixtureError::Seed {
                entity: T::KIND,
                source,
            })?;
    }
    Ok(())
}
