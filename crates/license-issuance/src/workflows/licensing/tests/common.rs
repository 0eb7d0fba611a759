use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::config::LicensingConfig;
use crate::workflows::licensing::domain::{
    Applicant, ApplicantId, Application, ApplicationId, ApplicationSubmitRequest, Fee,
    LicenseCategory, LicenseCategoryId, LicenseType, LicenseTypeId,
};
use crate::workflows::licensing::identifiers::{
    FixedClock, LicenseIdGenerator, RandomLicenseIdGenerator,
};
use crate::workflows::licensing::license::{License, LicenseClass, LicenseId};
use crate::workflows::licensing::memory::InMemoryLicensingStore;
use crate::workflows::licensing::repository::{Entity, EntityStore, RepositoryError};
use crate::workflows::licensing::service::{ApplicationService, LicensingStores};

pub(super) const DRIVERS: LicenseTypeId = LicenseTypeId(2);
pub(super) const PERMIT: LicenseTypeId = LicenseTypeId(3);
pub(super) const ADA: ApplicantId = ApplicantId(1);
pub(super) const LEE: ApplicantId = ApplicantId(2);

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn issue_day() -> NaiveDate {
    date(2024, 1, 15)
}

pub(super) fn applicant(id: ApplicantId, first_name: &str, address: &str) -> Applicant {
    Applicant {
        id,
        first_name: first_name.to_string(),
        last_name: "Tester".to_string(),
        date_of_birth: date(1991, 7, 4),
        date_joined: date(2023, 3, 1),
        address: address.to_string(),
        email: format!("{}@example.com", first_name.to_ascii_lowercase()),
        phone_number: None,
        application_ids: Vec::new(),
        license_ids: Vec::new(),
    }
}

pub(super) fn license_type(
    id: LicenseTypeId,
    name: &str,
    class: LicenseClass,
    expiration_months: Option<u32>,
    fee: Option<Fee>,
) -> LicenseType {
    LicenseType {
        id,
        name: name.to_string(),
        category_id: LicenseCategoryId(1),
        license_class: class,
        expiration_months,
        fee,
        description: None,
    }
}

pub(super) fn submit_request(
    applicant_id: ApplicantId,
    license_type_id: LicenseTypeId,
) -> ApplicationSubmitRequest {
    ApplicationSubmitRequest::new(applicant_id, license_type_id, "123 Main St")
}

/// Store seeded with two applicants, one category, a 12 month driver's license type (2), and a
/// non-expiring permit type (3) without a fee.
pub(super) async fn seeded_store() -> Arc<InMemoryLicensingStore> {
    let store = Arc::new(InMemoryLicensingStore::new());

    EntityStore::<LicenseCategory>::add(
        store.as_ref(),
        LicenseCategory {
            id: LicenseCategoryId(1),
            name: "Personal".to_string(),
            description: None,
            license_type_ids: Vec::new(),
        },
    )
    .await
    .expect("category seeded");

    for license_type in [
        license_type(
            DRIVERS,
            "Driver's License",
            LicenseClass::DriversLicense,
            Some(12),
            Some(Fee(4_000)),
        ),
        license_type(PERMIT, "Hunting Permit", LicenseClass::License, None, None),
    ] {
        EntityStore::<LicenseType>::add(store.as_ref(), license_type)
            .await
            .expect("license type seeded");
    }

    for applicant in [
        applicant(ADA, "Ada", "123 Main St"),
        applicant(LEE, "Lee", "9 Harbor Rd"),
    ] {
        EntityStore::<Applicant>::add(store.as_ref(), applicant)
            .await
            .expect("applicant seeded");
    }

    store
}

pub(super) fn service_for(stores: LicensingStores, today: NaiveDate) -> ApplicationService {
    ApplicationService::with_collaborators(
        stores,
        Arc::new(RandomLicenseIdGenerator),
        Arc::new(FixedClock(today)),
        LicensingConfig::default(),
    )
}

/// Service drawing license ids from `ids`, giving up after `attempts` collisions.
pub(super) fn service_with_ids(
    stores: LicensingStores,
    ids: Arc<dyn LicenseIdGenerator>,
    attempts: u32,
) -> ApplicationService {
    ApplicationService::with_collaborators(
        stores,
        ids,
        Arc::new(FixedClock(issue_day())),
        LicensingConfig {
            license_id_attempts: attempts,
            ..LicensingConfig::default()
        },
    )
}

pub(super) async fn build_service() -> (ApplicationService, Arc<InMemoryLicensingStore>) {
    let store = seeded_store().await;
    let service = service_for(LicensingStores::shared(store.clone()), issue_day());
    (service, store)
}

pub(super) async fn all_licenses(store: &InMemoryLicensingStore) -> Vec<License> {
    EntityStore::<License>::get_all(store)
        .await
        .expect("licenses readable")
}

pub(super) async fn stored_application(
    store: &InMemoryLicensingStore,
    id: ApplicationId,
) -> Application {
    EntityStore::<Application>::get_by_id(store, &id)
        .await
        .expect("application readable")
        .expect("application present")
}

/// Hands out a scripted list of ids, repeating the last one when exhausted.
pub(super) struct SequenceIds {
    queue: Mutex<VecDeque<LicenseId>>,
    last: LicenseId,
}

impl SequenceIds {
    pub(super) fn cycling(raw: &[&str]) -> Self {
        let ids: VecDeque<LicenseId> = raw
            .iter()
            .map(|id| LicenseId::parse(id).expect("scripted id valid"))
            .collect();
        let last = ids.back().cloned().expect("at least one scripted id");
        Self {
            queue: Mutex::new(ids),
            last,
        }
    }
}

impl LicenseIdGenerator for SequenceIds {
    fn generate(&self) -> LicenseId {
        self.queue
            .lock()
            .expect("id queue poisoned")
            .pop_front()
            .unwrap_or_else(|| self.last.clone())
    }
}

#[derive(Debug, Clone, Copy)]
pub(super) enum WriteFailure {
    Rejected,
    Unavailable,
    /// The update reaches the backing store, then the acknowledgement is lost.
    CommittedThenUnavailable,
}

/// Application store that reads through to the in-memory store but fails every update.
pub(super) struct FailingApplicationUpdates {
    pub(super) inner: Arc<InMemoryLicensingStore>,
    pub(super) failure: WriteFailure,
}

#[async_trait]
impl EntityStore<Application> for FailingApplicationUpdates {
    async fn get_by_id(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        EntityStore::<Application>::get_by_id(self.inner.as_ref(), id).await
    }

    async fn get_all(&self) -> Result<Vec<Application>, RepositoryError> {
        EntityStore::<Application>::get_all(self.inner.as_ref()).await
    }

    async fn add(&self, entity: Application) -> Result<Application, RepositoryError> {
        EntityStore::<Application>::add(self.inner.as_ref(), entity).await
    }

    async fn update(&self, entity: &Application) -> Result<bool, RepositoryError> {
        match self.failure {
            WriteFailure::Rejected => Ok(false),
            WriteFailure::Unavailable => {
                Err(RepositoryError::Unavailable("connection reset".to_string()))
            }
            WriteFailure::CommittedThenUnavailable => {
                EntityStore::<Application>::update(self.inner.as_ref(), entity).await?;
                Err(RepositoryError::Unavailable("timed out awaiting ack".to_string()))
            }
        }
    }

    async fn delete(&self, id: &ApplicationId) -> Result<bool, RepositoryError> {
        EntityStore::<Application>::delete(self.inner.as_ref(), id).await
    }
}

/// License store whose inserts always fail.
pub(super) struct RejectingLicenseAdds;

#[async_trait]
impl EntityStore<License> for RejectingLicenseAdds {
    async fn get_by_id(&self, _id: &LicenseId) -> Result<Option<License>, RepositoryError> {
        Ok(None)
    }

    async fn get_all(&self) -> Result<Vec<License>, RepositoryError> {
        Ok(Vec::new())
    }

    async fn add(&self, _entity: License) -> Result<License, RepositoryError> {
        Err(RepositoryError::Rejected("check constraint".to_string()))
    }

    async fn update(&self, _entity: &License) -> Result<bool, RepositoryError> {
        Ok(false)
    }

    async fn delete(&self, _id: &LicenseId) -> Result<bool, RepositoryError> {
        Ok(false)
    }
}

/// Store that is never reachable; used to prove an operation did not touch persistence.
pub(super) struct UnreachableStore;

macro_rules! unreachable_store {
    ($($entity:ty),+) => {
        $(
            #[async_trait]
            impl EntityStore<$entity> for UnreachableStore {
                async fn get_by_id(
                    &self,
                    _id: &<$entity as Entity>::Key,
                ) -> Result<Option<$entity>, RepositoryError> {
                    Err(RepositoryError::Unavailable("offline".to_string()))
                }

                async fn get_all(&self) -> Result<Vec<$entity>, RepositoryError> {
                    Err(RepositoryError::Unavailable("offline".to_string()))
                }

                async fn add(&self, _entity: $entity) -> Result<$entity, RepositoryError> {
                    Err(RepositoryError::Unavailable("offline".to_string()))
                }

                async fn update(&self, _entity: &$entity) -> Result<bool, RepositoryError> {
                    Err(RepositoryError::Unavailable("offline".to_string()))
                }

                async fn delete(
                    &self,
                    _id: &<$entity as Entity>::Key,
                ) -> Result<bool, RepositoryError> {
                    Err(RepositoryError::Unavailable("offline".to_string()))
                }
            }
        )+
    };
}

unreachable_store!(Applicant, LicenseType, Application, License);
