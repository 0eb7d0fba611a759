use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::domain::{
    Applicant, ApplicantId, Application, ApplicationId, ApplicationStatus,
    ApplicationSubmitRequest, ExpirationOutOfRange, Hydrated, LicenseType, LicenseTypeId,
};
use super::identifiers::{Clock, LicenseIdGenerator, RandomLicenseIdGenerator, SystemClock};
use super::license::License;
use super::repository::{EntityStore, RepositoryError};
use crate::config::LicensingConfig;

/// The entity stores the lifecycle engine reads and writes.
#[derive(Clone)]
pub struct LicensingStores {
    pub applicants: Arc<dyn EntityStore<Applicant>>,
    pub license_types: Arc<dyn EntityStore<LicenseType>>,
    pub applications: Arc<dyn EntityStore<Application>>,
    pub licenses: Arc<dyn EntityStore<License>>,
}

impl LicensingStores {
    /// Use one backing store for every entity type.
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: EntityStore<Applicant>
            + EntityStore<LicenseType>
            + EntityStore<Application>
            + EntityStore<License>
            + 'static,
    {
        Self {
            applicants: store.clone(),
            license_types: store.clone(),
            applications: store.clone(),
            licenses: store,
        }
    }
}

/// Application lifecycle engine: submission, approval with license issuance, denial, and
/// delivery address changes, all gated on the `UnderReview` state.
pub struct ApplicationService {
    stores: LicensingStores,
    ids: Arc<dyn LicenseIdGenerator>,
    clock: Arc<dyn Clock>,
    config: LicensingConfig,
}

impl ApplicationService {
    pub fn new(stores: LicensingStores, config: LicensingConfig) -> Self {
        Self::with_collaborators(
            stores,
            Arc::new(RandomLicenseIdGenerator),
            Arc::new(SystemClock),
            config,
        )
    }

    pub fn with_collaborators(
        stores: LicensingStores,
        ids: Arc<dyn LicenseIdGenerator>,
        clock: Arc<dyn Clock>,
        config: LicensingConfig,
    ) -> Self {
        Self {
            stores,
            ids,
            clock,
            config,
        }
    }

    /// Submit a new application, returning the persisted record with its assigned id.
    pub async fn submit(
        &self,
        request: ApplicationSubmitRequest,
    ) -> Result<Application, ApplicationServiceError> {
        let delivery_address = require_text("delivery_address", &request.delivery_address)?;

        let applicant = self.resolve_applicant(request.applicant_id).await?;
        let license_type = self.resolve_license_type(request.license_type_id).await?;

        let application = Application::submitted(
            &applicant,
            &license_type,
            delivery_address,
            self.clock.today(),
        );
        let stored = self.stores.applications.add(application).await?;

        info!(
            application_id = %stored.id,
            applicant_id = %stored.applicant_id,
            license_type_id = %stored.license_type_id,
            "application submitted"
        );
        Ok(stored)
    }

    /// Approve an application under review and issue its license.
    ///
    /// The license is persisted before the application is updated. When the store reports that
    /// the update matched nothing the license is deleted again. When the update errors the
    /// application is re-read: if the approval landed anyway the license stands, otherwise it is
    /// deleted. An unreadable application leaves the license in place and logs its id.
    pub async fn approve(
        &self,
        application_id: ApplicationId,
    ) -> Result<License, ApplicationServiceError> {
        let mut application = self.fetch_under_review(application_id).await?;

        let applicant = match std::mem::take(&mut application.applicant) {
            Hydrated::Loaded(applicant) => applicant,
            Hydrated::Missing => return Err(not_found("applicant", application.applicant_id)),
            Hydrated::NotLoaded => self.resolve_applicant(application.applicant_id).await?,
        };
        let license_type = match std::mem::take(&mut application.license_type) {
            Hydrated::Loaded(license_type) => license_type,
            Hydrated::Missing => {
                return Err(not_found("license type", application.license_type_id))
            }
            Hydrated::NotLoaded => {
                self.resolve_license_type(application.license_type_id)
                    .await?
            }
        };

        let today = self.clock.today();
        let license = self.issue_license(&applicant, &license_type, today).await?;

        application.license_id = Some(license.id.clone());
        application.status = ApplicationStatus::Approved;
        application.decided_on = Some(today);

        match self.stores.applications.update(&application).await {
            Ok(true) => {}
            Ok(false) => {
                self.discard_orphan(&license, application_id).await;
                return Err(ApplicationServiceError::UpdateRejected { application_id });
            }
            Err(err) => {
                if !self.approval_landed(&license, application_id, &err).await {
                    return Err(err.into());
                }
            }
        }

        info!(
            application_id = %application_id,
            license_id = %license.id,
            expires = ?license.expiration_date,
            "application approved and license issued"
        );
        Ok(license)
    }

    /// Deny an application under review.
    pub async fn deny(&self, application_id: ApplicationId) -> Result<(), ApplicationServiceError> {
        let mut application = self.fetch_under_review(application_id).await?;

        application.status = ApplicationStatus::Denied;
        application.decided_on = Some(self.clock.today());

        if !self.stores.applications.update(&application).await? {
            warn!(application_id = %application_id, "store rejected denial update");
            return Err(ApplicationServiceError::UpdateRejected { application_id });
        }

        info!(application_id = %application_id, "application denied");
        Ok(())
    }

    /// Replace the delivery address while the application is still under review.
    pub async fn update_delivery_address(
        &self,
        application_id: ApplicationId,
        new_address: &str,
    ) -> Result<(), ApplicationServiceError> {
        let new_address = require_text("delivery_address", new_address)?;
        let mut application = self.fetch_under_review(application_id).await?;

        application.delivery_address = new_address;

        if !self.stores.applications.update(&application).await? {
            warn!(application_id = %application_id, "store rejected address update");
            return Err(ApplicationServiceError::UpdateRejected { application_id });
        }

        info!(application_id = %application_id, "delivery address updated");
        Ok(())
    }

    /// Fetch an application and its hydrated references.
    pub async fn get(
        &self,
        application_id: ApplicationId,
    ) -> Result<Application, ApplicationServiceError> {
        self.stores
            .applications
            .get_by_id(&application_id)
            .await?
            .ok_or_else(|| not_found("application", application_id))
    }

    pub async fn applications_by_applicant(
        &self,
        applicant_id: ApplicantId,
    ) -> Result<Vec<Application>, ApplicationServiceError> {
        debug!(applicant_id = %applicant_id, "filtering applications by applicant");
        self.filter_applications(|application| application.applicant_id == applicant_id)
            .await
    }

    pub async fn applications_by_license_type(
        &self,
        license_type_id: LicenseTypeId,
    ) -> Result<Vec<Application>, ApplicationServiceError> {
        debug!(license_type_id = %license_type_id, "filtering applications by license type");
        self.filter_applications(|application| application.license_type_id == license_type_id)
            .await
    }

    pub async fn applications_by_status(
        &self,
        status: ApplicationStatus,
    ) -> Result<Vec<Application>, ApplicationServiceError> {
        debug!(%status, "filtering applications by status");
        self.filter_applications(|application| application.status == status)
            .await
    }

    async fn filter_applications<F>(
        &self,
        predicate: F,
    ) -> Result<Vec<Application>, ApplicationServiceError>
    where
        F: Fn(&Application) -> bool,
    {
        let applications = self.stores.applications.get_all().await?;
        Ok(applications.into_iter().filter(|a| predicate(a)).collect())
    }

    async fn fetch_under_review(
        &self,
        application_id: ApplicationId,
    ) -> Result<Application, ApplicationServiceError> {
        let application = self.get(application_id).await?;

        if !application.is_under_review() {
            warn!(
                application_id = %application_id,
                status = %application.status,
                "transition refused for decided application"
            );
            return Err(ApplicationServiceError::InvalidState {
                application_id,
                status: application.status,
            });
        }
        Ok(application)
    }

    async fn resolve_applicant(
        &self,
        applicant_id: ApplicantId,
    ) -> Result<Applicant, ApplicationServiceError> {
        self.stores
            .applicants
            .get_by_id(&applicant_id)
            .await?
            .ok_or_else(|| not_found("applicant", applicant_id))
    }

    async fn resolve_license_type(
        &self,
        license_type_id: LicenseTypeId,
    ) -> Result<LicenseType, ApplicationServiceError> {
        self.stores
            .license_types
            .get_by_id(&license_type_id)
            .await?
            .ok_or_else(|| not_found("license type", license_type_id))
    }

    /// Persist a freshly generated license, drawing a new id on each key collision.
    async fn issue_license(
        &self,
        applicant: &Applicant,
        license_type: &LicenseType,
        today: chrono::NaiveDate,
    ) -> Result<License, ApplicationServiceError> {
        let attempts = self.config.license_id_attempts.max(1);

        for attempt in 1..=attempts {
            let license = License::issue(self.ids.generate(), applicant, license_type, today)?;
            match self.stores.licenses.add(license).await {
                Ok(stored) => return Ok(stored),
                Err(RepositoryError::Conflict) if attempt < attempts => {
                    debug!(attempt, "license id collision, drawing a new id");
                }
                Err(err) => {
                    warn!(attempt, error = %err, "license could not be persisted");
                    return Err(err.into());
                }
            }
        }

        Err(RepositoryError::Conflict.into())
    }

    /// Settles an approval whose application update errored. Returns `true` when the stored
    /// application already points at `license`.
    async fn approval_landed(
        &self,
        license: &License,
        application_id: ApplicationId,
        update_error: &RepositoryError,
    ) -> bool {
        match self.stores.applications.get_by_id(&application_id).await {
            Ok(Some(stored)) if stored.license_id.as_ref() == Some(&license.id) => {
                warn!(
                    application_id = %application_id,
                    license_id = %license.id,
                    error = %update_error,
                    "application update reported an error but was committed"
                );
                true
            }
            Ok(_) => {
                self.discard_orphan(license, application_id).await;
                false
            }
            Err(err) => {
                error!(
                    application_id = %application_id,
                    license_id = %license.id,
                    error = %err,
                    "application update outcome unknown; issued license left in place"
                );
                false
            }
        }
    }

    async fn discard_orphan(&self, license: &License, application_id: ApplicationId) {
        match self.stores.licenses.delete(&license.id).await {
            Ok(true) => warn!(
                application_id = %application_id,
                license_id = %license.id,
                "application update failed; issued license withdrawn"
            ),
            Ok(false) => error!(
                application_id = %application_id,
                license_id = %license.id,
                "application update failed and orphaned license was not found for removal"
            ),
            Err(err) => error!(
                application_id = %application_id,
                license_id = %license.id,
                error = %err,
                "application update failed and orphaned license could not be removed"
            ),
        }
    }
}

fn require_text(field: &'static str, value: &str) -> Result<String, ApplicationServiceError> {
    if value.trim().is_empty() {
        return Err(ApplicationServiceError::Validation { field });
    }
    Ok(value.to_string())
}

fn not_found(entity: &'static str, id: impl ToString) -> ApplicationServiceError {
    ApplicationServiceError::NotFound {
        entity,
        id: id.to_string(),
    }
}

/// Error raised by the lifecycle engine.
#[derive(Debug, thiserror::Error)]
pub enum ApplicationServiceError {
    #[error("{field} must not be blank")]
    Validation { field: &'static str },
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("application {application_id} is {status}; only applications under review can change")]
    InvalidState {
        application_id: ApplicationId,
        status: ApplicationStatus,
    },
    #[error("store did not update application {application_id}")]
    UpdateRejected { application_id: ApplicationId },
    #[error(transparent)]
    Expiration(#[from] ExpirationOutOfRange),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ApplicationServiceError {
    /// Infrastructure failures, as opposed to requests the engine declined.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, ApplicationServiceError::Repository(err) if err.is_unavailable())
    }
}
