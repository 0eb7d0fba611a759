//! License application lifecycle: submission, approval with license issuance, denial, delivery
//! address changes, expiry notifications, and read-only reporting.
//!
//! The engine talks to persistence only through [`EntityStore`]; [`InMemoryLicensingStore`] is
//! the bundled implementation used by the CLI and the tests.

pub mod domain;
pub mod fixture;
pub mod identifiers;
pub mod license;
pub mod memory;
pub mod notifier;
pub mod report;
pub mod repository;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Applicant, ApplicantId, Application, ApplicationId, ApplicationStatus,
    ApplicationSubmitRequest, ExpirationOutOfRange, Fee, Hydrated, LicenseCategory,
    LicenseCategoryId, LicenseType, LicenseTypeId,
};
pub use fixture::{FixtureError, LicensingFixture, SeedReport};
pub use identifiers::{Clock, FixedClock, LicenseIdGenerator, RandomLicenseIdGenerator, SystemClock};
pub use license::{
    DriverDetails, Height, InvalidLicenseId, License, LicenseClass, LicenseId, LicenseStatus,
    LicenseVariant, Sex, UnknownLicenseClass,
};
pub use memory::InMemoryLicensingStore;
pub use notifier::{ExpiryNotice, ExpiryObserver, LicenseExpiryNotifier, ObserverError};
pub use report::{ApplicantLicenseCount, LicensingSummary, ReportingService};
pub use repository::{Entity, EntityStore, RepositoryError};
pub use service::{ApplicationService, ApplicationServiceError, LicensingStores};
