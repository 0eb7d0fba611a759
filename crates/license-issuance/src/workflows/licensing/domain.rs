use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::license::{License, LicenseClass, LicenseId};

/// Identifier wrapper for applicants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicantId(pub u32);

/// Identifier wrapper for license categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LicenseCategoryId(pub u32);

/// Identifier wrapper for license types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LicenseTypeId(pub u32);

/// Identifier wrapper for submitted applications. Zero means the store has not assigned one yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub u32);

impl ApplicationId {
    pub const UNASSIGNED: Self = Self(0);

    pub const fn is_assigned(self) -> bool {
        self.0 != 0
    }
}

macro_rules! display_numeric_id {
    ($($ty:ty),+) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )+
    };
}

display_numeric_id!(ApplicantId, LicenseCategoryId, LicenseTypeId, ApplicationId);

/// Monetary amount in minor currency units (cents).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Fee(pub u64);

impl Fee {
    pub const ZERO: Self = Self(0);

    pub fn saturating_add(self, other: Fee) -> Fee {
        Fee(self.0.saturating_add(other.0))
    }
}

impl fmt::Display for Fee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Navigation reference filled in by a store's hydration step.
///
/// `NotLoaded` means nobody looked yet; `Missing` means the store looked and the referenced
/// record does not exist. Callers must not conflate the two.
#[derive(Debug, Clone, PartialEq)]
pub enum Hydrated<T> {
    NotLoaded,
    Missing,
    Loaded(T),
}

impl<T> Default for Hydrated<T> {
    fn default() -> Self {
        Self::NotLoaded
    }
}

impl<T> Hydrated<T> {
    pub fn from_lookup(found: Option<T>) -> Self {
        match found {
            Some(value) => Self::Loaded(value),
            None => Self::Missing,
        }
    }

    pub fn loaded(&self) -> Option<&T> {
        match self {
            Self::Loaded(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}

/// A person who applies for and holds licenses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Applicant {
    pub id: ApplicantId,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub date_joined: NaiveDate,
    pub address: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    /// Back-references computed by the store on read; never persisted.
    #[serde(default, skip_serializing)]
    pub application_ids: Vec<ApplicationId>,
    #[serde(default, skip_serializing)]
    pub license_ids: Vec<LicenseId>,
}

impl Applicant {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Named grouping of license types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseCategory {
    pub id: LicenseCategoryId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Member types computed by the store on read.
    #[serde(default, skip_serializing)]
    pub license_type_ids: Vec<LicenseTypeId>,
}

/// A license product: fee, expiration policy, and the license variant it issues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseType {
    pub id: LicenseTypeId,
    pub name: String,
    pub category_id: LicenseCategoryId,
    #[serde(default)]
    pub license_class: LicenseClass,
    /// Validity period in months; `None` never expires.
    #[serde(default)]
    pub expiration_months: Option<u32>,
    #[serde(default)]
    pub fee: Option<Fee>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl LicenseType {
    /// Expiration for a license issued on `issued_on`, or `None` for non-expiring types.
    ///
    /// Month arithmetic clamps to the last day of shorter months (Jan 31 + 1 month = Feb 28/29).
    /// A period that runs past `NaiveDate::MAX` is an error, not `Ok(None)`.
    pub fn expiration_for(
        &self,
        issued_on: NaiveDate,
    ) -> Result<Option<NaiveDate>, ExpirationOutOfRange> {
        let Some(months) = self.expiration_months else {
            return Ok(None);
        };
        issued_on
            .checked_add_months(chrono::Months::new(months))
            .map(Some)
            .ok_or(ExpirationOutOfRange {
                license_type_id: self.id,
                issued_on,
                months,
            })
    }
}

/// A license type's validity period overflowed the supported date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error(
    "license type {license_type_id}: {months} months from {issued_on} is past the supported calendar"
)]
pub struct ExpirationOutOfRange {
    pub license_type_id: LicenseTypeId,
    pub issued_on: NaiveDate,
    pub months: u32,
}

/// One-way approval state of an application.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    #[default]
    UnderReview,
    Approved,
    Denied,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 3] = [
        ApplicationStatus::UnderReview,
        ApplicationStatus::Approved,
        ApplicationStatus::Denied,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::UnderReview => "under_review",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Denied => "denied",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single submission for a license type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    #[serde(default = "unassigned_application_id")]
    pub id: ApplicationId,
    pub applicant_id: ApplicantId,
    pub license_type_id: LicenseTypeId,
    pub submission_date: NaiveDate,
    pub delivery_address: String,
    /// Snapshot of `LicenseType::fee` taken at submission.
    #[serde(default)]
    pub fee: Option<Fee>,
    #[serde(default)]
    pub status: ApplicationStatus,
    /// Stamped when the application is approved or denied.
    #[serde(default)]
    pub decided_on: Option<NaiveDate>,
    #[serde(default)]
    pub license_id: Option<LicenseId>,
    #[serde(skip)]
    pub applicant: Hydrated<Applicant>,
    #[serde(skip)]
    pub license_type: Hydrated<LicenseType>,
    #[serde(skip)]
    pub license: Hydrated<License>,
}

fn unassigned_application_id() -> ApplicationId {
    ApplicationId::UNASSIGNED
}

impl Application {
    /// A fresh, unpersisted application in `UnderReview`.
    pub fn submitted(
        applicant: &Applicant,
        license_type: &LicenseType,
        delivery_address: String,
        submitted_on: NaiveDate,
    ) -> Self {
        Self {
            id: ApplicationId::UNASSIGNED,
            applicant_id: applicant.id,
            license_type_id: license_type.id,
            submission_date: submitted_on,
            delivery_address,
            fee: license_type.fee,
            status: ApplicationStatus::UnderReview,
            decided_on: None,
            license_id: None,
            applicant: Hydrated::Loaded(applicant.clone()),
            license_type: Hydrated::Loaded(license_type.clone()),
            license: Hydrated::NotLoaded,
        }
    }

    pub fn is_under_review(&self) -> bool {
        self.status == ApplicationStatus::UnderReview
    }

    /// Checks the status/license link: a license id is present exactly when approved.
    pub fn license_link_consistent(&self) -> bool {
        (self.status == ApplicationStatus::Approved) == self.license_id.is_some()
    }
}

/// Inbound request shape for a new application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSubmitRequest {
    pub applicant_id: ApplicantId,
    pub license_type_id: LicenseTypeId,
    pub delivery_address: String,
}

impl ApplicationSubmitRequest {
    pub fn new(
        applicant_id: ApplicantId,
        license_type_id: LicenseTypeId,
        delivery_address: impl Into<String>,
    ) -> Self {
        Self {
            applicant_id,
            license_type_id,
            delivery_address: delivery_address.into(),
        }
    }
}
