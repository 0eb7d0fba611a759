use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{
    Applicant, ApplicantId, ExpirationOutOfRange, Hydrated, LicenseType, LicenseTypeId,
};

const ID_LETTERS: usize = 2;
const ID_DIGITS: usize = 7;

/// License code: two uppercase ASCII letters followed by seven digits, e.g. `AB1234567`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LicenseId(String);

impl LicenseId {
    pub fn parse(raw: &str) -> Result<Self, InvalidLicenseId> {
        let bytes = raw.as_bytes();
        let well_formed = bytes.len() == ID_LETTERS + ID_DIGITS
            && bytes[..ID_LETTERS].iter().all(u8::is_ascii_uppercase)
            && bytes[ID_LETTERS..].iter().all(u8::is_ascii_digit);

        if well_formed {
            Ok(Self(raw.to_string()))
        } else {
            Err(InvalidLicenseId(raw.to_string()))
        }
    }

    /// For callers that built `raw` from the pattern itself.
    pub(super) fn from_generated(raw: String) -> Self {
        debug_assert!(Self::parse(&raw).is_ok(), "malformed generated id {raw}");
        Self(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LicenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LicenseId {
    type Err = InvalidLicenseId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for LicenseId {
    type Error = InvalidLicenseId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LicenseId> for String {
    fn from(value: LicenseId) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("license id '{0}' must be two uppercase letters followed by seven digits")]
pub struct InvalidLicenseId(pub String);

/// Lifecycle state of an issued license.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LicenseStatus {
    #[default]
    Valid,
    Expired,
    Suspended,
    Revoked,
}

impl LicenseStatus {
    pub const fn label(self) -> &'static str {
        match self {
            LicenseStatus::Valid => "valid",
            LicenseStatus::Expired => "expired",
            LicenseStatus::Suspended => "suspended",
            LicenseStatus::Revoked => "revoked",
        }
    }
}

impl fmt::Display for LicenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Stored tag on a license type selecting which license variant it issues.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LicenseClass {
    #[default]
    License,
    DriversLicense,
    CommercialLicense,
    CommercialDriversLicense,
}

impl LicenseClass {
    pub const fn name(self) -> &'static str {
        match self {
            LicenseClass::License => "License",
            LicenseClass::DriversLicense => "DriversLicense",
            LicenseClass::CommercialLicense => "CommercialLicense",
            LicenseClass::CommercialDriversLicense => "CommercialDriversLicense",
        }
    }
}

impl fmt::Display for LicenseClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LicenseClass {
    type Err = UnknownLicenseClass;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "License" => Ok(LicenseClass::License),
            "DriversLicense" => Ok(LicenseClass::DriversLicense),
            "CommercialLicense" => Ok(LicenseClass::CommercialLicense),
            "CommercialDriversLicense" => Ok(LicenseClass::CommercialDriversLicense),
            other => Err(UnknownLicenseClass(other.to_string())),
        }
    }
}

impl TryFrom<String> for LicenseClass {
    type Error = UnknownLicenseClass;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LicenseClass> for String {
    fn from(value: LicenseClass) -> Self {
        value.name().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown license class '{0}'")]
pub struct UnknownLicenseClass(pub String);

/// Sex designation printed on driver credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    M,
    F,
    X,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Height {
    pub feet: u8,
    pub inches: u8,
}

/// Printed fields specific to driver credentials. Blank until a printing step fills them in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverDetails {
    pub vehicle_class: Option<String>,
    pub eye_color: Option<String>,
    pub sex: Option<Sex>,
    pub height: Option<Height>,
    #[serde(default)]
    pub organ_donor: bool,
    pub restrictions: Option<String>,
}

/// Variant-specific payload of a license. The base fields and lifecycle rules are shared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum LicenseVariant {
    #[default]
    Standard,
    Drivers(DriverDetails),
    Commercial {
        endorsements: Option<String>,
    },
    CommercialDrivers {
        driver: DriverDetails,
        endorsements: Option<String>,
    },
}

impl LicenseVariant {
    /// Blank variant payload for a newly issued license of `class`.
    pub fn issued_as(class: LicenseClass) -> Self {
        match class {
            LicenseClass::License => LicenseVariant::Standard,
            LicenseClass::DriversLicense => LicenseVariant::Drivers(DriverDetails::default()),
            LicenseClass::CommercialLicense => LicenseVariant::Commercial { endorsements: None },
            LicenseClass::CommercialDriversLicense => LicenseVariant::CommercialDrivers {
                driver: DriverDetails::default(),
                endorsements: None,
            },
        }
    }

    pub fn class(&self) -> LicenseClass {
        match self {
            LicenseVariant::Standard => LicenseClass::License,
            LicenseVariant::Drivers(_) => LicenseClass::DriversLicense,
            LicenseVariant::Commercial { .. } => LicenseClass::CommercialLicense,
            LicenseVariant::CommercialDrivers { .. } => LicenseClass::CommercialDriversLicense,
        }
    }

    pub fn driver_details(&self) -> Option<&DriverDetails> {
        match self {
            LicenseVariant::Drivers(details) => Some(details),
            LicenseVariant::CommercialDrivers { driver, .. } => Some(driver),
            _ => None,
        }
    }

    pub fn endorsements(&self) -> Option<&str> {
        match self {
            LicenseVariant::Commercial { endorsements }
            | LicenseVariant::CommercialDrivers { endorsements, .. } => endorsements.as_deref(),
            _ => None,
        }
    }
}

/// An issued credential. Holder name, address, and birth date are snapshots taken at issuance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub id: LicenseId,
    pub license_type_id: LicenseTypeId,
    pub applicant_id: ApplicantId,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub date_of_birth: NaiveDate,
    pub issue_date: NaiveDate,
    #[serde(default)]
    pub expiration_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: LicenseStatus,
    #[serde(default)]
    pub variant: LicenseVariant,
    #[serde(skip)]
    pub applicant: Hydrated<Applicant>,
    #[serde(skip)]
    pub license_type: Hydrated<LicenseType>,
}

impl License {
    /// Issue a `Valid` license for `holder`, snapshotting their printed details.
    pub fn issue(
        id: LicenseId,
        holder: &Applicant,
        license_type: &LicenseType,
        issued_on: NaiveDate,
    ) -> Result<Self, ExpirationOutOfRange> {
        Ok(Self {
            id,
            license_type_id: license_type.id,
            applicant_id: holder.id,
            first_name: holder.first_name.clone(),
            last_name: holder.last_name.clone(),
            address: holder.address.clone(),
            date_of_birth: holder.date_of_birth,
            issue_date: issued_on,
            expiration_date: license_type.expiration_for(issued_on)?,
            status: LicenseStatus::Valid,
            variant: LicenseVariant::issued_as(license_type.license_class),
            applicant: Hydrated::Loaded(holder.clone()),
            license_type: Hydrated::Loaded(license_type.clone()),
        })
    }

    pub fn holder_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Valid and expiring within `[today, today + threshold_days]`, both ends inclusive.
    pub fn is_expiring_soon(&self, today: NaiveDate, threshold_days: u32) -> bool {
        let Some(expires) = self.expiration_date else {
            return false;
        };
        let cutoff = today
            .checked_add_days(chrono::Days::new(u64::from(threshold_days)))
            .unwrap_or(NaiveDate::MAX);

        self.status == LicenseStatus::Valid && expires >= today && expires <= cutoff
    }

    /// Whether everything except `status` (and hydrated references) matches `other`.
    pub fn same_founding_facts(&self, other: &License) -> bool {
        self.id == other.id
            && self.license_type_id == other.license_type_id
            && self.applicant_id == other.applicant_id
            && self.first_name == other.first_name
            && self.last_name == other.last_name
            && self.address == other.address
            && self.date_of_birth == other.date_of_birth
            && self.issue_date == other.issue_date
            && self.expiration_date == other.expiration_date
            && self.variant.class() == other.variant.class()
    }
}
