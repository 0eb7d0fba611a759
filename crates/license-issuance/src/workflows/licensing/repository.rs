use std::fmt::Debug;
use std::hash::Hash;

use async_trait::async_trait;

use super::domain::{
    Applicant, ApplicantId, Application, ApplicationId, LicenseCategory, LicenseCategoryId,
    LicenseType, LicenseTypeId,
};
use super::license::{License, LicenseId};

/// A record the entity store can persist under a key.
pub trait Entity: Clone + Send + Sync + 'static {
    type Key: Clone + Eq + Hash + Ord + Debug + Send + Sync + 'static;

    /// Label used in logs and not-found errors.
    const KIND: &'static str;

    fn key(&self) -> Self::Key;

    /// Stores that allocate surrogate keys call this on insert. Returns `false` when the entity
    /// carries its own key (or already has one) and nothing was assigned.
    fn assign_key(&mut self, _sequence: u32) -> bool {
        false
    }

    /// Checked on update against the stored version; `false` rejects the update.
    fn preserves_immutable_fields(&self, _stored: &Self) -> bool {
        true
    }
}

impl Entity for Applicant {
    type Key = ApplicantId;
    const KIND: &'static str = "applicant";

    fn key(&self) -> Self::Key {
        self.id
    }

    fn assign_key(&mut self, sequence: u32) -> bool {
        if self.id.0 != 0 {
            return false;
        }
        self.id = ApplicantId(sequence);
        true
    }

    fn preserves_immutable_fields(&self, stored: &Self) -> bool {
        self.id == stored.id
            && self.date_of_birth == stored.date_of_birth
            && self.date_joined == stored.date_joined
    }
}

impl Entity for LicenseCategory {
    type Key = LicenseCategoryId;
    const KIND: &'static str = "license category";

    fn key(&self) -> Self::Key {
        self.id
    }

    fn assign_key(&mut self, sequence: u32) -> bool {
        if self.id.0 != 0 {
            return false;
        }
        self.id = LicenseCategoryId(sequence);
        true
    }
}

impl Entity for LicenseType {
    type Key = LicenseTypeId;
    const KIND: &'static str = "license type";

    fn key(&self) -> Self::Key {
        self.id
    }

    fn assign_key(&mut self, sequence: u32) -> bool {
        if self.id.0 != 0 {
            return false;
        }
        self.id = LicenseTypeId(sequence);
        true
    }
}

impl Entity for Application {
    type Key = ApplicationId;
    const KIND: &'static str = "application";

    fn key(&self) -> Self::Key {
        self.id
    }

    fn assign_key(&mut self, sequence: u32) -> bool {
        if self.id.is_assigned() {
            return false;
        }
        self.id = ApplicationId(sequence);
        true
    }

    fn preserves_immutable_fields(&self, stored: &Self) -> bool {
        self.id == stored.id
            && self.fee == stored.fee
            && self.submission_date == stored.submission_date
            && self.applicant_id == stored.applicant_id
            && self.license_type_id == stored.license_type_id
    }
}

impl Entity for License {
    type Key = LicenseId;
    const KIND: &'static str = "license";

    fn key(&self) -> Self::Key {
        self.id.clone()
    }

    fn preserves_immutable_fields(&self, stored: &Self) -> bool {
        self.same_founding_facts(stored)
    }
}

/// Storage abstraction so the lifecycle engine can run against any persistence layer.
///
/// `add` returns the persisted entity including any store-assigned key. `update` and `delete`
/// return `true` iff exactly one record matched.
#[async_trait]
pub trait EntityStore<T: Entity>: Send + Sync {
    async fn get_by_id(&self, id: &T::Key) -> Result<Option<T>, RepositoryError>;
    async fn get_all(&self) -> Result<Vec<T>, RepositoryError>;
    async fn add(&self, entity: T) -> Result<T, RepositoryError>;
    async fn update(&self, entity: &T) -> Result<bool, RepositoryError>;
    async fn delete(&self, id: &T::Key) -> Result<bool, RepositoryError>;
}

/// Error enumeration for store failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("write rejected: {0}")]
    Rejected(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

impl RepositoryError {
    /// Connectivity-style failures the caller cannot resolve by changing its input.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, RepositoryError::Unavailable(_))
    }
}
