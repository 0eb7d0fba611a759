use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::domain::{Applicant, Application, Hydrated, LicenseCategory, LicenseType};
use super::license::License;
use super::repository::{Entity, EntityStore, RepositoryError};

/// Single-table storage with surrogate key allocation.
#[derive(Debug)]
struct Table<T: Entity> {
    rows: BTreeMap<T::Key, T>,
    sequence: u32,
}

impl<T: Entity> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            sequence: 0,
        }
    }
}

impl<T: Entity> Table<T> {
    fn insert(&mut self, entity: T) -> Result<T, RepositoryError> {
        let mut candidate = entity.clone();
        if candidate.assign_key(self.sequence + 1) {
            while self.rows.contains_key(&candidate.key()) {
                self.sequence += 1;
                candidate = entity.clone();
                candidate.assign_key(self.sequence + 1);
            }
            self.sequence += 1;
        } else if self.rows.contains_key(&candidate.key()) {
            return Err(RepositoryError::Conflict);
        }

        self.rows.insert(candidate.key(), candidate.clone());
        Ok(candidate)
    }

    fn replace(&mut self, entity: T) -> bool {
        match self.rows.get_mut(&entity.key()) {
            Some(stored) if entity.preserves_immutable_fields(stored) => {
                *stored = entity;
                true
            }
            _ => false,
        }
    }

    fn remove(&mut self, key: &T::Key) -> bool {
        self.rows.remove(key).is_some()
    }
}

#[derive(Debug, Default)]
struct Tables {
    applicants: Table<Applicant>,
    categories: Table<LicenseCategory>,
    license_types: Table<LicenseType>,
    applications: Table<Application>,
    licenses: Table<License>,
}

impl Tables {
    fn hydrate_applicant(&self, mut applicant: Applicant) -> Applicant {
        applicant.application_ids = self
            .applications
            .rows
            .values()
            .filter(|application| application.applicant_id == applicant.id)
            .map(|application| application.id)
            .collect();
        applicant.license_ids = self
            .licenses
            .rows
            .values()
            .filter(|license| license.applicant_id == applicant.id)
            .map(|license| license.id.clone())
            .collect();
        applicant
    }

    fn hydrate_category(&self, mut category: LicenseCategory) -> LicenseCategory {
        category.license_type_ids = self
            .license_types
            .rows
            .values()
            .filter(|license_type| license_type.category_id == category.id)
            .map(|license_type| license_type.id)
            .collect();
        category
    }

    fn hydrate_license(&self, mut license: License) -> License {
        license.applicant =
            Hydrated::from_lookup(self.applicants.rows.get(&license.applicant_id).cloned());
        license.license_type = Hydrated::from_lookup(
            self.license_types
                .rows
                .get(&license.license_type_id)
                .cloned(),
        );
        license
    }

    /// Attaches applicant, license type, and (when referenced) the issued license.
    fn hydrate_application(&self, mut application: Application) -> Application {
        application.applicant =
            Hydrated::from_lookup(self.applicants.rows.get(&application.applicant_id).cloned());
        application.license_type = Hydrated::from_lookup(
            self.license_types
                .rows
                .get(&application.license_type_id)
                .cloned(),
        );
        application.license = match &application.license_id {
            Some(id) => Hydrated::from_lookup(self.licenses.rows.get(id).cloned()),
            None => Hydrated::NotLoaded,
        };
        application
    }
}

fn strip_applicant(mut applicant: Applicant) -> Applicant {
    applicant.application_ids.clear();
    applicant.license_ids.clear();
    applicant
}

fn strip_category(mut category: LicenseCategory) -> LicenseCategory {
    category.license_type_ids.clear();
    category
}

fn strip_application(mut application: Application) -> Application {
    application.applicant = Hydrated::NotLoaded;
    application.license_type = Hydrated::NotLoaded;
    application.license = Hydrated::NotLoaded;
    application
}

fn strip_license(mut license: License) -> License {
    license.applicant = Hydrated::NotLoaded;
    license.license_type = Hydrated::NotLoaded;
    license
}

/// Reference store keeping every table in process memory behind one lock.
///
/// Reads hydrate navigation references and back-reference lists; writes store the bare record.
#[derive(Debug, Default)]
pub struct InMemoryLicensingStore {
    tables: Mutex<Tables>,
}

impl InMemoryLicensingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }
}

macro_rules! memory_entity_store {
    ($entity:ty, $table:ident, $hydrate:expr, $strip:expr) => {
        #[async_trait]
        impl EntityStore<$entity> for InMemoryLicensingStore {
            async fn get_by_id(
                &self,
                id: &<$entity as Entity>::Key,
            ) -> Result<Option<$entity>, RepositoryError> {
                let guard = self.lock()?;
                let tables = &*guard;
                let hydrate = $hydrate;
                Ok(tables
                    .$table
                    .rows
                    .get(id)
                    .cloned()
                    .map(|row| hydrate(tables, row)))
            }

            async fn get_all(&self) -> Result<Vec<$entity>, RepositoryError> {
                let guard = self.lock()?;
                let tables = &*guard;
                let hydrate = $hydrate;
                Ok(tables
                    .$table
                    .rows
                    .values()
                    .cloned()
                    .map(|row| hydrate(tables, row))
                    .collect())
            }

            async fn add(&self, entity: $entity) -> Result<$entity, RepositoryError> {
                let mut guard = self.lock()?;
                let strip = $strip;
                let stored = guard.$table.insert(strip(entity))?;
                let hydrate = $hydrate;
                Ok(hydrate(&*guard, stored))
            }

            async fn update(&self, entity: &$entity) -> Result<bool, RepositoryError> {
                let mut guard = self.lock()?;
                let strip = $strip;
                Ok(guard.$table.replace(strip(entity.clone())))
            }

            async fn delete(&self, id: &<$entity as Entity>::Key) -> Result<bool, RepositoryError> {
                let mut guard = self.lock()?;
                Ok(guard.$table.remove(id))
            }
        }
    };
}

memory_entity_store!(
    Applicant,
    applicants,
    |tables: &Tables, row: Applicant| tables.hydrate_applicant(row),
    strip_applicant
);
memory_entity_store!(
    LicenseCategory,
    categories,
    |tables: &Tables, row: LicenseCategory| tables.hydrate_category(row),
    strip_category
);
memory_entity_store!(
    LicenseType,
    license_types,
    |_: &Tables, row: LicenseType| row,
    |row: LicenseType| row
);
memory_entity_store!(
    Application,
    applications,
    |tables: &Tables, row: Application| tables.hydrate_application(row),
    strip_application
);
memory_entity_store!(
    License,
    licenses,
    |tables: &Tables, row: License| tables.hydrate_license(row),
    strip_license
);
