use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::identifiers::{Clock, SystemClock};
use super::license::{License, LicenseId};
use super::repository::{EntityStore, RepositoryError};

/// Payload handed to observers for each license about to expire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryNotice {
    pub license_id: LicenseId,
    pub holder_name: String,
    pub expiration_date: NaiveDate,
    pub days_remaining: i64,
}

impl ExpiryNotice {
    fn for_license(license: &License, expiration_date: NaiveDate, today: NaiveDate) -> Self {
        Self {
            license_id: license.id.clone(),
            holder_name: license.holder_name(),
            expiration_date,
            days_remaining: (expiration_date - today).num_days(),
        }
    }
}

/// Subscriber hook for expiring licenses (mail merge, SMS, audit log adapters).
pub trait ExpiryObserver: Send + Sync {
    fn license_expiring(&self, notice: &ExpiryNotice) -> Result<(), ObserverError>;
}

impl<F> ExpiryObserver for F
where
    F: Fn(&ExpiryNotice) + Send + Sync,
{
    fn license_expiring(&self, notice: &ExpiryNotice) -> Result<(), ObserverError> {
        self(notice);
        Ok(())
    }
}

/// Observer dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Scans issued licenses and fans out a notice per license expiring within the threshold.
pub struct LicenseExpiryNotifier {
    licenses: Arc<dyn EntityStore<License>>,
    clock: Arc<dyn Clock>,
    observers: Vec<Arc<dyn ExpiryObserver>>,
}

impl LicenseExpiryNotifier {
    pub fn new(licenses: Arc<dyn EntityStore<License>>) -> Self {
        Self::with_clock(licenses, Arc::new(SystemClock))
    }

    pub fn with_clock(licenses: Arc<dyn EntityStore<License>>, clock: Arc<dyn Clock>) -> Self {
        Self {
            licenses,
            clock,
            observers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, observer: Arc<dyn ExpiryObserver>) {
        self.observers.push(observer);
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Read-only scan. Every observer sees every matching license once before this returns;
    /// an observer failure is logged and does not stop the fan-out.
    pub async fn scan(&self, threshold_days: u32) -> Result<Vec<ExpiryNotice>, RepositoryError> {
        let today = self.clock.today();
        let licenses = self.licenses.get_all().await?;

        let notices: Vec<ExpiryNotice> = licenses
            .iter()
            .filter(|license| license.is_expiring_soon(today, threshold_days))
            .filter_map(|license| {
                license
                    .expiration_date
                    .map(|expires| ExpiryNotice::for_license(license, expires, today))
            })
            .collect();

        for notice in &notices {
            for observer in &self.observers {
                if let Err(err) = observer.license_expiring(notice) {
                    warn!(license_id = %notice.license_id, error = %err, "expiry observer failed");
                }
            }
        }

        info!(
            scanned = licenses.len(),
            expiring = notices.len(),
            threshold_days,
            "license expiry scan complete"
        );
        Ok(notices)
    }
}
