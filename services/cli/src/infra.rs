use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use license_issuance::error::AppError;
use license_issuance::workflows::licensing::{
    Clock, ExpiryNotice, ExpiryObserver, FixedClock, InMemoryLicensingStore, LicensingFixture,
    ObserverError, SystemClock,
};
use tracing::info;

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Pinned clock when the caller supplied a date, the host calendar otherwise.
pub(crate) fn clock_for(today: Option<NaiveDate>) -> Arc<dyn Clock> {
    match today {
        Some(date) => Arc::new(FixedClock(date)),
        None => Arc::new(SystemClock),
    }
}

pub(crate) async fn seeded_store(
    fixture: LicensingFixture,
) -> Result<Arc<InMemoryLicensingStore>, AppError> {
    let store = Arc::new(InMemoryLicensingStore::new());
    let seeded = fixture.seed(store.as_ref()).await?;
    info!(
        applicants = seeded.applicants,
        license_types = seeded.license_types,
        applications = seeded.applications,
        licenses = seeded.licenses,
        "in-memory store seeded"
    );
    Ok(store)
}

pub(crate) async fn store_from_path(
    path: &Path,
) -> Result<Arc<InMemoryLicensingStore>, AppError> {
    let fixture = LicensingFixture::from_path(path)?;
    seeded_store(fixture).await
}

/// Prints each expiry notice as a console line.
#[derive(Debug, Default)]
pub(crate) struct ConsoleObserver;

impl ExpiryObserver for ConsoleObserver {
    fn license_expiring(&self, notice: &ExpiryNotice) -> Result<(), ObserverError> {
        println!(
            "  - {} held by {} expires {} ({} days)",
            notice.license_id, notice.holder_name, notice.expiration_date, notice.days_remaining
        );
        Ok(())
    }
}
