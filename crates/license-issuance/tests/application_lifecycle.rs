//! End-to-end lifecycle through the public facade: seed the demo catalogue, submit, decide,
//! then check the expiry notifier and reports see the same state.

mod common {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use license_issuance::config::LicensingConfig;
    use license_issuance::workflows::licensing::{
        ApplicationService, FixedClock, InMemoryLicensingStore, LicensingFixture, LicensingStores,
        RandomLicenseIdGenerator,
    };

    pub(super) fn day(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    pub(super) async fn demo_store() -> Arc<InMemoryLicensingStore> {
        let store = Arc::new(InMemoryLicensingStore::new());
        LicensingFixture::demo()
            .seed(store.as_ref())
            .await
            .expect("demo catalogue seeds");
        store
    }

    pub(super) fn service_on(
        store: Arc<InMemoryLicensingStore>,
        today: NaiveDate,
    ) -> ApplicationService {
        ApplicationService::with_collaborators(
            LicensingStores::shared(store),
            Arc::new(RandomLicenseIdGenerator),
            Arc::new(FixedClock(today)),
            LicensingConfig::default(),
        )
    }
}

use std::sync::{Arc, Mutex};

use common::*;
use license_issuance::workflows::licensing::{
    ApplicantId, ApplicationServiceError, ApplicationStatus, ApplicationSubmitRequest,
    EntityStore, ExpiryNotice, FixedClock, License, LicenseClass, LicenseExpiryNotifier,
    LicenseTypeId, ReportingService,
};

const ADA: ApplicantId = ApplicantId(1);
const LEE: ApplicantId = ApplicantId(2);
const STANDARD_DRIVERS: LicenseTypeId = LicenseTypeId(2);
const COMMERCIAL_DRIVERS: LicenseTypeId = LicenseTypeId(3);

#[tokio::test]
async fn submitted_application_is_approved_into_a_license() {
    let store = demo_store().await;
    let service = service_on(store.clone(), day(2024, 1, 15));

    let application = service
        .submit(ApplicationSubmitRequest::new(
            ADA,
            STANDARD_DRIVERS,
            "123 Main St",
        ))
        .await
        .expect("submission accepted");
    assert_eq!(application.status, ApplicationStatus::UnderReview);

    let license = service.approve(application.id).await.expect("approved");
    assert_eq!(license.expiration_date, Some(day(2025, 1, 15)));
    assert_eq!(license.variant.class(), LicenseClass::DriversLicense);

    match service.approve(application.id).await {
        Err(ApplicationServiceError::InvalidState { .. }) => {}
        other => panic!("second approval must fail, got {other:?}"),
    }

    let stored = service.get(application.id).await.expect("application present");
    assert_eq!(stored.status, ApplicationStatus::Approved);
    assert_eq!(stored.license_id, Some(license.id.clone()));

    let licenses: Vec<License> = EntityStore::<License>::get_all(store.as_ref())
        .await
        .expect("licenses readable");
    assert_eq!(licenses.len(), 1);
}

#[tokio::test]
async fn denied_application_never_yields_a_license() {
    let store = demo_store().await;
    let service = service_on(store.clone(), day(2024, 3, 1));

    let application = service
        .submit(ApplicationSubmitRequest::new(
            LEE,
            COMMERCIAL_DRIVERS,
            "9 Harbor Rd",
        ))
        .await
        .expect("submission accepted");
    service.deny(application.id).await.expect("denied");

    assert!(service.approve(application.id).await.is_err());
    let licenses: Vec<License> = EntityStore::<License>::get_all(store.as_ref())
        .await
        .expect("licenses readable");
    assert!(licenses.is_empty());
}

#[tokio::test]
async fn expiring_licenses_reach_observers_and_reports() {
    let store = demo_store().await;

    // Issued five weeks apart; only the first lands inside the scan window.
    let early = service_on(store.clone(), day(2024, 1, 15));
    let first = early
        .submit(ApplicationSubmitRequest::new(ADA, STANDARD_DRIVERS, "123 Main St"))
        .await
        .expect("submission accepted");
    let near = early.approve(first.id).await.expect("approved");

    let late = service_on(store.clone(), day(2024, 2, 20));
    let second = late
        .submit(ApplicationSubmitRequest::new(LEE, STANDARD_DRIVERS, "9 Harbor Rd"))
        .await
        .expect("submission accepted");
    late.approve(second.id).await.expect("approved");

    let scan_day = day(2025, 1, 5);
    let heard = Arc::new(Mutex::new(Vec::new()));
    let sink = heard.clone();
    let mut notifier =
        LicenseExpiryNotifier::with_clock(store.clone(), Arc::new(FixedClock(scan_day)));
    notifier.subscribe(Arc::new(move |notice: &ExpiryNotice| {
        sink.lock()
            .expect("sink poisoned")
            .push(notice.license_id.clone());
    }));

    let notices = notifier.scan(30).await.expect("scan succeeds");
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].days_remaining, 10);
    assert_eq!(*heard.lock().expect("sink poisoned"), vec![near.id.clone()]);

    let reports = ReportingService::with_clock(store, Arc::new(FixedClock(scan_day)));
    let expiring = reports
        .licenses_expiring_soon(30)
        .await
        .expect("report runs");
    assert_eq!(
        expiring.iter().map(|license| license.id.clone()).collect::<Vec<_>>(),
        vec![near.id]
    );
    let counts = reports
        .application_counts_by_status()
        .await
        .expect("report runs");
    assert_eq!(counts[&ApplicationStatus::Approved], 2);
}
