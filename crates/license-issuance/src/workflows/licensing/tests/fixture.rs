use super::common::*;
use crate::workflows::licensing::domain::{
    Applicant, Application, ApplicationId, ApplicationStatus, Fee, LicenseType, LicenseTypeId,
};
use crate::workflows::licensing::fixture::{FixtureError, LicensingFixture};
use crate::workflows::licensing::license::{License, LicenseClass, LicenseVariant};
use crate::workflows::licensing::memory::InMemoryLicensingStore;
use crate::workflows::licensing::repository::{EntityStore, RepositoryError};

const FIXTURE: &str = r#"{
  "categories": [{ "id": 1, "name": "Personal" }],
  "license_types": [
    {
      "id": 4,
      "name": "Boat License",
      "category_id": 1,
      "license_class": "CommercialLicense",
      "expiration_months": 24,
      "fee": 1500
    }
  ],
  "applicants": [
    {
      "id": 1,
      "first_name": "Ada",
      "last_name": "Okafor",
      "date_of_birth": "1990-04-12",
      "date_joined": "2023-02-01",
      "address": "123 Main St",
      "email": "ada@example.com"
    }
  ],
  "licenses": [
    {
      "id": "BT1234567",
      "license_type_id": 4,
      "applicant_id": 1,
      "first_name": "Ada",
      "last_name": "Okafor",
      "address": "123 Main St",
      "date_of_birth": "1990-04-12",
      "issue_date": "2023-05-01",
      "expiration_date": "2025-05-01",
      "variant": { "class": "commercial", "endorsements": "P" }
    }
  ],
  "applications": [
    {
      "id": 7,
      "applicant_id": 1,
      "license_type_id": 4,
      "submission_date": "2023-04-20",
      "delivery_address": "123 Main St",
      "fee": 1500,
      "status": "approved",
      "decided_on": "2023-05-01",
      "license_id": "BT1234567"
    }
  ]
}"#;

#[tokio::test]
async fn json_fixture_seeds_every_table() {
    let fixture = LicensingFixture::from_reader(FIXTURE.as_bytes()).expect("fixture parses");
    let store = InMemoryLicensingStore::new();

    let report = fixture.seed(&store).await.expect("fixture seeds");

    assert_eq!(report.applicants, 1);
    assert_eq!(report.licenses, 1);
    assert_eq!(report.applications, 1);

    let boat: LicenseType = EntityStore::<LicenseType>::get_by_id(&store, &LicenseTypeId(4))
        .await
        .expect("lookup runs")
        .expect("type present");
    assert_eq!(boat.license_class, LicenseClass::CommercialLicense);
    assert_eq!(boat.fee, Some(Fee(1_500)));

    let application: Application = EntityStore::<Application>::get_by_id(&store, &ApplicationId(7))
        .await
        .expect("lookup runs")
        .expect("application present");
    assert_eq!(application.status, ApplicationStatus::Approved);
    assert!(application.license_link_consistent());
    let license: &License = application.license.loaded().expect("license hydrated");
    assert_eq!(license.variant.endorsements(), Some("P"));
    assert!(matches!(license.variant, LicenseVariant::Commercial { .. }));
}

#[test]
fn malformed_license_id_fails_to_parse() {
    let broken = FIXTURE.replace("\"BT1234567\"", "\"bt-1\"");
    assert!(matches!(
        LicensingFixture::from_reader(broken.as_bytes()),
        Err(FixtureError::Parse(_))
    ));
}

#[tokio::test]
async fn seeding_over_existing_rows_names_the_entity() {
    let store = seeded_store().await;
    let fixture = LicensingFixture {
        applicants: vec![applicant(ADA, "Ada", "123 Main St")],
        ..LicensingFixture::default()
    };

    match fixture.seed(store.as_ref()).await {
        Err(FixtureError::Seed { entity, source }) => {
            assert_eq!(entity, "applicant");
            assert_eq!(source, RepositoryError::Conflict);
        }
        other => panic!("expected seed conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn seeding_refuses_applications_with_inconsistent_license_links() {
    let unlinked = FIXTURE.replace(r#""license_id": "BT1234567""#, r#""license_id": null"#);
    let pending_with_license =
        FIXTURE.replace(r#""status": "approved""#, r#""status": "under_review""#);

    for raw in [unlinked, pending_with_license] {
        let fixture = LicensingFixture::from_reader(raw.as_bytes()).expect("fixture parses");
        let store = InMemoryLicensingStore::new();

        match fixture.seed(&store).await {
            Err(FixtureError::Seed {
                entity,
                source: RepositoryError::Rejected(_),
            }) => assert_eq!(entity, "application"),
            other => panic!("expected inconsistent application, got {other:?}"),
        }

        let applicants: Vec<Applicant> = EntityStore::<Applicant>::get_all(&store)
            .await
            .expect("applicants readable");
        assert!(applicants.is_empty());
    }
}

#[tokio::test]
async fn demo_fixture_is_self_consistent() {
    let store = InMemoryLicensingStore::new();
    LicensingFixture::demo()
        .seed(&store)
        .await
        .expect("demo seeds");

    let applicants: Vec<Applicant> = EntityStore::<Applicant>::get_all(&store)
        .await
        .expect("applicants readable");
    let types: Vec<LicenseType> = EntityStore::<LicenseType>::get_all(&store)
        .await
        .expect("types readable");

    assert_eq!(applicants.len(), 2);
    assert_eq!(types.len(), 3);
    assert!(types.iter().any(|license_type| license_type.expiration_months.is_none()));
}
