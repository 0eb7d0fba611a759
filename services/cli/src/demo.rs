use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Days, Months, NaiveDate};
use clap::Args;
use license_issuance::config::LicensingConfig;
use license_issuance::error::AppError;
use license_issuance::workflows::licensing::{
    Applicant, ApplicantId, ApplicationService, ApplicationServiceError,
    ApplicationSubmitRequest, Clock, EntityStore, InMemoryLicensingStore, License,
    LicenseExpiryNotifier, LicenseIdGenerator, LicenseType, LicenseTypeId, LicensingFixture,
    LicensingStores, LicensingSummary, RandomLicenseIdGenerator, ReportingService,
};

use crate::infra::{clock_for, seeded_store, store_from_path, ConsoleObserver};

const ADA: ApplicantId = ApplicantId(1);
const LEE: ApplicantId = ApplicantId(2);
const STANDARD_DRIVERS: LicenseTypeId = LicenseTypeId(2);
const COMMERCIAL_DRIVERS: LicenseTypeId = LicenseTypeId(3);

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Date the demo treats as today (YYYY-MM-DD). Defaults to the host date.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// JSON fixture with categories, license types, applicants, applications, and licenses
    #[arg(long)]
    pub(crate) fixture: PathBuf,
    /// Expiry window in days (defaults to LICENSE_EXPIRY_NOTICE_DAYS)
    #[arg(long)]
    pub(crate) days: Option<u32>,
    /// How many applicants to list in the license ranking
    #[arg(long, default_value_t = 5)]
    pub(crate) top: usize,
    /// Emit the summary as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ExpiringArgs {
    /// JSON fixture to scan
    #[arg(long)]
    pub(crate) fixture: PathBuf,
    /// Expiry window in days (defaults to LICENSE_EXPIRY_NOTICE_DAYS)
    #[arg(long)]
    pub(crate) days: Option<u32>,
    /// Scan date (YYYY-MM-DD). Defaults to the host date.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) async fn run_report(args: ReportArgs, config: &LicensingConfig) -> Result<(), AppError> {
    let ReportArgs {
        fixture,
        days,
        top,
        json,
    } = args;
    let days = days.unwrap_or(config.expiry_notice_days);

    let store = store_from_path(&fixture).await?;
    let summary = ReportingService::shared(store).summary(days, top).await?;

    if json {
        match serde_json::to_string_pretty(&summary) {
            Ok(payload) => println!("{payload}"),
            Err(err) => println!("Summary payload unavailable: {err}"),
        }
        return Ok(());
    }

    println!("Licensing report ({})", fixture.display());
    render_summary(&summary, days);
    Ok(())
}

pub(crate) async fn run_expiring(
    args: ExpiringArgs,
    config: &LicensingConfig,
) -> Result<(), AppError> {
    let ExpiringArgs {
        fixture,
        days,
        today,
    } = args;
    let days = days.unwrap_or(config.expiry_notice_days);
    let clock = clock_for(today);

    let store = store_from_path(&fixture).await?;
    let mut notifier = LicenseExpiryNotifier::with_clock(store, clock.clone());
    notifier.subscribe(Arc::new(ConsoleObserver));

    println!(
        "Licenses expiring within {} days of {}",
        days,
        clock.today()
    );
    let notices = notifier.scan(days).await?;
    if notices.is_empty() {
        println!("  none");
    }
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs, config: &LicensingConfig) -> Result<(), AppError> {
    let clock = clock_for(args.today);
    let today = clock.today();
    let store = seeded_store(LicensingFixture::demo()).await?;
    let service = ApplicationService::with_collaborators(
        LicensingStores::shared(store.clone()),
        Arc::new(RandomLicenseIdGenerator),
        clock.clone(),
        *config,
    );

    println!("License issuance demo (today {today})");

    println!("\nSubmit");
    let application = service
        .submit(ApplicationSubmitRequest::new(
            ADA,
            STANDARD_DRIVERS,
            "123 Main St",
        ))
        .await?;
    println!(
        "- Application {} for applicant {} -> {} (fee {})",
        application.id,
        application.applicant_id,
        application.status,
        application
            .fee
            .map(|fee| fee.to_string())
            .unwrap_or_else(|| "none".to_string())
    );

    println!("\nApprove");
    let license = service.approve(application.id).await?;
    println!(
        "- Issued {} license {} to {}, expires {}",
        license.variant.class(),
        license.id,
        license.holder_name(),
        license
            .expiration_date
            .map(|date| date.to_string())
            .unwrap_or_else(|| "never".to_string())
    );

    println!("\nApprove again");
    match service.approve(application.id).await {
        Ok(duplicate) => println!("- Unexpectedly issued {}", duplicate.id),
        Err(err) => println!("- Refused: {err}"),
    }

    println!("\nDeny");
    let denied = service
        .submit(ApplicationSubmitRequest::new(
            LEE,
            COMMERCIAL_DRIVERS,
            "9 Harbor Rd",
        ))
        .await?;
    service.deny(denied.id).await?;
    let denied = service.get(denied.id).await?;
    println!(
        "- Application {} -> {} on {}",
        denied.id,
        denied.status,
        denied
            .decided_on
            .map(|date| date.to_string())
            .unwrap_or_default()
    );
    if let Err(err) = service
        .update_delivery_address(denied.id, "1 Dockside Way")
        .await
    {
        println!("- Address change refused: {err}");
    }

    println!("\nExpiry scan ({} day window)", config.expiry_notice_days);
    seed_expiring_licenses(&store, today).await?;
    let mut notifier = LicenseExpiryNotifier::with_clock(store.clone(), clock);
    notifier.subscribe(Arc::new(ConsoleObserver));
    let notices = notifier.scan(config.expiry_notice_days).await?;
    println!("- {} notice(s) dispatched", notices.len());

    println!("\nReport");
    let summary = ReportingService::with_clock(store, clock_for(Some(today)))
        .summary(config.expiry_notice_days, 3)
        .await?;
    render_summary(&summary, config.expiry_notice_days);

    Ok(())
}

/// Two licenses for Lee on the standard type: one lapsing in 10 days, one in 60.
async fn seed_expiring_licenses(
    store: &InMemoryLicensingStore,
    today: NaiveDate,
) -> Result<(), AppError> {
    let holder = EntityStore::<Applicant>::get_by_id(store, &LEE).await?;
    let license_type = EntityStore::<LicenseType>::get_by_id(store, &STANDARD_DRIVERS).await?;
    let (Some(holder), Some(license_type)) = (holder, license_type) else {
        return Ok(());
    };

    let ids = RandomLicenseIdGenerator;
    for days_left in [10, 60] {
        let Some(expires) = today.checked_add_days(Days::new(days_left)) else {
            continue;
        };
        let issued_on = expires
            .checked_sub_months(Months::new(12))
            .unwrap_or(today);
        let license = License::issue(ids.generate(), &holder, &license_type, issued_on)
            .map_err(ApplicationServiceError::from)?;
        EntityStore::<License>::add(store, license).await?;
    }
    Ok(())
}

fn render_summary(summary: &LicensingSummary, days: u32) {
    println!("Applications by status");
    for (status, count) in &summary.applications_by_status {
        println!("- {status}: {count}");
    }

    if summary.revenue_by_license_type.is_empty() {
        println!("Revenue: none");
    } else {
        println!("Revenue by license type");
        for (name, total) in &summary.revenue_by_license_type {
            println!("- {name}: {total}");
        }
    }

    println!("Licenses by category");
    for (name, count) in &summary.licenses_by_category {
        println!("- {name}: {count}");
    }

    println!("Top license holders");
    for holder in &summary.top_applicants {
        println!("- {} (#{}): {}", holder.name, holder.applicant_id, holder.licenses);
    }

    if summary.expiring_soon.is_empty() {
        println!("Expiring within {days} days: none");
    } else {
        println!("Expiring within {days} days");
        for license in &summary.expiring_soon {
            println!(
                "- {} {} ({})",
                license.id,
                license.holder_name(),
                license
                    .expiration_date
                    .map(|date| date.to_string())
                    .unwrap_or_default()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn demo_runs_against_pinned_date() {
        let args = DemoArgs {
            today: NaiveDate::from_ymd_opt(2024, 1, 15),
        };
        run_demo(args, &LicensingConfig::default())
            .await
            .expect("demo completes");
    }

    #[tokio::test]
    async fn demo_seeds_one_license_inside_the_window() {
        let store = seeded_store(LicensingFixture::demo())
            .await
            .expect("demo fixture seeds");
        let today = NaiveDate::from_ymd_opt(2024, 1, 15).expect("valid date");

        seed_expiring_licenses(&store, today)
            .await
            .expect("licenses seeded");

        let expiring = ReportingService::with_clock(store, clock_for(Some(today)))
            .licenses_expiring_soon(30)
            .await
            .expect("report runs");
        assert_eq!(expiring.len(), 1);
        assert_eq!(
            expiring[0].expiration_date,
            today.checked_add_days(Days::new(10))
        );
    }
}
