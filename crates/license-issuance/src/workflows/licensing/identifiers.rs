use chrono::{Local, NaiveDate};

use super::license::LicenseId;

/// Source of fresh license codes. Uniqueness is enforced by the store, not the generator.
pub trait LicenseIdGenerator: Send + Sync {
    fn generate(&self) -> LicenseId;
}

/// Two random uppercase letters followed by a seven digit number without a leading zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomLicenseIdGenerator;

impl LicenseIdGenerator for RandomLicenseIdGenerator {
    fn generate(&self) -> LicenseId {
        let first = char::from(b'A' + rand::random_range(0..26u8));
        let second = char::from(b'A' + rand::random_range(0..26u8));
        let number: u32 = rand::random_range(1_000_000..10_000_000);

        LicenseId::from_generated(format!("{first}{second}{number}"))
    }
}

/// Source of "today" for submission, decision, and issue dates.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local calendar date of the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Always reports the same date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_match_pattern() {
        let generator = RandomLicenseIdGenerator;
        for _ in 0..256 {
            let id = generator.generate();
            let raw = id.as_str();
            assert_eq!(raw.len(), 9);
            assert!(raw[..2].chars().all(|c| c.is_ascii_uppercase()));
            assert!(raw[2..].chars().all(|c| c.is_ascii_digit()));
            assert_ne!(&raw[2..3], "0");
        }
    }

    #[test]
    fn fixed_clock_is_stable() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).expect("valid date");
        let clock = FixedClock(date);
        assert_eq!(clock.today(), date);
        assert_eq!(clock.today(), date);
    }
}
