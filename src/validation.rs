//! Input checks shared by the account and booking services.

use lazy_static::lazy_static;
use regex::Regex;
use time::{macros::format_description, Date};

use crate::auth::repo_types::Availability;
use crate::error::{AppError, AppResult};

pub const MAX_BIO_LEN: usize = 500;
pub const MAX_EXPERIENCE_LEN: usize = 1000;
pub const MAX_PICTURE_URL_LEN: usize = 2048;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    static ref PHONE_RE: Regex = Regex::new(r"^\d{10}$").unwrap();
    static ref TIME_OF_DAY_RE: Regex = Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").unwrap();
}

/// Emails are stored trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

/// Fails with the names of every blank field.
pub fn require_fields(fields: &[(&str, &str)]) -> AppResult<()> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )))
    }
}

/// Parses a calendar date in `YYYY-MM-DD` form.
pub fn parse_date(field: &str, raw: &str) -> AppResult<Date> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|_| AppError::validation(format!("{field} must be a date in YYYY-MM-DD format")))
}

pub fn check_max_len(field: &str, value: Option<&str>, max: usize) -> AppResult<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(AppError::validation(format!(
            "{field} must be at most {max} characters"
        ))),
        _ => Ok(()),
    }
}

pub fn check_availability(a: &Availability) -> AppResult<()> {
    if !TIME_OF_DAY_RE.is_match(&a.start_time) || !TIME_OF_DAY_RE.is_match(&a.end_time) {
        return Err(AppError::validation(
            "Availability times must be in HH:MM format",
        ));
    }
    // Zero-padded HH:MM compares correctly as text.
    if a.start_time >= a.end_time {
        return Err(AppError::validation(
            "Availability start time must be before end time",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::Weekday;
    use time::macros::date;

    #[test]
    fn email_pattern() {
        assert!(is_valid_email("jane@example.com"));
        assert!(is_valid_email("a.b+c@sub.domain.org"));
        assert!(!is_valid_email("jane@example"));
        assert!(!is_valid_email("jane example@x.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("jane@@example.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn phone_pattern() {
        assert!(is_valid_phone("5551234567"));
        assert!(!is_valid_phone("555123456"));
        assert!(!is_valid_phone("55512345678"));
        assert!(!is_valid_phone("555-123-4567"));
        assert!(!is_valid_phone("555123456a"));
    }

    #[test]
    fn normalizes_email() {
        assert_eq!(normalize_email("  Jane@Example.COM "), "jane@example.com");
    }

    #[test]
    fn require_fields_lists_every_blank() {
        let err = require_fields(&[("pet_name", ""), ("breed", "Beagle"), ("phone", "  ")])
            .unwrap_err()
            .to_string();
        assert_eq!(err, "Missing required fields: pet_name, phone");
        assert!(require_fields(&[("breed", "Beagle")]).is_ok());
    }

    #[test]
    fn parses_iso_dates() {
        assert_eq!(parse_date("start_date", "2024-03-20").unwrap(), date!(2024 - 03 - 20));
        assert!(parse_date("start_date", "03/20/2024").is_err());
        assert!(parse_date("start_date", "2024-02-30").is_err());
    }

    #[test]
    fn availability_rules() {
        let mut a = Availability {
            days: vec![Weekday::Monday, Weekday::Friday],
            start_time: "08:00".into(),
            end_time: "17:30".into(),
        };
        assert!(check_availability(&a).is_ok());
        a.end_time = "07:00".into();
        assert!(check_availability(&a).is_err());
        a.end_time = "25:00".into();
        assert!(check_availability(&a).is_err());
    }

    #[test]
    fn length_limits_count_chars() {
        assert!(check_max_len("bio", Some(&"é".repeat(500)), MAX_BIO_LEN).is_ok());
        assert!(check_max_len("bio", Some(&"é".repeat(501)), MAX_BIO_LEN).is_err());
        assert!(check_max_len("bio", None, MAX_BIO_LEN).is_ok());
    }
}
