//! String normalization helpers for legacy-data reconciliation.
//!
//! Legacy exports spell the same zone or club in several variants
//! ("Zona 1", "zona  1", "ZONA-1"). Lookups during migration go through
//! [`normalize_key`] so all variants resolve to the same entry.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NON_ALNUM: Regex = Regex::new(r"[^a-z0-9]+").expect("static regex");
    static ref NON_PHONE: Regex = Regex::new(r"[^0-9+]").expect("static regex");
}

/// Canonicalizes a lookup key: lowercase, accents folded, punctuation and
/// whitespace collapsed to single separators, trimmed.
pub fn normalize_key(raw: &str) -> String {
    let lowered: String = raw
        .to_lowercase()
        .chars()
        .map(fold_accent)
        .collect();
    NON_ALNUM
        .replace_all(&lowered, " ")
        .trim()
        .replace(' ', "_")
}

fn fold_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ä' => 'a',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ò' | 'ó' | 'ô' | 'ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        other => other,
    }
}

/// Trims surrounding whitespace; empty input stays empty.
pub fn clean_string(raw: &str) -> String {
    raw.trim().to_string()
}

/// Normalizes an email for storage: trimmed and lowercased. Empty input is
/// passed through unchanged; syntax validation is the caller's concern.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Strips everything but digits and a leading plus sign from a phone number.
pub fn strip_phone(raw: &str) -> String {
    let stripped = NON_PHONE.replace_all(raw.trim(), "").to_string();
    match stripped.find('+') {
        // A plus is only meaningful as an international prefix.
        Some(0) => {
            let rest: String = stripped[1..].chars().filter(|c| c.is_ascii_digit()).collect();
            format!("+{}", rest)
        }
        _ => stripped.chars().filter(|c| c.is_ascii_digit()).collect(),
    }
}

/// Parses a timestamp from the formats seen in legacy exports, falling back
/// to `now` when nothing matches.
pub fn parse_datetime_or(raw: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return now;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return parsed.with_timezone(&Utc);
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Utc.from_utc_datetime(&parsed);
    }
    for fmt in ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"] {
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, fmt) {
            if let Some(dt) = parsed.and_hms_opt(0, 0, 0) {
                return Utc.from_utc_datetime(&dt);
            }
        }
    }
    now
}

/// Parses a date, falling back to the date part of `now`.
pub fn parse_date_or(raw: &str, now: DateTime<Utc>) -> NaiveDate {
    parse_datetime_or(raw, now).date_naive()
}

/// Resolves an email collision by appending an incrementing numeric suffix
/// before the `@` until the address is unused. Returns the input unchanged
/// when it is free or empty.
pub fn resolve_email_collision(email: &str, taken: &HashSet<String>) -> String {
    if email.is_empty() || !taken.contains(email) {
        return email.to_string();
    }
    let (local, domain) = match email.split_once('@') {
        Some(parts) => parts,
        None => return email.to_string(),
    };
    let mut suffix = 1u32;
    loop {
        let candidate = format!("{}{}@{}", local, suffix, domain);
        if !taken.contains(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_key_variants_collapse() {
        assert_eq!(normalize_key("Zona 1"), "zona_1");
        assert_eq!(normalize_key("zona  1"), "zona_1");
        assert_eq!(normalize_key("ZONA-1"), "zona_1");
        assert_eq!(normalize_key("  Zona 1  "), "zona_1");
    }

    #[test]
    fn test_normalize_key_folds_accents() {
        assert_eq!(normalize_key("Società Golf"), "societa_golf");
        assert_eq!(normalize_key("Comitè"), "comite");
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Mario.Rossi@Golf.IT "), "mario.rossi@golf.it");
        assert_eq!(normalize_email(""), "");
    }

    #[test]
    fn test_strip_phone() {
        assert_eq!(strip_phone("+39 06 123-456"), "+3906123456");
        assert_eq!(strip_phone("(06) 123.456"), "06123456");
        assert_eq!(strip_phone("tel: 333 1234567"), "3331234567");
        assert_eq!(strip_phone(""), "");
    }

    #[test]
    fn test_parse_datetime_known_formats() {
        let now = Utc::now();
        let parsed = parse_datetime_or("2023-05-17 09:30:00", now);
        assert_eq!(parsed.date_naive(), NaiveDate::from_ymd_opt(2023, 5, 17).unwrap());
        let parsed = parse_datetime_or("17/05/2023", now);
        assert_eq!(parsed.date_naive(), NaiveDate::from_ymd_opt(2023, 5, 17).unwrap());
    }

    #[test]
    fn test_parse_datetime_falls_back_to_now() {
        let now = Utc::now();
        assert_eq!(parse_datetime_or("next tuesday", now), now);
        assert_eq!(parse_datetime_or("", now), now);
    }

    #[test]
    fn test_email_collision_suffix() {
        let mut taken = HashSet::new();
        taken.insert("a@b.com".to_string());
        assert_eq!(resolve_email_collision("a@b.com", &taken), "a1@b.com");

        taken.insert("a1@b.com".to_string());
        assert_eq!(resolve_email_collision("a@b.com", &taken), "a2@b.com");
    }

    #[test]
    fn test_email_no_collision_unchanged() {
        let taken = HashSet::new();
        assert_eq!(resolve_email_collision("a@b.com", &taken), "a@b.com");
        assert_eq!(resolve_email_collision("", &taken), "");
    }
}
