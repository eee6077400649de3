//! Input validation helpers
//!
//! Payload structs carry `validator` rules for shape and length; the domain
//! checks that need more than a field attribute (slugs, operating hours,
//! feature flags, card tokens, prices) live here.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode, FieldError};
use shared::models::{
    DayHours, HOURS_DAY_KEYS, LOCATION_FEATURES, LocationInput, OperatingHours, TranslationInput,
};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

// ── Limits ──────────────────────────────────────────────────────────

pub const MIN_SLUG_LEN: usize = 3;
pub const MAX_SLUG_LEN: usize = 50;

/// Subdomains that can never be a restaurant slug
pub const RESERVED_SLUGS: [&str; 4] = ["www", "api", "admin", "app"];

/// NUMERIC(10,2) upper bound
const MAX_PRICE_CENTS: i64 = 99_999_999_99;

/// Confirmation tokens and other opaque identifiers
pub const MAX_TOKEN_LEN: usize = 128;

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("valid slug regex"));
static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]$").expect("valid time regex"));

// ── validator integration ───────────────────────────────────────────

fn collect_field_errors(prefix: &str, errors: &ValidationErrors, out: &mut Vec<FieldError>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(errs) => {
                for err in errs {
                    let message = match &err.message {
                        Some(msg) => msg.to_string(),
                        None => describe_rule(err),
                    };
                    out.push(FieldError::new(path.clone(), message));
                }
            }
            ValidationErrorsKind::Struct(inner) => collect_field_errors(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_field_errors(&format!("{path}[{index}]"), inner, out);
                }
            }
        }
    }
}

fn describe_rule(err: &validator::ValidationError) -> String {
    let bound = |name: &str| err.params.get(name).map(|v| v.to_string());
    match err.code.as_ref() {
        "length" => match (bound("min"), bound("max"), bound("equal")) {
            (_, _, Some(eq)) => format!("must be exactly {eq} characters"),
            (Some(min), Some(max), _) => format!("length must be between {min} and {max}"),
            (Some(min), None, _) => format!("must be at least {min} characters"),
            (None, Some(max), _) => format!("must be at most {max} characters"),
            _ => "invalid length".to_string(),
        },
        "range" => match (bound("min"), bound("max")) {
            (Some(min), Some(max)) => format!("must be between {min} and {max}"),
            _ => "value out of range".to_string(),
        },
        "email" => "must be a valid email address".to_string(),
        other => format!("failed {other} check"),
    }
}

/// Run `validator` rules, flattening nested errors into dotted field paths
pub fn validate_payload<T: Validate>(payload: &T) -> Result<(), AppError> {
    payload.validate().map_err(|errors| {
        let mut fields = Vec::new();
        collect_field_errors("", &errors, &mut fields);
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        AppError::validation_fields(fields)
    })
}

// ── Tenancy ─────────────────────────────────────────────────────────

/// Why `slug` cannot be used, if anything
pub fn slug_problem(slug: &str) -> Option<&'static str> {
    if slug.len() < MIN_SLUG_LEN {
        return Some("URL must be at least 3 characters");
    }
    if slug.len() > MAX_SLUG_LEN {
        return Some("URL must be at most 50 characters");
    }
    if !SLUG_RE.is_match(slug) {
        return Some("URL may only contain lowercase letters, numbers and single hyphens");
    }
    if RESERVED_SLUGS.contains(&slug) {
        return Some("This URL is reserved");
    }
    None
}

pub fn validate_slug(slug: &str) -> Result<(), AppError> {
    match slug_problem(slug) {
        None => Ok(()),
        Some(reason) => Err(AppError::with_message(ErrorCode::RestaurantUrlInvalid, reason)
            .with_detail("url_slug", slug)),
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

// ── Locations ───────────────────────────────────────────────────────

/// Check day keys and times; returns the full week with missing days closed
pub fn validate_operating_hours(hours: &OperatingHours) -> Result<OperatingHours, AppError> {
    let invalid = |day: &str, msg: String| {
        AppError::with_message(ErrorCode::InvalidOperatingHours, msg).with_detail("day", day)
    };

    for (day, window) in hours {
        if !HOURS_DAY_KEYS.contains(&day.as_str()) {
            return Err(invalid(day, format!("Unknown day: {day}")));
        }
        if window.closed {
            continue;
        }
        for (label, value) in [("open", &window.open), ("close", &window.close)] {
            match value {
                Some(t) if TIME_RE.is_match(t) => {}
                Some(t) => {
                    return Err(invalid(day, format!("{day}.{label} must be HH:MM, got {t}")));
                }
                None => return Err(invalid(day, format!("{day}.{label} is required"))),
            }
        }
    }

    let mut normalized = OperatingHours::new();
    for day in HOURS_DAY_KEYS {
        let window = match hours.get(day) {
            Some(w) if w.closed => DayHours::closed(),
            Some(w) => w.clone(),
            None => DayHours::closed(),
        };
        normalized.insert(day.to_string(), window);
    }
    Ok(normalized)
}

/// Check against the catalogue; duplicates are dropped
pub fn validate_features(features: &[String]) -> Result<Vec<String>, AppError> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(features.len());
    for feature in features {
        if !LOCATION_FEATURES.contains(&feature.as_str()) {
            return Err(AppError::with_message(
                ErrorCode::UnknownFeature,
                format!("Unknown feature: {feature}"),
            )
            .with_detail("feature", feature.clone()));
        }
        if seen.insert(feature.as_str()) {
            out.push(feature.clone());
        }
    }
    Ok(out)
}

/// Exactly one primary: more than one flagged is an error, none flags the first
pub fn normalize_primary_location(locations: &mut [LocationInput]) -> Result<usize, AppError> {
    let flagged: Vec<usize> = locations
        .iter()
        .enumerate()
        .filter(|(_, l)| l.is_primary)
        .map(|(i, _)| i)
        .collect();
    match flagged.as_slice() {
        [] => {
            let first = locations
                .first_mut()
                .ok_or_else(|| AppError::new(ErrorCode::PrimaryLocationRequired))?;
            first.is_primary = true;
            Ok(0)
        }
        [index] => Ok(*index),
        _ => Err(AppError::validation("Only one location can be primary")),
    }
}

// ── Payments ────────────────────────────────────────────────────────

/// 13-19 digits once spaces and dashes are removed
pub fn looks_like_card_number(value: &str) -> bool {
    let digits: String = value.chars().filter(|c| *c != ' ' && *c != '-').collect();
    (13..=19).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}

pub fn validate_card_token(token: &str) -> Result<(), AppError> {
    if looks_like_card_number(token) {
        return Err(AppError::new(ErrorCode::RawCardNumberRejected));
    }
    Ok(())
}

// ── Menu ────────────────────────────────────────────────────────────

pub fn validate_price(price: Decimal) -> Result<(), AppError> {
    let max = Decimal::new(MAX_PRICE_CENTS, 2);
    if price.is_sign_negative() || price > max || price.normalize().scale() > 2 {
        return Err(AppError::new(ErrorCode::MenuItemInvalidPrice)
            .with_detail("base_price", price.to_string()));
    }
    Ok(())
}

/// One translation per language code
pub fn validate_translations(translations: &[TranslationInput]) -> Result<(), AppError> {
    let mut seen = HashSet::new();
    for t in translations {
        if !seen.insert(t.language_code.to_ascii_lowercase()) {
            return Err(AppError::new(ErrorCode::DuplicateTranslation)
                .with_detail("language_code", t.language_code.clone()));
        }
    }
    Ok(())
}
