use chrono::{DateTime, Utc};

use crate::error::CleanupError;
use crate::models::instance::Instance;

/// TTL in minutes declared through the `ttl` metadata entry.
///
/// Returns `None` when the entry is missing or is not a non-negative base-10 integer;
/// such instances are permanent. Whitespace is not trimmed, so `"30 "` is malformed.
pub fn ttl_minutes(instance: &Instance) -> Option<i64> {
    let raw = instance.ttl_value()?;
    match raw.parse::<i64>() {
        Ok(ttl) if ttl >= 0 => Some(ttl),
        _ => {
            tracing::debug!(
                instance = %instance.name,
                zone = %instance.zone,
                ttl = %raw,
                "Ignoring malformed TTL metadata"
            );
            None
        }
    }
}

/// Whole minutes elapsed between `created` and `now`, rounded down.
pub fn age_minutes(created: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    now.signed_duration_since(created)
        .num_seconds()
        .div_euclid(60)
}

pub fn parse_creation_timestamp(instance: &Instance) -> Result<DateTime<Utc>, CleanupError> {
    DateTime::parse_from_rfc3339(&instance.creation_timestamp)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| CleanupError::DataIntegrity {
            project: String::new(),
            zone: instance.zone.clone(),
            instance: instance.name.clone(),
            value: instance.creation_timestamp.clone(),
            message: e.to_string(),
        })
}

/// Whether `instance` has outlived its declared TTL at `now`.
///
/// An instance exactly at its TTL is not yet due. The creation timestamp is only parsed
/// for instances that declare a usable TTL; a bad timestamp there is the one error case.
/// The returned error leaves `project` empty for the caller to fill in.
pub fn is_due_for_cleanup(instance: &Instance, now: DateTime<Utc>) -> Result<bool, CleanupError> {
    match ttl_minutes(instance) {
        Some(ttl) => is_past_ttl(instance, ttl, now),
        None => Ok(false),
    }
}

/// Age check for an instance whose TTL has already been read with [`ttl_minutes`].
pub fn is_past_ttl(instance: &Instance, ttl: i64, now: DateTime<Utc>) -> Result<bool, CleanupError> {
    let created = parse_creation_timestamp(instance)?;
    let age = age_minutes(created, now);
    let due = ttl < age;

    tracing::debug!(
        instance = %instance.name,
        zone = %instance.zone,
        age_minutes = age,
        ttl_minutes = ttl,
        due,
        "Classified instance"
    );

    Ok(due)
}
