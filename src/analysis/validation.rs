//! Invariantes que un `FileRecord` debe cumplir antes de analizarse.

use crate::error::AnalysisInputError;
use crate::geo;
use crate::record::{FieldValue, FileRecord, GeoPoint, keys};

const TEXT_KEYS: [&str; 12] = [
    keys::AUTHOR,
    keys::LAST_MODIFIED_BY,
    keys::ORGANIZATION,
    keys::MANAGER,
    keys::DEVICE_MAKE,
    keys::DEVICE_MODEL,
    keys::DEVICE_SERIAL,
    keys::SOFTWARE,
    keys::COMMENTS,
    keys::TITLE,
    keys::SUBJECT,
    keys::KEYWORDS,
];

const TIMESTAMP_KEYS: [&str; 4] = [
    keys::CAPTURED_AT,
    keys::DIGITIZED_AT,
    keys::EMBEDDED_CREATED_AT,
    keys::EMBEDDED_MODIFIED_AT,
];

fn expected_type(key: &str) -> Option<&'static str> {
    if TEXT_KEYS.contains(&key) {
        Some("text")
    } else if TIMESTAMP_KEYS.contains(&key) {
        Some("timestamp")
    } else if key == keys::GPS_POSITION {
        Some("coordinate")
    } else if keys::STRUCTURE_KEYS.contains(&key) {
        Some("number")
    } else {
        None
    }
}

/// Rechaza registros que el analizador no podría interpretar sin adivinar.
pub fn validate_record(record: &FileRecord) -> Result<(), AnalysisInputError> {
    for (key, value) in &record.fields {
        if let Some(expected) = expected_type(key)
            && value.type_name() != expected
        {
            return Err(AnalysisInputError::FieldType {
                key: key.clone(),
                expected,
                found: value.type_name(),
            });
        }
        match value {
            FieldValue::Number(number) if !number.is_finite() => {
                return Err(AnalysisInputError::NonFiniteNumber { key: key.clone() });
            }
            FieldValue::Coordinate(point) => check_point(point)?,
            _ => {}
        }
    }

    if let Some(point) = &record.geo {
        check_point(point)?;
    }
    // El espejo `gpsPosition` es opcional; solo un valor distinto es un conflicto.
    if let (Some(point), Some(FieldValue::Coordinate(mirror))) =
        (&record.geo, record.field(keys::GPS_POSITION))
        && point != mirror
    {
        return Err(AnalysisInputError::GeoMismatch);
    }

    check_hash("md5", &record.content_hashes.md5, 32)?;
    check_hash("sha256", &record.content_hashes.sha256, 64)?;

    if let Some(error) = record
        .partial_errors
        .iter()
        .find(|error| error.reason.trim().is_empty())
    {
        return Err(AnalysisInputError::EmptyPartialReason(error.group));
    }
    Ok(())
}

fn check_point(point: &GeoPoint) -> Result<(), AnalysisInputError> {
    let altitude_ok = point.altitude_meters.is_none_or(f64::is_finite);
    if geo::check_range(point.latitude_deg, point.longitude_deg).is_err() || !altitude_ok {
        return Err(AnalysisInputError::GeoOutOfRange {
            latitude: point.latitude_deg,
            longitude: point.longitude_deg,
        });
    }
    Ok(())
}

/// Un hash vacío significa que no se calculó; solo se rechaza el que está mal escrito.
fn check_hash(algorithm: &'static str, value: &str, len: usize) -> Result<(), AnalysisInputError> {
    let valid = value.is_empty()
        || value.len() == len
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if valid {
        Ok(())
    } else {
        Err(AnalysisInputError::MalformedHash {
            algorithm,
            value: value.to_string(),
        })
    }
}
