mod common;

use common::{
    TestResult, write_flac_with_vorbis, write_mp3_with_id3, write_mp4_with_location,
    write_mp4_with_oversized_box, write_wav_with_info,
};
use filelens_forense::record::keys;
use filelens_forense::{
    FieldGroup, FieldValue, FindingCategory, FormatKind, Severity, analyze, extract,
};
use tempfile::tempdir;

#[test]
fn mp3_id3_tags() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("entrevista.mp3");
    write_mp3_with_id3(&path)?;

    let record = extract(&path)?;

    assert_eq!(record.format_kind, FormatKind::MediaFile);
    assert_eq!(record.format_subtype.as_deref(), Some("mp3"));
    assert_eq!(record.text(keys::TITLE), Some("Entrevista"));
    assert_eq!(record.text("media.tag.artist"), Some("Ana Ruiz"));
    assert!(record.partial_errors.is_empty(), "{:?}", record.partial_errors);

    let result = analyze(&record, None)?;
    assert_eq!(result.count(FindingCategory::MissingMetadata), 0);
    Ok(())
}

#[test]
fn mp4_location_and_dates() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("clip.mp4");
    write_mp4_with_location(&path)?;

    let record = extract(&path)?;

    assert_eq!(record.format_kind, FormatKind::MediaFile);
    assert_eq!(record.format_subtype.as_deref(), Some("mp4"));
    let created = record
        .timestamp(keys::EMBEDDED_CREATED_AT)
        .ok_or("sin fecha de creación")?;
    assert_eq!(created.to_rfc3339(), "2020-01-01T00:00:00+00:00");
    assert_eq!(
        record.field(keys::DURATION_SECONDS).and_then(FieldValue::as_number),
        Some(5.0)
    );
    assert_eq!(record.text(keys::DEVICE_MAKE), Some("Apple"));

    let geo = record.geo.ok_or("sin posición ©xyz")?;
    assert!((geo.latitude_deg - 40.7488).abs() < 1e-9);
    assert!((geo.longitude_deg + 73.9837).abs() < 1e-9);
    assert!(record.partial_errors.is_empty(), "{:?}", record.partial_errors);

    let result = analyze(&record, None)?;
    assert_eq!(result.risk_level, Severity::High);
    assert!(result.findings.iter().any(|finding| {
        finding.category == FindingCategory::PrivacyConcern
            && finding.related_field_keys.contains(keys::GPS_POSITION)
    }));
    Ok(())
}

#[test]
fn mp4_with_impossible_box_size_finishes_with_partial_error() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("danado.mp4");
    write_mp4_with_oversized_box(&path)?;

    let record = extract(&path)?;

    assert_eq!(record.format_kind, FormatKind::MediaFile);
    assert!(record.partial_error(FieldGroup::Container).is_some());
    assert!(record.timestamps.modified_at.is_some());
    assert!(analyze(&record, None).is_ok());
    Ok(())
}

#[test]
fn wav_info_list() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("toma.wav");
    write_wav_with_info(&path)?;

    let record = extract(&path)?;

    assert_eq!(record.format_subtype.as_deref(), Some("wav"));
    assert_eq!(record.text(keys::TITLE), Some("Entrevista"));
    assert_eq!(record.text("media.tag.artist"), Some("Ana Ruiz"));
    assert_eq!(record.text(keys::SOFTWARE), Some("Audacity"));
    assert_eq!(
        record.field("media.sampleRateHz").and_then(FieldValue::as_number),
        Some(8000.0)
    );
    assert_eq!(
        record.field(keys::DURATION_SECONDS).and_then(FieldValue::as_number),
        Some(1.0)
    );
    assert!(record.partial_errors.is_empty(), "{:?}", record.partial_errors);
    Ok(())
}

#[test]
fn flac_vorbis_comments() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("ensayo.flac");
    write_flac_with_vorbis(
        &path,
        &[
            "TITLE=Ensayo general",
            "ORGANIZATION=Conservatorio Municipal",
            "DATE=2022-05-06T10:00:00Z",
        ],
    )?;

    let record = extract(&path)?;

    assert_eq!(record.format_subtype.as_deref(), Some("flac"));
    assert_eq!(record.text(keys::TITLE), Some("Ensayo general"));
    assert_eq!(record.text(keys::ORGANIZATION), Some("Conservatorio Municipal"));
    assert_eq!(record.text("media.encoder"), Some("reference libFLAC 1.4.3"));
    assert_eq!(
        record.field(keys::DURATION_SECONDS).and_then(FieldValue::as_number),
        Some(10.0)
    );
    assert_eq!(
        record.field("media.channels").and_then(FieldValue::as_number),
        Some(2.0)
    );
    assert!(record.timestamp(keys::EMBEDDED_CREATED_AT).is_some());

    let result = analyze(&record, None)?;
    assert!(result.findings.iter().any(|finding| {
        finding.category == FindingCategory::PrivacyConcern
            && finding.related_field_keys.contains(keys::ORGANIZATION)
    }));
    Ok(())
}
