//! Coherencia entre marcas de tiempo del sistema de archivos y embebidas.

use chrono::{DateTime, Duration, Utc};

use super::peers::{PeerTimestamps, TimestampTriple};
use super::{Finding, FindingCategory, Severity};
use crate::config::AnalyzerConfig;
use crate::record::{FileRecord, keys};

fn stamp(value: DateTime<Utc>) -> String {
    value.format("%Y-%m-%d %H:%M:%S%.f UTC").to_string()
}

fn anomaly(severity: Severity, message: String, related: [&str; 2]) -> Finding {
    Finding::new(FindingCategory::TimestampAnomaly, severity, message, related)
}

pub(super) fn check(
    record: &FileRecord,
    peers: Option<&PeerTimestamps>,
    config: &AnalyzerConfig,
    findings: &mut Vec<Finding>,
) {
    let fs = &record.timestamps;

    if let (Some(created), Some(accessed)) = (fs.created_at, fs.accessed_at)
        && accessed < created
    {
        findings.push(anomaly(
            Severity::Critical,
            format!(
                "El último acceso ({}) es anterior a la creación ({})",
                stamp(accessed),
                stamp(created)
            ),
            [keys::FS_ACCESSED_AT, keys::FS_CREATED_AT],
        ));
    }

    if let (Some(created), Some(modified)) = (fs.created_at, fs.modified_at)
        && modified < created
    {
        findings.push(anomaly(
            Severity::Critical,
            format!(
                "La última modificación ({}) es anterior a la creación ({})",
                stamp(modified),
                stamp(created)
            ),
            [keys::FS_MODIFIED_AT, keys::FS_CREATED_AT],
        ));
    }

    let embedded_created = [keys::EMBEDDED_CREATED_AT, keys::CAPTURED_AT]
        .into_iter()
        .find_map(|key| record.timestamp(key).map(|value| (key, value)));

    if let Some((created_key, created)) = embedded_created
        && let Some(modified) = record.timestamp(keys::EMBEDDED_MODIFIED_AT)
        && modified < created
    {
        findings.push(anomaly(
            Severity::Critical,
            format!(
                "La fecha de modificación embebida ({}) es anterior a la de creación ({})",
                stamp(modified),
                stamp(created)
            ),
            [keys::EMBEDDED_MODIFIED_AT, created_key],
        ));
    }

    let tolerance =
        Duration::try_hours(config.embedded_skew_tolerance_hours).unwrap_or(Duration::MAX);
    if let Some((created_key, created)) = embedded_created
        && let Some(modified) = fs.modified_at
        && created - modified > tolerance
    {
        findings.push(anomaly(
            Severity::Medium,
            format!(
                "La creación embebida ({}) es posterior a la modificación en disco ({})",
                stamp(created),
                stamp(modified)
            ),
            [created_key, keys::FS_MODIFIED_AT],
        ));
    }

    let triple = TimestampTriple::from(fs);
    if let Some(peers) = peers
        && triple.is_synchronized()
    {
        let sharing = peers.count(fs);
        if sharing >= config.synchronized_min_files {
            let related = [
                (fs.created_at, keys::FS_CREATED_AT),
                (fs.modified_at, keys::FS_MODIFIED_AT),
                (fs.accessed_at, keys::FS_ACCESSED_AT),
            ]
            .into_iter()
            .filter_map(|(value, key)| value.map(|_| key));
            findings.push(Finding::new(
                FindingCategory::TimestampAnomaly,
                Severity::Medium,
                format!(
                    "{sharing} archivos del lote comparten marcas de tiempo idénticas; \
                     posible copia masiva o restablecimiento"
                ),
                related,
            ));
        }
    }
}
