use super::{Finding, FindingCategory, Severity};
use crate::config::AnalyzerConfig;
use crate::record::{FileRecord, keys};

pub(super) fn check(record: &FileRecord, config: &AnalyzerConfig, findings: &mut Vec<Finding>) {
    let Some(altitude) = record.position().and_then(|point| point.altitude_meters) else {
        return;
    };
    if altitude < config.altitude_min_m || altitude > config.altitude_max_m {
        findings.push(Finding::new(
            FindingCategory::LocationAnomaly,
            Severity::Medium,
            format!(
                "Altitud inverosímil: {altitude:.1} m (rango aceptado {:.0} m a {:.0} m)",
                config.altitude_min_m, config.altitude_max_m
            ),
            [keys::GPS_POSITION],
        ));
    }
}
