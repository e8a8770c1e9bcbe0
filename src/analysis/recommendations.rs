//! Recomendaciones derivadas de los hallazgos de un archivo.

use super::{Finding, FindingCategory};
use crate::record::keys;

/// A partir de esta cantidad de hallazgos de privacidad se sugiere sanear.
const PRIVACY_SANITIZE_THRESHOLD: usize = 5;

fn privacy_mentions(findings: &[Finding], key: &str) -> bool {
    findings.iter().any(|finding| {
        finding.category == FindingCategory::PrivacyConcern
            && finding.related_field_keys.contains(key)
    })
}

pub(super) fn recommend(findings: &[Finding]) -> Vec<String> {
    let mut advice = Vec::new();

    if privacy_mentions(findings, keys::GPS_POSITION) {
        advice.push("Eliminar las coordenadas GPS antes de compartir el archivo".to_string());
    }
    let authorship = privacy_mentions(findings, keys::AUTHOR)
        || privacy_mentions(findings, keys::LAST_MODIFIED_BY);
    if authorship {
        advice.push("Quitar la autoría del documento antes de distribuirlo".to_string());
    }
    if findings
        .iter()
        .any(|finding| finding.category == FindingCategory::TimestampAnomaly)
    {
        advice.push("Investigar una posible manipulación de las marcas de tiempo".to_string());
    }
    let privacy = findings
        .iter()
        .filter(|finding| finding.category == FindingCategory::PrivacyConcern)
        .count();
    if privacy > PRIVACY_SANITIZE_THRESHOLD {
        advice.push("Sanear la metadata con el subcomando `sanitize`".to_string());
    }

    if advice.is_empty() {
        advice.push("Sin problemas de privacidad críticos".to_string());
    }
    advice
}
