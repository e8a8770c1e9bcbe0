//! Campos que exponen personas, organizaciones, dispositivos o lugares.

use super::{Finding, FindingCategory, Severity};
use crate::record::{FileRecord, keys};

const IDENTITY_FIELDS: [(&str, &str); 7] = [
    (keys::AUTHOR, "Autor"),
    (keys::LAST_MODIFIED_BY, "Último editor"),
    (keys::ORGANIZATION, "Organización"),
    (keys::MANAGER, "Responsable"),
    (keys::DEVICE_MAKE, "Fabricante del dispositivo"),
    (keys::DEVICE_MODEL, "Modelo del dispositivo"),
    (keys::DEVICE_SERIAL, "Número de serie del dispositivo"),
];

fn non_blank<'a>(record: &'a FileRecord, key: &str) -> Option<&'a str> {
    record
        .text(key)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

pub(super) fn check(record: &FileRecord, findings: &mut Vec<Finding>) {
    if let Some(point) = record.position() {
        findings.push(Finding::new(
            FindingCategory::PrivacyConcern,
            Severity::High,
            format!("Coordenadas GPS embebidas: {point}"),
            [keys::GPS_POSITION],
        ));
    }

    for (key, label) in IDENTITY_FIELDS {
        if let Some(value) = non_blank(record, key) {
            findings.push(Finding::new(
                FindingCategory::PrivacyConcern,
                Severity::Medium,
                format!("{label} presente: {value}"),
                [key],
            ));
        }
    }

    if non_blank(record, keys::COMMENTS).is_some() {
        findings.push(Finding::new(
            FindingCategory::PrivacyConcern,
            Severity::High,
            "Comentarios embebidos que pueden contener información sensible",
            [keys::COMMENTS],
        ));
    }

    if let Some(software) = non_blank(record, keys::SOFTWARE) {
        findings.push(Finding::new(
            FindingCategory::PrivacyConcern,
            Severity::Low,
            format!("Software de origen registrado: {software}"),
            [keys::SOFTWARE],
        ));
    }
}
