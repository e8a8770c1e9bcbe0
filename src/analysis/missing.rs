//! Metadata que el formato suele traer y no aparece.

use std::collections::BTreeSet;

use super::{Finding, FindingCategory, Severity};
use crate::record::{FieldGroup, FileRecord, FormatKind};

const CAMERA: &[FieldGroup] = &[FieldGroup::CaptureTime, FieldGroup::Device];
const DOCUMENT: &[FieldGroup] = &[FieldGroup::Descriptive, FieldGroup::EmbeddedDates];

/// Grupos que un archivo lleva normalmente. Manda el subtipo; si no hay
/// entrada para él, decide la familia. GIF y BMP no admiten EXIF.
pub fn expected_groups(kind: FormatKind, subtype: Option<&str>) -> &'static [FieldGroup] {
    match subtype {
        Some("jpeg" | "tiff" | "heif" | "heic") => CAMERA,
        Some("gif" | "bmp") => &[],
        Some("pdf" | "docx" | "xlsx" | "pptx") => DOCUMENT,
        Some("mp4" | "mov" | "m4a") => &[FieldGroup::EmbeddedDates],
        Some("mp3") => &[FieldGroup::MediaTags],
        _ => match kind {
            FormatKind::Image => CAMERA,
            FormatKind::PdfDocument | FormatKind::OfficeDocument => DOCUMENT,
            FormatKind::MediaFile | FormatKind::Unknown => &[],
        },
    }
}

pub(super) fn check(record: &FileRecord, findings: &mut Vec<Finding>) {
    if record.size_bytes == 0 {
        findings.push(Finding::new(
            FindingCategory::MissingMetadata,
            Severity::Medium,
            "Archivo vacío (0 bytes): posible borrado de datos o archivo marcador",
            std::iter::empty::<&str>(),
        ));
        return;
    }

    let subtype = record.format_subtype.as_deref();
    let expected = expected_groups(record.format_kind, subtype);
    let mut reported: BTreeSet<FieldGroup> = BTreeSet::new();

    if !expected.is_empty() && !record.has_embedded_metadata() {
        let related = expected
            .iter()
            .flat_map(|group| group.reserved_keys().iter().copied());
        findings.push(Finding::new(
            FindingCategory::MissingMetadata,
            Severity::Medium,
            format!(
                "El archivo {} no contiene metadata embebida; posible saneamiento previo",
                subtype.unwrap_or(record.format_kind.label())
            ),
            related,
        ));
    } else {
        for &group in expected {
            if record.group_present(group) {
                continue;
            }
            let message = match record.partial_error(group) {
                Some(error) => format!("Grupo `{group}` ilegible: {}", error.reason),
                None => format!("Grupo `{group}` ausente"),
            };
            findings.push(Finding::new(
                FindingCategory::MissingMetadata,
                Severity::Low,
                message,
                group.reserved_keys().iter().copied(),
            ));
            reported.insert(group);
        }
    }

    for error in &record.partial_errors {
        if !reported.insert(error.group) {
            continue;
        }
        findings.push(Finding::new(
            FindingCategory::MissingMetadata,
            Severity::Low,
            format!("Grupo `{}` ilegible: {}", error.group, error.reason),
            error.group.reserved_keys().iter().copied(),
        ));
    }
}
