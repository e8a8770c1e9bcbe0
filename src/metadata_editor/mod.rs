//! Eliminación de metadata sensible de imágenes, documentos Office y PDFs.
//!
//! Cada formato se limpia sobre un archivo temporal junto al original; solo
//! si la verificación confirma la limpieza se reemplaza el original con un
//! `rename`.

pub(crate) mod constants;
mod image;
mod office;
mod pdf;
mod utils;

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{ForensicError, Result};
use crate::metadata::extract;
use crate::record::{FileRecord, FormatKind, keys};

pub use self::image::ImageSanitizer;
pub use office::OfficeSanitizer;
pub use pdf::PdfSanitizer;
pub use utils::generate_temp_filename;

/// Rutina de limpieza para una familia de formatos.
pub trait Sanitizer: Sync {
    fn family(&self) -> FormatKind;

    /// Escribe en `target` una copia de `source` sin metadata sensible.
    fn strip(&self, source: &Path, target: &Path) -> std::result::Result<(), String>;

    /// Cierto si el archivo ya no conserva la metadata que `strip` elimina.
    fn verify(&self, path: &Path) -> std::result::Result<bool, String>;
}

static IMAGE: ImageSanitizer = ImageSanitizer;
static OFFICE: OfficeSanitizer = OfficeSanitizer;
static PDF: PdfSanitizer = PdfSanitizer;

pub fn sanitizer_for(kind: FormatKind) -> Option<&'static dyn Sanitizer> {
    match kind {
        FormatKind::Image => Some(&IMAGE),
        FormatKind::OfficeDocument => Some(&OFFICE),
        FormatKind::PdfDocument => Some(&PDF),
        FormatKind::MediaFile | FormatKind::Unknown => None,
    }
}

/// Diferencia de campos entre el archivo original y el saneado.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizeOutcome {
    pub path: PathBuf,
    pub format_kind: FormatKind,
    pub removed_fields: Vec<String>,
    pub changed_fields: Vec<String>,
    pub remaining_fields: Vec<String>,
    pub geo_removed: bool,
}

impl SanitizeOutcome {
    fn between(before: &FileRecord, after: &FileRecord) -> Self {
        let mut removed_fields = Vec::new();
        let mut changed_fields = Vec::new();
        for (key, value) in &before.fields {
            match after.fields.get(key) {
                None => removed_fields.push(key.clone()),
                Some(current) if current != value => changed_fields.push(key.clone()),
                Some(_) => {}
            }
        }
        let remaining_fields = after
            .fields
            .keys()
            .filter(|key| !keys::STRUCTURE_KEYS.contains(&key.as_str()))
            .cloned()
            .collect();

        Self {
            path: before.path.clone(),
            format_kind: before.format_kind,
            removed_fields,
            changed_fields,
            remaining_fields,
            geo_removed: before.geo.is_some() && after.geo.is_none(),
        }
    }

    pub fn is_unchanged(&self) -> bool {
        self.removed_fields.is_empty() && self.changed_fields.is_empty() && !self.geo_removed
    }
}

/// Limpia `path` en el sitio: copia temporal, verificación y reemplazo atómico.
pub fn strip_in_place(sanitizer: &dyn Sanitizer, path: &Path) -> std::result::Result<(), String> {
    let temp_path = generate_temp_filename(path);

    if let Err(e) = sanitizer.strip(path, &temp_path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    let clean = sanitizer.verify(&temp_path).inspect_err(|_| {
        let _ = fs::remove_file(&temp_path);
    })?;
    if !clean {
        let _ = fs::remove_file(&temp_path);
        warn!(path = %path.display(), "la verificación encontró metadata tras la limpieza");
        return Err(
            "La verificación indicó que la metadata no se eliminó correctamente".to_string(),
        );
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        format!("No se pudo reemplazar el archivo original: {}", e)
    })
}

/// Sanea un archivo y devuelve qué campos desaparecieron o cambiaron.
pub fn sanitize_file(path: &Path) -> Result<SanitizeOutcome> {
    let failed = |message: String| ForensicError::Sanitize {
        path: path.to_path_buf(),
        message,
    };

    let before = extract(path)?;
    let sanitizer = sanitizer_for(before.format_kind).ok_or_else(|| {
        failed(format!(
            "No hay rutina de limpieza para {}",
            before.format_kind.label()
        ))
    })?;

    strip_in_place(sanitizer, path).map_err(failed)?;

    let after = extract(path)?;
    let outcome = SanitizeOutcome::between(&before, &after);
    info!(
        path = %path.display(),
        removed = outcome.removed_fields.len(),
        changed = outcome.changed_fields.len(),
        geo_removed = outcome.geo_removed,
        "metadata eliminada"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests;
