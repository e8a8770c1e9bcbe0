//! Saneamiento de PDFs: elimina el diccionario Info y el flujo XMP del catálogo.

use std::path::Path;

use lopdf::{Document, Object};

use super::Sanitizer;
use crate::record::FormatKind;

pub struct PdfSanitizer;

fn catalog_has_metadata(doc: &Document) -> bool {
    doc.catalog()
        .map(|catalog| catalog.has(b"Metadata"))
        .unwrap_or(false)
}

impl Sanitizer for PdfSanitizer {
    fn family(&self) -> FormatKind {
        FormatKind::PdfDocument
    }

    fn strip(&self, source: &Path, target: &Path) -> Result<(), String> {
        let mut doc =
            Document::load(source).map_err(|e| format!("No se pudo abrir el PDF: {}", e))?;
        if doc.trailer.has(b"Encrypt") {
            return Err("El PDF está cifrado; no se modifica".to_string());
        }

        doc.trailer.remove(b"Info");
        let root = doc
            .trailer
            .get(b"Root")
            .and_then(Object::as_reference)
            .map_err(|e| format!("PDF sin catálogo: {}", e))?;
        if let Ok(catalog) = doc.get_object_mut(root).and_then(Object::as_dict_mut) {
            catalog.remove(b"Metadata");
        }
        doc.prune_objects();

        doc.save(target)
            .map(|_| ())
            .map_err(|e| format!("No se pudo guardar el PDF limpio: {}", e))
    }

    fn verify(&self, path: &Path) -> Result<bool, String> {
        let doc = Document::load(path)
            .map_err(|e| format!("No se pudo abrir el PDF limpio para verificación: {}", e))?;
        Ok(!doc.trailer.has(b"Info") && !catalog_has_metadata(&doc))
    }
}
