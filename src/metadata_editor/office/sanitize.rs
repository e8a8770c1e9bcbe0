use std::io::Cursor;

use xmltree::Element;

use crate::metadata_editor::constants::{
    APP_SANITIZE_FIELDS, CORE_SANITIZE_FIELDS, CUSTOM_PROPERTIES_EMPTY, PropertyUpdate,
};

use super::xml::{FieldSpec, app_field_spec, apply_update, core_field_spec};

/// Quita autoría, fechas y descripciones de `core.xml`.
pub(crate) fn sanitize_core_properties(contents: Vec<u8>) -> Result<(Vec<u8>, bool), String> {
    apply_xml_updates(contents, &CORE_SANITIZE_FIELDS, core_field_spec)
}

/// Quita aplicación, empresa y responsable de `app.xml`.
pub(crate) fn sanitize_app_properties(contents: Vec<u8>) -> Result<(Vec<u8>, bool), String> {
    apply_xml_updates(contents, &APP_SANITIZE_FIELDS, app_field_spec)
}

/// Reemplaza el XML de propiedades personalizadas por una plantilla vacía.
pub(crate) fn sanitize_custom_properties(contents: Vec<u8>) -> (Vec<u8>, bool) {
    let sanitized = CUSTOM_PROPERTIES_EMPTY.as_bytes().to_vec();
    let modified = contents != sanitized;
    (sanitized, modified)
}

fn apply_xml_updates(
    contents: Vec<u8>,
    updates: &[(&'static str, PropertyUpdate)],
    lookup: fn(&'static str) -> Option<FieldSpec<'static>>,
) -> Result<(Vec<u8>, bool), String> {
    let mut root = Element::parse(Cursor::new(&contents[..]))
        .map_err(|e| format!("Error leyendo XML de metadata: {}", e))?;

    let mut modified = false;
    for &(tag, update) in updates {
        if let Some(spec) = lookup(tag) {
            modified |= apply_update(&mut root, spec, update);
        }
    }

    if !modified {
        return Ok((contents, false));
    }

    let mut output = Vec::new();
    let mut config = xmltree::EmitterConfig::new();
    config.perform_indent = false;
    config.write_document_declaration = true;
    root.write_with_config(&mut output, config)
        .map_err(|e| format!("Error escribiendo XML sanitizado: {}", e))?;

    Ok((output, true))
}
