use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

use xmltree::{Element, XMLNode};
use zip::ZipArchive;
use zip::result::ZipError;

use crate::metadata_editor::constants::{
    APP_SANITIZE_FIELDS, CORE_SANITIZE_FIELDS, CUSTOM_PROPERTIES_EMPTY, PropertyUpdate,
};

use super::xml::{FieldSpec, app_field_spec, core_field_spec, element_text_content, update_applied};

/// Comprueba que un paquete saneado ya no conserva las propiedades sensibles.
pub(crate) fn verify_package_clean(path: &Path) -> Result<bool, String> {
    let file = File::open(path)
        .map_err(|e| format!("No se pudo abrir archivo limpio para verificación: {}", e))?;
    let mut archive =
        ZipArchive::new(file).map_err(|e| format!("No es un documento Office válido: {}", e))?;

    let core_clean = match read_entry(&mut archive, "docProps/core.xml")? {
        Some(contents) => updates_applied(&contents, &CORE_SANITIZE_FIELDS, core_field_spec)?,
        None => true,
    };
    let app_clean = match read_entry(&mut archive, "docProps/app.xml")? {
        Some(contents) => updates_applied(&contents, &APP_SANITIZE_FIELDS, app_field_spec)?,
        None => true,
    };
    let custom_clean = match read_entry(&mut archive, "docProps/custom.xml")? {
        Some(contents) => custom_properties_empty(&contents)?,
        None => true,
    };

    Ok(core_clean && app_clean && custom_clean)
}

fn read_entry(archive: &mut ZipArchive<File>, name: &str) -> Result<Option<Vec<u8>>, String> {
    match archive.by_name(name) {
        Ok(mut entry) => {
            let mut contents = Vec::new();
            entry
                .read_to_end(&mut contents)
                .map_err(|e| format!("No se pudo leer {} durante la verificación: {}", name, e))?;
            Ok(Some(contents))
        }
        Err(ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(format!(
            "No se pudo acceder a {} durante la verificación: {}",
            name, e
        )),
    }
}

fn updates_applied(
    contents: &[u8],
    updates: &[(&'static str, PropertyUpdate)],
    lookup: fn(&'static str) -> Option<FieldSpec<'static>>,
) -> Result<bool, String> {
    let root = Element::parse(Cursor::new(contents)).map_err(|e| {
        format!(
            "Error leyendo XML de metadata durante la verificación: {}",
            e
        )
    })?;

    Ok(updates.iter().all(|&(tag, update)| {
        lookup(tag).is_none_or(|spec| update_applied(&root, spec, update))
    }))
}

fn custom_properties_empty(contents: &[u8]) -> Result<bool, String> {
    if contents == CUSTOM_PROPERTIES_EMPTY.as_bytes() {
        return Ok(true);
    }

    let root = Element::parse(Cursor::new(contents))
        .map_err(|e| format!("Error leyendo custom.xml durante la verificación: {}", e))?;

    let has_property_elements = root
        .children
        .iter()
        .any(|node| matches!(node, XMLNode::Element(_)));

    Ok(!has_property_elements && element_text_content(&root).is_empty())
}
