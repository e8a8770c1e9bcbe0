//! Saneamiento de paquetes OOXML (docx, xlsx, pptx): se reescriben las
//! entradas de `docProps/` y el resto del paquete se copia tal cual.

mod archive;
mod sanitize;
mod verify;
mod xml;

use std::path::Path;

use tracing::debug;

use super::Sanitizer;
use crate::record::FormatKind;

use archive::rewrite_package;
use sanitize::{sanitize_app_properties, sanitize_core_properties, sanitize_custom_properties};
use verify::verify_package_clean;

pub struct OfficeSanitizer;

impl Sanitizer for OfficeSanitizer {
    fn family(&self) -> FormatKind {
        FormatKind::OfficeDocument
    }

    fn strip(&self, source: &Path, target: &Path) -> Result<(), String> {
        let changed = rewrite_package(source, target, |name, contents| match name {
            "docProps/core.xml" => {
                sanitize_core_properties(contents).map_err(|e| format!("core.xml: {}", e))
            }
            "docProps/app.xml" => {
                sanitize_app_properties(contents).map_err(|e| format!("app.xml: {}", e))
            }
            "docProps/custom.xml" => Ok(sanitize_custom_properties(contents)),
            _ => Ok((contents, false)),
        })?;

        if !changed {
            debug!(path = %source.display(), "paquete Office sin propiedades sensibles");
        }
        Ok(())
    }

    fn verify(&self, path: &Path) -> Result<bool, String> {
        verify_package_clean(path)
    }
}
