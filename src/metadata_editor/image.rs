//! Saneamiento de imágenes: se decodifican y se vuelven a codificar sin EXIF.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use image::ImageReader;

use super::Sanitizer;
use crate::record::FormatKind;

pub struct ImageSanitizer;

impl Sanitizer for ImageSanitizer {
    fn family(&self) -> FormatKind {
        FormatKind::Image
    }

    /// Conserva la información visual y el formato original; el codificador
    /// no escribe bloques EXIF.
    fn strip(&self, source: &Path, target: &Path) -> Result<(), String> {
        let reader = ImageReader::open(source)
            .map_err(|e| format!("No se pudo abrir la imagen: {}", e))?
            .with_guessed_format()
            .map_err(|e| format!("No se pudo identificar la imagen: {}", e))?;
        let format = reader
            .format()
            .ok_or_else(|| "Formato de imagen no reconocido".to_string())?;
        let img = reader
            .decode()
            .map_err(|e| format!("No se pudo decodificar la imagen: {}", e))?;

        img.save_with_format(target, format)
            .map_err(|e| format!("No se pudo guardar la imagen limpia: {}", e))
    }

    fn verify(&self, path: &Path) -> Result<bool, String> {
        let file = File::open(path)
            .map_err(|e| format!("No se pudo abrir la imagen limpia para verificación: {}", e))?;
        let mut reader = BufReader::new(file);

        match exif::Reader::new().read_from_container(&mut reader) {
            Ok(exif) => Ok(exif.fields().next().is_none()),
            Err(exif::Error::NotFound(_)) | Err(exif::Error::BlankValue(_)) => Ok(true),
            Err(exif::Error::InvalidFormat(_)) => Ok(true),
            Err(exif::Error::Io(err)) => Err(format!(
                "No se pudo leer metadata EXIF durante la verificación: {}",
                err
            )),
            Err(other) => Err(format!("Error verificando metadata EXIF: {}", other)),
        }
    }
}
