//! Extractores de metadata interna por familia de formato.
//!
//! Cada extractor recibe el contenido ya abierto y devuelve los campos en
//! claves canónicas. Un grupo que no se pudo interpretar queda como error
//! parcial; nunca aborta la extracción del archivo.

mod dates;
mod image;
mod media;
mod office;
mod pdf;

use std::collections::BTreeMap;
use std::io::{Read, Seek};

use chrono::{DateTime, Utc};

use crate::probe::FormatProbe;
use crate::record::{FieldGroup, FieldValue, FormatKind, GeoPoint, PartialExtraction};

pub use dates::{parse_exif_datetime, parse_iso_date, parse_pdf_date};
pub use self::image::ImageExtractor;
pub use media::MediaExtractor;
pub use office::OfficeExtractor;
pub use pdf::PdfExtractor;

/// Lector con posicionamiento usado por todos los extractores.
pub trait SeekRead: Read + Seek {}

impl<T: Read + Seek + ?Sized> SeekRead for T {}

/// Resultado bruto de un extractor antes de normalizarse en `FileRecord`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExtractedFields {
    pub fields: BTreeMap<String, FieldValue>,
    pub geo: Option<GeoPoint>,
    pub partial_errors: Vec<PartialExtraction>,
}

impl ExtractedFields {
    pub fn insert(&mut self, key: impl Into<String>, value: FieldValue) {
        self.fields.insert(key.into(), value);
    }

    /// Guarda texto sin relleno nulo. Un valor vacío sigue contando como presente.
    pub fn insert_text(&mut self, key: impl Into<String>, value: &str) {
        let cleaned = value.trim_matches(|c: char| c == '\0' || c.is_whitespace());
        self.insert(key, FieldValue::Text(cleaned.to_string()));
    }

    pub fn insert_number(&mut self, key: impl Into<String>, value: f64) {
        if value.is_finite() {
            self.insert(key, FieldValue::Number(value));
        }
    }

    /// Inserta una fecha ya interpretada o deja constancia de que no se pudo leer.
    pub fn insert_date(
        &mut self,
        key: &str,
        raw: &str,
        parsed: Option<DateTime<Utc>>,
    ) {
        match parsed {
            Some(value) => self.insert(key, FieldValue::Timestamp(value)),
            None => self.partial(
                FieldGroup::of_key(key),
                format!("fecha `{}` ilegible en {key}", raw.trim_matches('\0').trim()),
            ),
        }
    }

    pub fn partial(&mut self, group: FieldGroup, reason: impl Into<String>) {
        self.partial_errors.push(PartialExtraction {
            group,
            reason: reason.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.geo.is_none() && self.partial_errors.is_empty()
    }
}

pub trait FieldExtractor: Sync {
    fn family(&self) -> FormatKind;

    fn extract_fields(&self, reader: &mut dyn SeekRead, probe: &FormatProbe) -> ExtractedFields;
}

/// Formatos sin decodificador: solo aportan hechos del sistema de archivos.
pub struct FilesystemOnlyExtractor;

impl FieldExtractor for FilesystemOnlyExtractor {
    fn family(&self) -> FormatKind {
        FormatKind::Unknown
    }

    fn extract_fields(&self, _reader: &mut dyn SeekRead, _probe: &FormatProbe) -> ExtractedFields {
        ExtractedFields::default()
    }
}

pub fn extractor_for(kind: FormatKind) -> &'static dyn FieldExtractor {
    match kind {
        FormatKind::Image => &ImageExtractor,
        FormatKind::PdfDocument => &PdfExtractor,
        FormatKind::OfficeDocument => &OfficeExtractor,
        FormatKind::MediaFile => &MediaExtractor,
        FormatKind::Unknown => &FilesystemOnlyExtractor,
    }
}

/// Texto de bytes ASCII/UTF-8 sin el relleno nulo habitual en contenedores binarios.
pub(crate) fn read_ascii_field(bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

pub(crate) fn decode_utf16(bytes: &[u8], little_endian: bool) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| {
            if little_endian {
                u16::from_le_bytes([pair[0], pair[1]])
            } else {
                u16::from_be_bytes([pair[0], pair[1]])
            }
        })
        .collect();
    String::from_utf16_lossy(&units)
        .trim_matches('\0')
        .to_string()
}
