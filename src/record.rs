//! Modelo canónico de un archivo analizado.
//!
//! Un `FileRecord` se construye una sola vez en el normalizador y luego se
//! comparte por referencia con el analizador y los reportes.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Claves reservadas del mapa de campos. Los campos propios de un formato
/// usan los prefijos `exif.`, `pdf.`, `office.` y `media.`.
pub mod keys {
    pub const AUTHOR: &str = "author";
    pub const LAST_MODIFIED_BY: &str = "lastModifiedBy";
    pub const ORGANIZATION: &str = "organization";
    pub const MANAGER: &str = "manager";
    pub const DEVICE_MAKE: &str = "deviceMake";
    pub const DEVICE_MODEL: &str = "deviceModel";
    pub const DEVICE_SERIAL: &str = "deviceSerial";
    pub const SOFTWARE: &str = "software";
    pub const COMMENTS: &str = "comments";
    pub const GPS_POSITION: &str = "gpsPosition";
    pub const CAPTURED_AT: &str = "capturedAt";
    pub const DIGITIZED_AT: &str = "digitizedAt";
    pub const EMBEDDED_CREATED_AT: &str = "embeddedCreatedAt";
    pub const EMBEDDED_MODIFIED_AT: &str = "embeddedModifiedAt";
    pub const TITLE: &str = "title";
    pub const SUBJECT: &str = "subject";
    pub const KEYWORDS: &str = "keywords";

    pub const PAGE_COUNT: &str = "pageCount";
    pub const IMAGE_WIDTH: &str = "imageWidth";
    pub const IMAGE_HEIGHT: &str = "imageHeight";
    pub const DURATION_SECONDS: &str = "durationSeconds";

    /// Marca de un paquete XMP en el catálogo PDF; su contenido no se decodifica.
    pub const PDF_XMP_PACKET: &str = "pdf.xmpPacket";

    /// Pseudoclaves para citar marcas de tiempo del sistema de archivos en hallazgos.
    pub const FS_CREATED_AT: &str = "timestamps.createdAt";
    pub const FS_MODIFIED_AT: &str = "timestamps.modifiedAt";
    pub const FS_ACCESSED_AT: &str = "timestamps.accessedAt";

    pub const STRUCTURE_KEYS: [&str; 4] = [PAGE_COUNT, IMAGE_WIDTH, IMAGE_HEIGHT, DURATION_SECONDS];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FormatKind {
    Image,
    PdfDocument,
    OfficeDocument,
    MediaFile,
    Unknown,
}

impl FormatKind {
    pub fn label(self) -> &'static str {
        match self {
            FormatKind::Image => "imagen",
            FormatKind::PdfDocument => "documento PDF",
            FormatKind::OfficeDocument => "documento Office",
            FormatKind::MediaFile => "archivo multimedia",
            FormatKind::Unknown => "formato desconocido",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude_meters: Option<f64>,
}

impl GeoPoint {
    pub fn new(latitude_deg: f64, longitude_deg: f64) -> Self {
        Self {
            latitude_deg,
            longitude_deg,
            altitude_meters: None,
        }
    }

    pub fn with_altitude(mut self, altitude_meters: f64) -> Self {
        self.altitude_meters = Some(altitude_meters);
        self
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude_deg, self.longitude_deg)?;
        if let Some(altitude) = self.altitude_meters {
            write!(f, " ({altitude:.1} m)")?;
        }
        Ok(())
    }
}

/// Rango de bytes dentro del archivo (o del bloque que lo contiene) con una
/// carga binaria embebida, como una miniatura o una portada.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BytesRef {
    pub offset: u64,
    pub length: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Timestamp(DateTime<Utc>),
    Coordinate(GeoPoint),
    BytesRef(BytesRef),
}

impl FieldValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "text",
            FieldValue::Number(_) => "number",
            FieldValue::Timestamp(_) => "timestamp",
            FieldValue::Coordinate(_) => "coordinate",
            FieldValue::BytesRef(_) => "bytesRef",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::Timestamp(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Un texto vacío o formado solo por espacios cuenta como presente pero sin valor.
    pub fn is_blank(&self) -> bool {
        matches!(self, FieldValue::Text(text) if text.trim().is_empty())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::Number(value) => write!(f, "{value}"),
            FieldValue::Timestamp(value) => write!(f, "{}", value.to_rfc3339()),
            FieldValue::Coordinate(point) => write!(f, "{point}"),
            FieldValue::BytesRef(range) => {
                write!(f, "{} bytes @ {}", range.length, range.offset)
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentHashes {
    pub md5: String,
    pub sha256: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timestamps {
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
    pub accessed_at: Option<DateTime<Utc>>,
}

/// Agrupación lógica de campos. También nombra la unidad que un extractor
/// no pudo interpretar en un error parcial.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldGroup {
    Exif,
    CaptureTime,
    Device,
    Location,
    Descriptive,
    EmbeddedDates,
    Application,
    CustomProperties,
    MediaTags,
    Container,
    Structure,
}

impl FieldGroup {
    pub fn name(self) -> &'static str {
        match self {
            FieldGroup::Exif => "exif",
            FieldGroup::CaptureTime => "captureTime",
            FieldGroup::Device => "device",
            FieldGroup::Location => "location",
            FieldGroup::Descriptive => "descriptive",
            FieldGroup::EmbeddedDates => "embeddedDates",
            FieldGroup::Application => "application",
            FieldGroup::CustomProperties => "customProperties",
            FieldGroup::MediaTags => "mediaTags",
            FieldGroup::Container => "container",
            FieldGroup::Structure => "structure",
        }
    }

    /// Grupo al que pertenece una clave del mapa de campos.
    pub fn of_key(key: &str) -> FieldGroup {
        match key {
            keys::CAPTURED_AT | keys::DIGITIZED_AT => FieldGroup::CaptureTime,
            keys::DEVICE_MAKE | keys::DEVICE_MODEL | keys::DEVICE_SERIAL => FieldGroup::Device,
            keys::GPS_POSITION => FieldGroup::Location,
            keys::EMBEDDED_CREATED_AT | keys::EMBEDDED_MODIFIED_AT => FieldGroup::EmbeddedDates,
            key if keys::STRUCTURE_KEYS.contains(&key) => FieldGroup::Structure,
            keys::PDF_XMP_PACKET => FieldGroup::Container,
            key if key.starts_with("exif.") => FieldGroup::Exif,
            key if key.starts_with("office.app.") => FieldGroup::Application,
            key if key.starts_with("office.custom.") => FieldGroup::CustomProperties,
            key if key.starts_with("office.stats.") => FieldGroup::Structure,
            key if key.starts_with("media.tag.") => FieldGroup::MediaTags,
            key if key.starts_with("media.") => FieldGroup::Structure,
            _ => FieldGroup::Descriptive,
        }
    }

    /// Claves reservadas que se citan cuando el grupo completo falta.
    pub fn reserved_keys(self) -> &'static [&'static str] {
        match self {
            FieldGroup::CaptureTime => &[keys::CAPTURED_AT, keys::DIGITIZED_AT],
            FieldGroup::Device => &[keys::DEVICE_MAKE, keys::DEVICE_MODEL, keys::DEVICE_SERIAL],
            FieldGroup::Location => &[keys::GPS_POSITION],
            FieldGroup::Descriptive => &[
                keys::AUTHOR,
                keys::LAST_MODIFIED_BY,
                keys::TITLE,
                keys::SUBJECT,
                keys::KEYWORDS,
            ],
            FieldGroup::EmbeddedDates => &[keys::EMBEDDED_CREATED_AT, keys::EMBEDDED_MODIFIED_AT],
            FieldGroup::Structure => &keys::STRUCTURE_KEYS,
            _ => &[],
        }
    }
}

impl fmt::Display for FieldGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Grupo que el extractor reconoció pero no pudo interpretar.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialExtraction {
    pub group: FieldGroup,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub content_hashes: ContentHashes,
    pub timestamps: Timestamps,
    pub format_kind: FormatKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_subtype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub fields: BTreeMap<String, FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo: Option<GeoPoint>,
    #[serde(default)]
    pub partial_errors: Vec<PartialExtraction>,
}

impl FileRecord {
    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.field(key).and_then(FieldValue::as_text)
    }

    pub fn timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        self.field(key).and_then(FieldValue::as_timestamp)
    }

    /// Cierto si existe al menos un campo embebido fuera de la estructura del contenedor.
    pub fn has_embedded_metadata(&self) -> bool {
        self.fields
            .keys()
            .any(|key| FieldGroup::of_key(key) != FieldGroup::Structure)
    }

    /// Posición del archivo: `geo` o, en su defecto, el campo `gpsPosition`.
    pub fn position(&self) -> Option<GeoPoint> {
        self.geo.or_else(|| match self.field(keys::GPS_POSITION) {
            Some(FieldValue::Coordinate(point)) => Some(*point),
            _ => None,
        })
    }

    pub fn group_present(&self, group: FieldGroup) -> bool {
        self.fields.keys().any(|key| FieldGroup::of_key(key) == group)
    }

    pub fn partial_error(&self, group: FieldGroup) -> Option<&PartialExtraction> {
        self.partial_errors.iter().find(|error| error.group == group)
    }

    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}
