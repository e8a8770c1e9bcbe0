//! Errores del motor forense.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::record::FieldGroup;

pub type Result<T> = std::result::Result<T, ForensicError>;

/// Fallos que abortan la operación completa sobre un archivo o lote.
///
/// Los problemas al interpretar un grupo de metadata no llegan aquí: se
/// registran como errores parciales dentro del `FileRecord`.
#[derive(Error, Debug)]
pub enum ForensicError {
    #[error("No se pudo leer `{}`: {source}", path.display())]
    UnreadableFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Registro inválido para análisis: {0}")]
    AnalysisInput(#[from] AnalysisInputError),

    #[error("No se pudo escribir el reporte: {0}")]
    Report(#[from] ReportError),

    #[error("Configuración inválida en `{}`: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("No se pudo sanear `{}`: {message}", path.display())]
    Sanitize { path: PathBuf, message: String },

    #[error("Extracción cancelada para `{}`", path.display())]
    Cancelled { path: PathBuf },

    #[error("No se pudo crear el grupo de trabajo: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl ForensicError {
    pub fn unreadable(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::UnreadableFile {
            path: path.into(),
            source,
        }
    }
}

/// Datos de posición que no describen un punto válido en WGS84.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidCoordinate {
    #[error("latitud fuera de rango: {0}")]
    LatitudeOutOfRange(f64),

    #[error("longitud fuera de rango: {0}")]
    LongitudeOutOfRange(f64),

    #[error("componente de coordenada no válido: {0}")]
    InvalidComponent(String),

    #[error("referencia de hemisferio desconocida: `{0}`")]
    UnknownReference(String),

    #[error("cadena ISO 6709 no reconocida: `{0}`")]
    Iso6709(String),
}

/// Registro que viola los invariantes del modelo antes de analizarse.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisInputError {
    #[error("el campo `{key}` debe ser de tipo {expected}, se encontró {found}")]
    FieldType {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("el campo `{key}` contiene un número no finito")]
    NonFiniteNumber { key: String },

    #[error("posición fuera de rango en el registro: {latitude}, {longitude}")]
    GeoOutOfRange { latitude: f64, longitude: f64 },

    #[error("`geo` y el campo `gpsPosition` no coinciden")]
    GeoMismatch,

    #[error("hash {algorithm} mal formado: `{value}`")]
    MalformedHash {
        algorithm: &'static str,
        value: String,
    },

    #[error("error parcial sin motivo para el grupo `{0}`")]
    EmptyPartialReason(FieldGroup),
}

/// Fallos al escribir un reporte o mapa.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("XML: {0}")]
    Xml(#[from] xmltree::Error),
}
