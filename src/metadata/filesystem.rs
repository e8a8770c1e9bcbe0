//! Hechos del sistema de archivos: tamaño y marcas de tiempo.

use std::fs::Metadata;
use std::time::SystemTime;

use chrono::{DateTime, Utc};

use crate::record::Timestamps;

/// Marcas de tiempo disponibles en la plataforma. Una marca que el sistema
/// no expone (p. ej. la creación en algunos Linux) queda como `None`.
pub fn timestamps(metadata: &Metadata) -> Timestamps {
    Timestamps {
        created_at: to_utc(metadata.created()),
        modified_at: to_utc(metadata.modified()),
        accessed_at: to_utc(metadata.accessed()),
    }
}

fn to_utc(time: std::io::Result<SystemTime>) -> Option<DateTime<Utc>> {
    time.ok().map(DateTime::<Utc>::from)
}
