//! Construcción del `FileRecord` canónico a partir de un archivo en disco.

use std::fs::{self, File};
use std::io::{self, BufReader, Seek, SeekFrom};
use std::path::Path;

use tracing::{debug, warn};

use super::filesystem;
use super::hashing::content_hashes;
use crate::advanced_metadata::{ExtractedFields, extractor_for};
use crate::error::{ForensicError, Result};
use crate::probe::{FormatProbe, probe_reader};
use crate::record::{ContentHashes, FieldValue, FileRecord, Timestamps, keys};

/// Extrae y normaliza la metadata de `path`.
///
/// Solo falla cuando el archivo no se puede abrir o leer; los grupos de
/// metadata ilegibles quedan como errores parciales dentro del registro.
pub fn extract(path: &Path) -> Result<FileRecord> {
    let record = read_record(path).map_err(|source| {
        warn!(path = %path.display(), error = %source, "archivo ilegible");
        ForensicError::unreadable(path, source)
    })?;
    if !record.partial_errors.is_empty() {
        debug!(
            path = %path.display(),
            partial = record.partial_errors.len(),
            "extracción parcial"
        );
    }
    Ok(record)
}

fn read_record(path: &Path) -> io::Result<FileRecord> {
    let metadata = fs::metadata(path)?;
    if !metadata.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "la ruta no es un archivo regular",
        ));
    }

    // El manejador vive solo dentro de esta función.
    let mut reader = BufReader::new(File::open(path)?);
    let hashes = content_hashes(&mut reader)?;
    reader.seek(SeekFrom::Start(0))?;
    let probe = probe_reader(&mut reader)?;
    debug!(
        path = %path.display(),
        kind = probe.kind.label(),
        subtype = probe.subtype(),
        "formato detectado"
    );

    let extracted = extractor_for(probe.kind).extract_fields(&mut reader, &probe);
    Ok(normalize(
        path,
        metadata.len(),
        hashes,
        filesystem::timestamps(&metadata),
        probe,
        extracted,
    ))
}

/// Une los hechos del sistema de archivos con la salida del extractor.
pub fn normalize(
    path: &Path,
    size_bytes: u64,
    content_hashes: ContentHashes,
    timestamps: Timestamps,
    probe: FormatProbe,
    extracted: ExtractedFields,
) -> FileRecord {
    let ExtractedFields {
        mut fields,
        geo,
        mut partial_errors,
    } = extracted;

    // `gpsPosition` refleja exactamente `geo`; un valor suelto del extractor no cuenta.
    fields.remove(keys::GPS_POSITION);
    if let Some(point) = geo {
        fields.insert(keys::GPS_POSITION.to_string(), FieldValue::Coordinate(point));
    }
    partial_errors.retain(|error| !error.reason.trim().is_empty());
    partial_errors.dedup();

    FileRecord {
        path: path.to_path_buf(),
        size_bytes,
        content_hashes,
        timestamps,
        format_kind: probe.kind,
        format_subtype: probe.subtype,
        mime_type: probe.mime_type,
        fields,
        geo,
        partial_errors,
    }
}
