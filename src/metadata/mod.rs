//! Normalización de metadata en registros canónicos y salida de reportes.

mod export;
mod filesystem;
mod hashing;
mod map;
mod normalizer;

pub use export::{
    CsvReport, ExportFormat, JsonReport, ReportSink, TextReport, parse_export_format, sink_for,
};
pub use hashing::content_hashes;
pub use map::{GeoJsonMap, KmlMap, MapPoint, MapRenderer, map_for, render_locations};
pub use normalizer::{extract, normalize};
