//! Motor forense de FileLens.
//!
//! Identifica el formato real de cada archivo, extrae su metadata embebida,
//! la normaliza en un `FileRecord` y evalúa reglas de marcas de tiempo,
//! privacidad, metadata faltante y ubicación.

pub mod advanced_metadata;
pub mod analysis;
pub mod config;
pub mod error;
pub mod geo;
pub mod metadata;
pub mod metadata_editor;
pub mod pipeline;
pub mod probe;
pub mod record;

pub use analysis::{AnalysisResult, Analyzer, Finding, FindingCategory, Severity, analyze};
pub use config::{AnalyzerConfig, ForensicConfig, RuleToggles};
pub use error::{AnalysisInputError, ForensicError, InvalidCoordinate, ReportError, Result};
pub use metadata::extract;
pub use metadata_editor::{SanitizeOutcome, sanitize_file};
pub use pipeline::{BatchEntry, BatchOptions, analyze_all};
pub use record::{
    ContentHashes, FieldGroup, FieldValue, FileRecord, FormatKind, GeoPoint, PartialExtraction,
    Timestamps,
};
