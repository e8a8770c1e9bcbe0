//! Configuración del analizador y del procesamiento por lotes.
//!
//! Todos los valores tienen un predeterminado; un archivo JSON solo necesita
//! declarar lo que cambia.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ForensicError, Result};

pub const DEFAULT_ALTITUDE_MIN_M: f64 = -500.0;
pub const DEFAULT_ALTITUDE_MAX_M: f64 = 10_000.0;
pub const DEFAULT_SYNCHRONIZED_MIN_FILES: usize = 3;
pub const DEFAULT_EMBEDDED_SKEW_TOLERANCE_HOURS: i64 = 24;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuleToggles {
    pub timestamp_consistency: bool,
    pub privacy_fields: bool,
    pub missing_metadata: bool,
    pub location_plausibility: bool,
}

impl Default for RuleToggles {
    fn default() -> Self {
        Self {
            timestamp_consistency: true,
            privacy_fields: true,
            missing_metadata: true,
            location_plausibility: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalyzerConfig {
    pub rules: RuleToggles,
    pub altitude_min_m: f64,
    pub altitude_max_m: f64,
    /// Archivos del lote (incluido el propio) que deben compartir la misma
    /// terna de marcas de tiempo para reportar sincronización.
    pub synchronized_min_files: usize,
    pub embedded_skew_tolerance_hours: i64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            rules: RuleToggles::default(),
            altitude_min_m: DEFAULT_ALTITUDE_MIN_M,
            altitude_max_m: DEFAULT_ALTITUDE_MAX_M,
            synchronized_min_files: DEFAULT_SYNCHRONIZED_MIN_FILES,
            embedded_skew_tolerance_hours: DEFAULT_EMBEDDED_SKEW_TOLERANCE_HOURS,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ForensicConfig {
    /// Hilos del grupo de extracción; `None` usa uno por núcleo.
    pub workers: Option<usize>,
    pub analyzer: AnalyzerConfig,
}

impl ForensicConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let invalid = |message: String| ForensicError::Config {
            path: path.to_path_buf(),
            message,
        };
        let raw = fs::read_to_string(path)
            .map_err(|e| invalid(format!("No se pudo leer el archivo: {}", e)))?;
        let config: ForensicConfig = serde_json::from_str(&raw)
            .map_err(|e| invalid(format!("JSON inválido: {}", e)))?;
        config.validate().map_err(invalid)?;
        Ok(config)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        let analyzer = &self.analyzer;
        if !analyzer.altitude_min_m.is_finite() || !analyzer.altitude_max_m.is_finite() {
            return Err("Los límites de altitud deben ser finitos".to_string());
        }
        if analyzer.altitude_min_m > analyzer.altitude_max_m {
            return Err("altitudeMinM no puede superar altitudeMaxM".to_string());
        }
        if analyzer.synchronized_min_files < 2 {
            return Err("synchronizedMinFiles debe ser al menos 2".to_string());
        }
        if analyzer.embedded_skew_tolerance_hours < 0 {
            return Err("embeddedSkewToleranceHours no puede ser negativo".to_string());
        }
        if self.workers == Some(0) {
            return Err("workers debe ser mayor que cero".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(
            file,
            r#"{{ "workers": 2, "analyzer": {{ "rules": {{ "privacyFields": false }} }} }}"#
        )?;

        let config = ForensicConfig::load(file.path())?;
        assert_eq!(config.workers, Some(2));
        assert!(!config.analyzer.rules.privacy_fields);
        assert!(config.analyzer.rules.timestamp_consistency);
        assert_eq!(config.analyzer.altitude_max_m, DEFAULT_ALTITUDE_MAX_M);
        assert_eq!(
            config.analyzer.synchronized_min_files,
            DEFAULT_SYNCHRONIZED_MIN_FILES
        );
        Ok(())
    }

    #[test]
    fn inverted_altitude_bounds_are_rejected() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(
            file,
            r#"{{ "analyzer": {{ "altitudeMinM": 100.0, "altitudeMaxM": 0.0 }} }}"#
        )?;

        let error = ForensicConfig::load(file.path()).unwrap_err();
        assert!(matches!(error, ForensicError::Config { .. }));
        Ok(())
    }
}
