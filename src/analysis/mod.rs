//! Análisis forense de un `FileRecord`.
//!
//! Las reglas se ejecutan siempre en el mismo orden (marcas de tiempo,
//! privacidad, metadata faltante, ubicación) y solo leen el registro y la
//! distribución de marcas de tiempo del lote que entrega quien llama. Dos
//! llamadas sobre el mismo registro producen exactamente el mismo resultado.

mod location;
mod missing;
mod peers;
mod privacy;
mod recommendations;
mod timestamps;
mod validation;

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::AnalyzerConfig;
use crate::error::AnalysisInputError;
use crate::record::FileRecord;

pub use missing::expected_groups;
pub use peers::{PeerTimestamps, TimestampTriple};
pub use validation::validate_record;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn name(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Low => "bajo",
            Severity::Medium => "medio",
            Severity::High => "alto",
            Severity::Critical => "crítico",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FindingCategory {
    TimestampAnomaly,
    PrivacyConcern,
    MissingMetadata,
    LocationAnomaly,
}

impl FindingCategory {
    pub fn name(self) -> &'static str {
        match self {
            FindingCategory::TimestampAnomaly => "timestampAnomaly",
            FindingCategory::PrivacyConcern => "privacyConcern",
            FindingCategory::MissingMetadata => "missingMetadata",
            FindingCategory::LocationAnomaly => "locationAnomaly",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FindingCategory::TimestampAnomaly => "Marcas de tiempo",
            FindingCategory::PrivacyConcern => "Privacidad",
            FindingCategory::MissingMetadata => "Metadata faltante",
            FindingCategory::LocationAnomaly => "Ubicación",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub category: FindingCategory,
    pub severity: Severity,
    pub message: String,
    pub related_field_keys: BTreeSet<String>,
}

impl Finding {
    pub fn new<K>(
        category: FindingCategory,
        severity: Severity,
        message: impl Into<String>,
        related_field_keys: impl IntoIterator<Item = K>,
    ) -> Self
    where
        K: Into<String>,
    {
        Self {
            category,
            severity,
            message: message.into(),
            related_field_keys: related_field_keys.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub findings: Vec<Finding>,
    pub risk_level: Severity,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl AnalysisResult {
    /// El nivel de riesgo es la severidad máxima; sin hallazgos es `Low`.
    pub fn from_findings(findings: Vec<Finding>) -> Self {
        let risk_level = findings
            .iter()
            .map(|finding| finding.severity)
            .max()
            .unwrap_or(Severity::Low);
        let recommendations = recommendations::recommend(&findings);
        Self {
            findings,
            risk_level,
            recommendations,
        }
    }

    pub fn count(&self, category: FindingCategory) -> usize {
        self.findings
            .iter()
            .filter(|finding| finding.category == category)
            .count()
    }
}

/// Conjunto de reglas configurado. No guarda estado entre llamadas.
#[derive(Clone, Debug, Default)]
pub struct Analyzer {
    config: AnalyzerConfig,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn analyze(
        &self,
        record: &FileRecord,
        peers: Option<&PeerTimestamps>,
    ) -> Result<AnalysisResult, AnalysisInputError> {
        validate_record(record)?;

        let rules = &self.config.rules;
        let mut findings = Vec::new();
        if rules.timestamp_consistency {
            timestamps::check(record, peers, &self.config, &mut findings);
        }
        if rules.privacy_fields {
            privacy::check(record, &mut findings);
        }
        if rules.missing_metadata {
            missing::check(record, &mut findings);
        }
        if rules.location_plausibility {
            location::check(record, &self.config, &mut findings);
        }
        Ok(AnalysisResult::from_findings(findings))
    }
}

/// Analiza con la configuración predeterminada.
pub fn analyze(
    record: &FileRecord,
    peers: Option<&PeerTimestamps>,
) -> Result<AnalysisResult, AnalysisInputError> {
    Analyzer::default().analyze(record, peers)
}
